//! Hex coordinate system using cube coordinates (q, r, s).
//!
//! This module provides the foundational geometry for the board:
//! - `HexCoord`: Identifies individual hex tiles
//! - `Point`: A rounded pixel position, used as the identity of a vertex
//! - `Layout`: Converts between hex coordinates and pixel space
//!
//! Vertices are not addressed through the hex grid at all. Every corner is
//! projected into pixel space and rounded, so two hexes that share a corner
//! always compute the same `Point`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Number of decimal places kept when a pixel position becomes a `Point`
const POINT_PRECISION: f64 = 1000.0;

/// Cube coordinate for the hex grid.
///
/// The three components always satisfy `q + r + s = 0`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
    pub s: i32,
}

impl HexCoord {
    /// The six unit directions, in the order used by `neighbor`
    pub const DIRECTIONS: [HexCoord; 6] = [
        HexCoord { q: 1, r: 0, s: -1 },
        HexCoord { q: 1, r: -1, s: 0 },
        HexCoord { q: 0, r: -1, s: 1 },
        HexCoord { q: -1, r: 0, s: 1 },
        HexCoord { q: -1, r: 1, s: 0 },
        HexCoord { q: 0, r: 1, s: -1 },
    ];

    /// Create a new cube coordinate (panics if q + r + s != 0)
    pub fn new(q: i32, r: i32, s: i32) -> Self {
        assert!(q + r + s == 0, "cube coordinate ({q}, {r}, {s}) does not sum to 0");
        Self { q, r, s }
    }

    /// Create from axial coordinates, deriving s
    pub const fn from_axial(q: i32, r: i32) -> Self {
        Self { q, r, s: -q - r }
    }

    pub fn add(&self, other: &HexCoord) -> HexCoord {
        HexCoord::new(self.q + other.q, self.r + other.r, self.s + other.s)
    }

    pub fn subtract(&self, other: &HexCoord) -> HexCoord {
        HexCoord::new(self.q - other.q, self.r - other.r, self.s - other.s)
    }

    pub fn scale(&self, factor: i32) -> HexCoord {
        HexCoord::new(self.q * factor, self.r * factor, self.s * factor)
    }

    /// Distance from the origin in hex steps
    pub fn length(&self) -> u32 {
        ((self.q.abs() + self.r.abs() + self.s.abs()) / 2) as u32
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        self.subtract(other).length()
    }

    /// Unit vector for a direction, wrapping modulo 6
    pub fn direction(direction: usize) -> HexCoord {
        Self::DIRECTIONS[direction % 6]
    }

    /// The neighbor in a specific direction (0-5)
    pub fn neighbor(&self, direction: usize) -> HexCoord {
        self.add(&Self::direction(direction))
    }

    /// All six neighbors, in direction order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        Self::DIRECTIONS.map(|d| self.add(&d))
    }
}

/// A hex position with fractional components, produced by `Layout::pixel_to_hex`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractionalHex {
    pub q: f64,
    pub r: f64,
    pub s: f64,
}

impl FractionalHex {
    pub fn new(q: f64, r: f64, s: f64) -> Self {
        Self { q, r, s }
    }

    /// Round to the nearest whole hex, preserving q + r + s = 0
    pub fn round(&self) -> HexCoord {
        let mut q = self.q.round();
        let mut r = self.r.round();
        let mut s = self.s.round();

        let q_diff = (q - self.q).abs();
        let r_diff = (r - self.r).abs();
        let s_diff = (s - self.s).abs();

        // Reset the component with the largest rounding error
        if q_diff > r_diff && q_diff > s_diff {
            q = -r - s;
        } else if r_diff > s_diff {
            r = -q - s;
        } else {
            s = -q - r;
        }

        HexCoord::new(q as i32, r as i32, s as i32)
    }
}

/// A pixel position rounded to three decimal places.
///
/// Stored as integer thousandths so it can be hashed, ordered and compared
/// exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Point {
    x_milli: i64,
    y_milli: i64,
}

impl Point {
    /// Create a point, rounding both components to three decimals
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x_milli: (x * POINT_PRECISION).round() as i64,
            y_milli: (y * POINT_PRECISION).round() as i64,
        }
    }

    pub fn x(&self) -> f64 {
        self.x_milli as f64 / POINT_PRECISION
    }

    pub fn y(&self) -> f64 {
        self.y_milli as f64 / POINT_PRECISION
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x() - other.x()).hypot(self.y() - other.y())
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x(), self.y())
    }
}

/// Forward (f) and inverse (b) matrices for a hex orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub f0: f64,
    pub f1: f64,
    pub f2: f64,
    pub f3: f64,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
    /// Angle of corner 0, in multiples of 60 degrees
    pub start_angle: f64,
}

impl Orientation {
    /// Pointy-top hexes
    pub const POINTY: Orientation = Orientation {
        f0: SQRT_3,
        f1: SQRT_3 / 2.0,
        f2: 0.0,
        f3: 3.0 / 2.0,
        b0: SQRT_3 / 3.0,
        b1: -1.0 / 3.0,
        b2: 0.0,
        b3: 2.0 / 3.0,
        start_angle: 0.5,
    };

    /// Flat-top hexes (the board orientation)
    pub const FLAT: Orientation = Orientation {
        f0: 3.0 / 2.0,
        f1: 0.0,
        f2: SQRT_3 / 2.0,
        f3: SQRT_3,
        b0: 2.0 / 3.0,
        b1: 0.0,
        b2: -1.0 / 3.0,
        b3: SQRT_3 / 3.0,
        start_angle: 0.0,
    };
}

/// Maps hex coordinates to pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub orientation: Orientation,
    /// Hex radius in pixels (x, y)
    pub size: (f64, f64),
    /// Pixel position of the origin hex's center
    pub origin: (f64, f64),
}

impl Layout {
    pub fn new(orientation: Orientation, size: (f64, f64), origin: (f64, f64)) -> Self {
        Self {
            orientation,
            size,
            origin,
        }
    }

    /// Flat layout with hex size 50 centered in a canvas of the given size
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self::new(Orientation::FLAT, (50.0, 50.0), (width / 2.0, height / 2.0))
    }

    /// Center of a hex
    pub fn hex_to_pixel(&self, hex: &HexCoord) -> Point {
        let o = &self.orientation;
        let q = hex.q as f64;
        let r = hex.r as f64;
        let x = (o.f0 * q + o.f1 * r) * self.size.0;
        let y = (o.f2 * q + o.f3 * r) * self.size.1;
        Point::new(x + self.origin.0, y + self.origin.1)
    }

    /// Fractional hex under a pixel position
    pub fn pixel_to_hex(&self, point: &Point) -> FractionalHex {
        let o = &self.orientation;
        let px = (point.x() - self.origin.0) / self.size.0;
        let py = (point.y() - self.origin.1) / self.size.1;
        let q = o.b0 * px + o.b1 * py;
        let r = o.b2 * px + o.b3 * py;
        FractionalHex::new(q, r, -q - r)
    }

    /// Offset of corner `corner` (0-5) from a hex center
    pub fn corner_offset(&self, corner: usize) -> (f64, f64) {
        let angle = 2.0 * PI * (self.orientation.start_angle - corner as f64) / 6.0;
        (self.size.0 * angle.cos(), self.size.1 * angle.sin())
    }

    /// The six corners of a hex, rounded to `Point`s
    pub fn polygon_corners(&self, hex: &HexCoord) -> [Point; 6] {
        let o = &self.orientation;
        let q = hex.q as f64;
        let r = hex.r as f64;
        let center_x = (o.f0 * q + o.f1 * r) * self.size.0 + self.origin.0;
        let center_y = (o.f2 * q + o.f3 * r) * self.size.1 + self.origin.1;

        std::array::from_fn(|corner| {
            let (dx, dy) = self.corner_offset(corner);
            Point::new(center_x + dx, center_y + dy)
        })
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::for_canvas(750.0, 910.0)
    }
}
