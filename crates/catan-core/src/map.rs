//! Procedural map generation.
//!
//! A `CatanMap` is an arena of hexes, vertices and edges. Relationships are
//! stored as coordinate/point/id lists so there are no reference cycles:
//! - hexes keyed by `HexCoord`
//! - vertices keyed by their rounded corner `Point`
//! - edges addressed by a dense `EdgeId`
//!
//! Generation order: land hexes, surrounding sea, vertices, edges, ports.

use crate::error::GameError;
use crate::hex::{HexCoord, Layout, Point};
use crate::player::Colour;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Dense edge identifier, assigned at generation time
pub type EdgeId = usize;

/// Rings of land around the origin hex (2 rings = 19 hexes)
const LAND_RINGS: usize = 2;

/// Sea hexes surrounding a 19-hex land mass
const EXPECTED_SEA_HEXES: usize = 18;

const PORT_COUNT: usize = 9;

/// Safety bound on redrawing the land assignment
const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

/// Safety bound on drawing a second, adjacent port vertex
const MAX_PORT_DRAWS: usize = 10_000;

/// Tolerance applied to the reference edge length when linking vertices
const NEIGHBOR_RADIUS_TOLERANCE: f64 = 1.01;

const TILE_VALUES: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// Resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    Ore,
    Wheat,
    Wood,
    Brick,
    Sheep,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Ore,
        Resource::Wheat,
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
    ];

    /// How many land hexes of this resource the standard board has
    pub fn tile_count(&self) -> usize {
        match self {
            Resource::Ore | Resource::Brick => 3,
            Resource::Wheat | Resource::Wood | Resource::Sheep => 4,
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::Ore => "ORE",
            Resource::Wheat => "WHEAT",
            Resource::Wood => "WOOD",
            Resource::Brick => "BRICK",
            Resource::Sheep => "SHEEP",
        };
        f.write_str(name)
    }
}

/// What a hex tile is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    /// Produces a resource when its value is rolled
    Resource(Resource),
    /// No production, robber starts here
    Desert,
    /// Surrounds the land, may carry a port
    Sea,
}

impl TileKind {
    pub fn is_land(&self) -> bool {
        !matches!(self, TileKind::Sea)
    }

    pub fn resource(&self) -> Option<Resource> {
        match self {
            TileKind::Resource(r) => Some(*r),
            _ => None,
        }
    }
}

/// Port types for bank trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl PortKind {
    /// The exchange rate for this port
    pub fn rate(&self) -> u32 {
        match self {
            PortKind::Generic => 3,
            PortKind::Specific(_) => 2,
        }
    }

    /// The nine ports of the standard board
    pub fn standard_set() -> Vec<PortKind> {
        let mut ports: Vec<PortKind> = Resource::ALL.into_iter().map(PortKind::Specific).collect();
        ports.extend(std::iter::repeat(PortKind::Generic).take(4));
        ports
    }
}

/// A building on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Building {
    Settlement,
    City,
}

impl Building {
    /// Resource units produced per matching roll
    pub fn production(&self) -> u32 {
        match self {
            Building::Settlement => 1,
            Building::City => 2,
        }
    }
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hextile {
    pub kind: TileKind,
    /// Production value (2-12, None for desert/sea)
    pub value: Option<u8>,
    /// All six neighbor coordinates, some may be off the map
    pub hex_neighbors: Vec<HexCoord>,
    /// Corner points that exist as vertices
    pub vertex_neighbors: Vec<Point>,
    pub port: Option<PortKind>,
    pub has_robber: bool,
}

impl Hextile {
    fn new(coord: HexCoord, kind: TileKind, value: Option<u8>) -> Self {
        Self {
            kind,
            value,
            hex_neighbors: coord.neighbors().to_vec(),
            vertex_neighbors: Vec::new(),
            port: None,
            has_robber: false,
        }
    }
}

/// A corner shared by up to three hexes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Vertices one edge away
    pub vertex_neighbors: Vec<Point>,
    /// Hexes (land and sea) this vertex is a corner of
    pub hex_neighbors: Vec<HexCoord>,
    /// Incident edges
    pub edge_neighbors: Vec<EdgeId>,
    pub port: Option<PortKind>,
    pub owner: Option<Colour>,
    pub building: Option<Building>,
}

/// The segment between two adjacent vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub vertices: [Point; 2],
    pub owner: Option<Colour>,
    pub has_road: bool,
}

impl Edge {
    /// The endpoint that is not `from`
    pub fn other_end(&self, from: &Point) -> Point {
        if self.vertices[0] == *from {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }
}

/// The generated board graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatanMap {
    layout: Layout,
    #[serde(with = "serde_pairs")]
    hexes: BTreeMap<HexCoord, Hextile>,
    #[serde(with = "serde_pairs")]
    vertices: BTreeMap<Point, Vertex>,
    edges: Vec<Edge>,
    /// Land hexes by production value
    values: BTreeMap<u8, Vec<HexCoord>>,
    robber: HexCoord,
}

impl CatanMap {
    /// Generate a random map on the default 750x910 canvas layout
    pub fn generate<R: Rng>(rng: &mut R) -> Result<Self, GameError> {
        Self::generate_with_layout(Layout::default(), rng)
    }

    /// Generate a random map with a provided layout and RNG
    pub fn generate_with_layout<R: Rng>(layout: Layout, rng: &mut R) -> Result<Self, GameError> {
        let mut map = Self {
            layout,
            hexes: BTreeMap::new(),
            vertices: BTreeMap::new(),
            edges: Vec::new(),
            values: BTreeMap::new(),
            robber: HexCoord::default(),
        };

        let land = Self::land_coords();
        map.assign_land(&land, rng)?;
        map.add_sea(&land)?;
        map.add_vertices();
        map.add_edges();
        map.assign_ports(rng)?;

        Ok(map)
    }

    // ==================== Generation ====================

    /// Origin plus `LAND_RINGS` breadth rings, in discovery order
    fn land_coords() -> Vec<HexCoord> {
        let mut coords = vec![HexCoord::default()];
        let mut seen: BTreeSet<HexCoord> = coords.iter().copied().collect();

        for _ in 0..LAND_RINGS {
            let frontier = coords.clone();
            for coord in frontier {
                for neighbor in coord.neighbors() {
                    if seen.insert(neighbor) {
                        coords.push(neighbor);
                    }
                }
            }
        }

        coords
    }

    /// Shuffled resource/value pairs with the desert at a random position
    fn random_tile_list<R: Rng>(rng: &mut R) -> Vec<(TileKind, Option<u8>)> {
        let mut resources: Vec<Resource> = Resource::ALL
            .iter()
            .flat_map(|r| std::iter::repeat(*r).take(r.tile_count()))
            .collect();
        let mut values = TILE_VALUES.to_vec();

        resources.shuffle(rng);
        values.shuffle(rng);

        let mut tiles: Vec<(TileKind, Option<u8>)> = resources
            .into_iter()
            .zip(values)
            .map(|(r, v)| (TileKind::Resource(r), Some(v)))
            .collect();

        let desert_at = rng.gen_range(0..=tiles.len());
        tiles.insert(desert_at, (TileKind::Desert, None));
        tiles
    }

    /// No two adjacent hexes may both carry a 6 or an 8
    fn is_valid_placement(values: &BTreeMap<HexCoord, Option<u8>>) -> bool {
        let is_red = |v: Option<u8>| matches!(v, Some(6) | Some(8));

        values.iter().filter(|(_, v)| is_red(**v)).all(|(coord, _)| {
            coord
                .neighbors()
                .iter()
                .all(|n| !values.get(n).is_some_and(|v| is_red(*v)))
        })
    }

    fn assign_land<R: Rng>(&mut self, land: &[HexCoord], rng: &mut R) -> Result<(), GameError> {
        for attempt in 1..=MAX_PLACEMENT_ATTEMPTS {
            let tiles = Self::random_tile_list(rng);
            let values: BTreeMap<HexCoord, Option<u8>> = land
                .iter()
                .zip(tiles.iter())
                .map(|(coord, (_, value))| (*coord, *value))
                .collect();

            if !Self::is_valid_placement(&values) {
                continue;
            }

            trace!(attempt, "land assignment accepted");
            for (coord, (kind, value)) in land.iter().zip(tiles) {
                let mut tile = Hextile::new(*coord, kind, value);
                if kind == TileKind::Desert {
                    tile.has_robber = true;
                    self.robber = *coord;
                }
                if let Some(v) = value {
                    self.values.entry(v).or_default().push(*coord);
                }
                self.hexes.insert(*coord, tile);
            }
            return Ok(());
        }

        Err(GameError::MapGeneration(format!(
            "no valid 6/8 placement after {MAX_PLACEMENT_ATTEMPTS} attempts"
        )))
    }

    fn add_sea(&mut self, land: &[HexCoord]) -> Result<(), GameError> {
        let sea: BTreeSet<HexCoord> = land
            .iter()
            .flat_map(|coord| coord.neighbors())
            .filter(|n| !self.hexes.contains_key(n))
            .collect();

        if sea.len() != EXPECTED_SEA_HEXES {
            return Err(GameError::MapGeneration(format!(
                "expected {EXPECTED_SEA_HEXES} sea hexes, found {}",
                sea.len()
            )));
        }

        for coord in sea {
            self.hexes
                .insert(coord, Hextile::new(coord, TileKind::Sea, None));
        }
        Ok(())
    }

    fn add_vertices(&mut self) {
        let layout = self.layout;

        // Land corners create vertices
        for (coord, tile) in self.hexes.iter_mut().filter(|(_, t)| t.kind.is_land()) {
            for corner in layout.polygon_corners(coord) {
                tile.vertex_neighbors.push(corner);
                self.vertices
                    .entry(corner)
                    .or_default()
                    .hex_neighbors
                    .push(*coord);
            }
        }

        // Sea corners only link to vertices that already exist
        for (coord, tile) in self.hexes.iter_mut().filter(|(_, t)| !t.kind.is_land()) {
            for corner in layout.polygon_corners(coord) {
                if let Some(vertex) = self.vertices.get_mut(&corner) {
                    tile.vertex_neighbors.push(corner);
                    vertex.hex_neighbors.push(*coord);
                }
            }
        }

        // Reference edge length from two adjacent corners of the origin hex
        let corners = layout.polygon_corners(&HexCoord::default());
        let radius = corners[0].distance_to(&corners[1]) * NEIGHBOR_RADIUS_TOLERANCE;

        let points: Vec<Point> = self.vertices.keys().copied().collect();
        for (point, vertex) in self.vertices.iter_mut() {
            vertex.vertex_neighbors = points
                .iter()
                .filter(|other| *other != point && point.distance_to(other) <= radius)
                .copied()
                .collect();
        }
    }

    fn add_edges(&mut self) {
        let mut visited: BTreeSet<Point> = BTreeSet::new();

        for (point, vertex) in &self.vertices {
            for neighbor in &vertex.vertex_neighbors {
                if !visited.contains(neighbor) {
                    self.edges.push(Edge {
                        vertices: [*point, *neighbor],
                        owner: None,
                        has_road: false,
                    });
                }
            }
            visited.insert(*point);
        }

        for (id, edge) in self.edges.iter().enumerate() {
            for point in edge.vertices {
                if let Some(vertex) = self.vertices.get_mut(&point) {
                    vertex.edge_neighbors.push(id);
                }
            }
        }
    }

    /// Place ports by walking the coast, one port every second sea hex
    fn assign_ports<R: Rng>(&mut self, rng: &mut R) -> Result<(), GameError> {
        let mut kinds = PortKind::standard_set();
        kinds.shuffle(rng);

        let sea: Vec<HexCoord> = self.sea_hexes().map(|(c, _)| *c).collect();
        let mut current = *sea
            .choose(rng)
            .ok_or_else(|| GameError::MapGeneration("no sea hexes for ports".into()))?;
        let mut traversed = vec![current];

        self.place_port(current, &mut kinds, rng)?;
        let mut placed = 1;

        while placed < PORT_COUNT {
            let next = self
                .hex(&current)
                .into_iter()
                .flat_map(|tile| tile.hex_neighbors.iter())
                .copied()
                .find(|n| self.is_sea(n) && !traversed.contains(n))
                .ok_or_else(|| GameError::MapGeneration("coastal walk got stuck".into()))?;

            if traversed.len() % 2 == 0 {
                self.place_port(next, &mut kinds, rng)?;
                placed += 1;
            }
            traversed.push(next);
            current = next;
        }

        Ok(())
    }

    /// Mark a sea hex and two adjacent corner vertices as a port
    fn place_port<R: Rng>(
        &mut self,
        coord: HexCoord,
        kinds: &mut Vec<PortKind>,
        rng: &mut R,
    ) -> Result<(), GameError> {
        let kind = kinds
            .pop()
            .ok_or_else(|| GameError::MapGeneration("ran out of port kinds".into()))?;
        let tile = self
            .hexes
            .get_mut(&coord)
            .ok_or(GameError::UnknownHex(coord.q, coord.r, coord.s))?;
        tile.port = Some(kind);
        let corners = tile.vertex_neighbors.clone();

        let no_corners = || GameError::MapGeneration("port hex has no land corners".into());
        let first = *corners.choose(rng).ok_or_else(no_corners)?;
        let first_neighbors = self
            .vertex(&first)
            .map(|v| v.vertex_neighbors.clone())
            .unwrap_or_default();

        let mut second = None;
        for _ in 0..MAX_PORT_DRAWS {
            let candidate = *corners.choose(rng).ok_or_else(no_corners)?;
            if first_neighbors.contains(&candidate) {
                second = Some(candidate);
                break;
            }
        }
        let second = second.ok_or_else(|| {
            GameError::MapGeneration(format!(
                "no adjacent port vertex after {MAX_PORT_DRAWS} draws"
            ))
        })?;

        for point in [first, second] {
            if let Some(vertex) = self.vertices.get_mut(&point) {
                vertex.port = Some(kind);
            }
        }
        Ok(())
    }

    // ==================== Query Methods ====================

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn hexes(&self) -> &BTreeMap<HexCoord, Hextile> {
        &self.hexes
    }

    pub fn hex(&self, coord: &HexCoord) -> Option<&Hextile> {
        self.hexes.get(coord)
    }

    pub fn vertices(&self) -> &BTreeMap<Point, Vertex> {
        &self.vertices
    }

    pub fn vertex(&self, point: &Point) -> Option<&Vertex> {
        self.vertices.get(point)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Land hexes (resource and desert)
    pub fn land_hexes(&self) -> impl Iterator<Item = (&HexCoord, &Hextile)> {
        self.hexes.iter().filter(|(_, t)| t.kind.is_land())
    }

    pub fn sea_hexes(&self) -> impl Iterator<Item = (&HexCoord, &Hextile)> {
        self.hexes.iter().filter(|(_, t)| !t.kind.is_land())
    }

    pub fn is_sea(&self, coord: &HexCoord) -> bool {
        self.hexes
            .get(coord)
            .is_some_and(|t| t.kind == TileKind::Sea)
    }

    /// Sea hexes carrying a port
    pub fn ports(&self) -> Vec<(HexCoord, PortKind)> {
        self.sea_hexes()
            .filter_map(|(c, t)| t.port.map(|p| (*c, p)))
            .collect()
    }

    /// Land hexes with a given production value
    pub fn hexes_with_value(&self, value: u8) -> &[HexCoord] {
        self.values.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Current robber location
    pub fn robber(&self) -> HexCoord {
        self.robber
    }

    /// The edge joining two vertices, if they are adjacent
    pub fn edge_between(&self, a: &Point, b: &Point) -> Option<EdgeId> {
        self.vertex(a)?
            .edge_neighbors
            .iter()
            .copied()
            .find(|id| self.edges[*id].vertices.contains(b))
    }

    // ==================== Mutation Methods ====================

    pub(crate) fn vertex_mut(&mut self, point: &Point) -> Result<&mut Vertex, GameError> {
        self.vertices
            .get_mut(point)
            .ok_or_else(|| GameError::UnknownVertex(point.to_string()))
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge, GameError> {
        self.edges.get_mut(id).ok_or(GameError::UnknownEdge(id))
    }

    /// Move the robber to a land hex
    pub(crate) fn set_robber(&mut self, coord: HexCoord) -> Result<(), GameError> {
        if !self.hex(&coord).is_some_and(|t| t.kind.is_land()) {
            return Err(GameError::UnknownHex(coord.q, coord.r, coord.s));
        }
        if let Some(old) = self.hexes.get_mut(&self.robber) {
            old.has_robber = false;
        }
        if let Some(new) = self.hexes.get_mut(&coord) {
            new.has_robber = true;
        }
        self.robber = coord;
        Ok(())
    }
}

/// Serialize a map with non-string keys as an array of `[key, value]` pairs,
/// since JSON objects only support string keys
mod serde_pairs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_map(seed: u64) -> CatanMap {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        CatanMap::generate(&mut rng).expect("map generates")
    }

    #[test]
    fn test_map_has_19_land_and_18_sea_hexes() {
        let map = test_map(1);
        assert_eq!(map.land_hexes().count(), 19);
        assert_eq!(map.sea_hexes().count(), 18);
    }

    #[test]
    fn test_map_has_correct_resource_counts() {
        let map = test_map(2);
        for resource in Resource::ALL {
            let count = map
                .land_hexes()
                .filter(|(_, t)| t.kind == TileKind::Resource(resource))
                .count();
            assert_eq!(count, resource.tile_count(), "wrong count for {resource}");
        }

        let deserts: Vec<_> = map
            .land_hexes()
            .filter(|(_, t)| t.kind == TileKind::Desert)
            .collect();
        assert_eq!(deserts.len(), 1);
        assert_eq!(deserts[0].1.value, None);
    }

    #[test]
    fn test_values_match_standard_distribution() {
        let map = test_map(3);
        let mut values: Vec<u8> = map.land_hexes().filter_map(|(_, t)| t.value).collect();
        values.sort_unstable();
        assert_eq!(values, TILE_VALUES.to_vec());

        for value in [2u8, 6, 8, 12] {
            for coord in map.hexes_with_value(value) {
                assert_eq!(map.hex(coord).and_then(|t| t.value), Some(value));
            }
        }
    }

    #[test]
    fn test_robber_starts_on_desert() {
        let map = test_map(4);
        let tile = map.hex(&map.robber()).expect("robber hex exists");
        assert_eq!(tile.kind, TileKind::Desert);
        assert!(tile.has_robber);
        assert_eq!(map.hexes().values().filter(|t| t.has_robber).count(), 1);
    }

    #[test]
    fn test_no_adjacent_6_and_8() {
        for seed in 0..25 {
            let map = test_map(seed);
            for (coord, tile) in map.land_hexes() {
                if matches!(tile.value, Some(6) | Some(8)) {
                    for neighbor in coord.neighbors() {
                        let neighbor_value = map.hex(&neighbor).and_then(|t| t.value);
                        assert!(
                            !matches!(neighbor_value, Some(6) | Some(8)),
                            "seed {seed}: {coord:?} and {neighbor:?} are both red"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_vertex_and_edge_counts() {
        let map = test_map(5);
        assert_eq!(map.vertices().len(), 54);
        assert_eq!(map.edges().len(), 72);
    }

    #[test]
    fn test_vertex_degrees() {
        let map = test_map(6);
        for (point, vertex) in map.vertices() {
            assert!(
                (2..=3).contains(&vertex.hex_neighbors.len()),
                "{point} has {} parent hexes",
                vertex.hex_neighbors.len()
            );
            assert!(
                (2..=3).contains(&vertex.edge_neighbors.len()),
                "{point} has {} edges",
                vertex.edge_neighbors.len()
            );
            assert_eq!(vertex.vertex_neighbors.len(), vertex.edge_neighbors.len());
        }
    }

    #[test]
    fn test_edges_connect_two_distinct_vertices() {
        let map = test_map(7);
        for (id, edge) in map.edges().iter().enumerate() {
            let [a, b] = edge.vertices;
            assert_ne!(a, b);
            assert!(map.vertex(&a).unwrap().edge_neighbors.contains(&id));
            assert!(map.vertex(&b).unwrap().edge_neighbors.contains(&id));
            assert_eq!(map.edge_between(&a, &b), Some(id));
        }
    }

    #[test]
    fn test_map_has_9_ports() {
        let map = test_map(8);
        let ports = map.ports();
        assert_eq!(ports.len(), 9);

        let generic = ports
            .iter()
            .filter(|(_, p)| *p == PortKind::Generic)
            .count();
        assert_eq!(generic, 4);
        for resource in Resource::ALL {
            assert!(ports.iter().any(|(_, p)| *p == PortKind::Specific(resource)));
        }
    }

    #[test]
    fn test_port_vertices_are_adjacent_pairs() {
        let map = test_map(9);
        for (coord, kind) in map.ports() {
            let tile = map.hex(&coord).unwrap();
            let port_vertices: Vec<Point> = tile
                .vertex_neighbors
                .iter()
                .filter(|p| map.vertex(p).unwrap().port == Some(kind))
                .copied()
                .collect();
            assert!(port_vertices.len() >= 2, "port at {coord:?} has no dock");

            let has_adjacent_pair = port_vertices.iter().any(|a| {
                port_vertices
                    .iter()
                    .any(|b| map.vertex(a).unwrap().vertex_neighbors.contains(b))
            });
            assert!(has_adjacent_pair);
        }

        let port_vertex_count = map.vertices().values().filter(|v| v.port.is_some()).count();
        assert_eq!(port_vertex_count, 18);
    }

    #[test]
    fn test_generation_is_deterministic_per_seed() {
        assert_eq!(test_map(42), test_map(42));
        assert_ne!(test_map(42), test_map(43));
    }

    #[test]
    fn test_map_serializes_with_pair_keys() {
        let map = test_map(10);
        let json = serde_json::to_string(&map).unwrap();
        let restored: CatanMap = serde_json::from_str(&json).unwrap();
        assert_eq!(map, restored);
    }
}
