//! Player state and resource management.
//!
//! This module contains:
//! - Player struct with resources, development cards, and achievements
//! - ResourceHand for resource counts (used for player hands and the bank)
//! - Development card types and counts
//! - Building costs

use crate::hex::Point;
use crate::map::{EdgeId, PortKind, Resource};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ROADS_PER_PLAYER: u32 = 15;
pub const SETTLEMENTS_PER_PLAYER: u32 = 5;
pub const CITIES_PER_PLAYER: u32 = 4;

/// Units of each resource the bank starts with
pub const BANK_RESOURCE_STOCK: u32 = 19;

/// Default bank exchange rate without a port
pub const DEFAULT_TRADE_RATE: u32 = 4;

/// All players of a game, keyed by colour
pub type Players = BTreeMap<Colour, Player>;

/// Player colour, doubles as the player's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Colour {
    Red,
    White,
    Orange,
    Blue,
}

impl Colour {
    pub const ALL: [Colour; 4] = [Colour::Red, Colour::White, Colour::Orange, Colour::Blue];
}

impl std::fmt::Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Colour::Red => "RED",
            Colour::White => "WHITE",
            Colour::Orange => "ORANGE",
            Colour::Blue => "BLUE",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Colour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(Colour::Red),
            "white" => Ok(Colour::White),
            "orange" => Ok(Colour::Orange),
            "blue" => Ok(Colour::Blue),
            other => Err(format!("unknown colour '{other}'")),
        }
    }
}

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DevCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Take one or two resources from the bank
    YearOfPlenty,
    /// Build 2 roads for free
    RoadBuilding,
    /// All players must give you all of one resource type
    Monopoly,
    /// Worth 1 VP, never played
    VictoryPoint,
}

impl DevCard {
    pub const ALL: [DevCard; 5] = [
        DevCard::Knight,
        DevCard::YearOfPlenty,
        DevCard::RoadBuilding,
        DevCard::Monopoly,
        DevCard::VictoryPoint,
    ];

    /// Whether this card can be played (VP cards are never "played")
    pub fn is_playable(&self) -> bool {
        !matches!(self, DevCard::VictoryPoint)
    }
}

/// Counts of development cards, used for hands and for the bank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCardHand {
    pub knight: u32,
    pub year_of_plenty: u32,
    pub road_building: u32,
    pub monopoly: u32,
    pub victory_point: u32,
}

impl DevCardHand {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard 25-card bank
    pub fn standard_bank() -> Self {
        Self {
            knight: 14,
            year_of_plenty: 2,
            road_building: 2,
            monopoly: 2,
            victory_point: 5,
        }
    }

    pub fn get(&self, card: DevCard) -> u32 {
        match card {
            DevCard::Knight => self.knight,
            DevCard::YearOfPlenty => self.year_of_plenty,
            DevCard::RoadBuilding => self.road_building,
            DevCard::Monopoly => self.monopoly,
            DevCard::VictoryPoint => self.victory_point,
        }
    }

    fn slot(&mut self, card: DevCard) -> &mut u32 {
        match card {
            DevCard::Knight => &mut self.knight,
            DevCard::YearOfPlenty => &mut self.year_of_plenty,
            DevCard::RoadBuilding => &mut self.road_building,
            DevCard::Monopoly => &mut self.monopoly,
            DevCard::VictoryPoint => &mut self.victory_point,
        }
    }

    pub fn add(&mut self, card: DevCard) {
        *self.slot(card) += 1;
    }

    /// Remove one card, returning false if there was none
    pub fn remove(&mut self, card: DevCard) -> bool {
        let slot = self.slot(card);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn total(&self) -> u32 {
        DevCard::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Card kinds with at least one copy
    pub fn available(&self) -> Vec<DevCard> {
        DevCard::ALL
            .into_iter()
            .filter(|c| self.get(*c) > 0)
            .collect()
    }
}

/// A hand of resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub ore: u32,
    pub wheat: u32,
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(ore: u32, wheat: u32, wood: u32, brick: u32, sheep: u32) -> Self {
        Self {
            ore,
            wheat,
            wood,
            brick,
            sheep,
        }
    }

    /// The bank's starting stock
    pub fn bank() -> Self {
        let n = BANK_RESOURCE_STOCK;
        Self::with_amounts(n, n, n, n, n)
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.ore + self.wheat + self.wood + self.brick + self.sheep
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Ore => self.ore,
            Resource::Wheat => self.wheat,
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
        }
    }

    /// Set count of a specific resource
    pub fn set(&mut self, resource: Resource, count: u32) {
        match resource {
            Resource::Ore => self.ore = count,
            Resource::Wheat => self.wheat = count,
            Resource::Wood => self.wood = count,
            Resource::Brick => self.brick = count,
            Resource::Sheep => self.sheep = count,
        }
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.set(resource, self.get(resource) + amount);
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for (resource, amount) in other.iter() {
            self.add(resource, amount);
        }
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|r| self.get(*r) >= cost.get(*r))
    }

    /// Subtract a cost (panics if insufficient)
    pub fn subtract(&mut self, cost: &ResourceHand) {
        assert!(self.can_afford(cost), "Cannot afford this cost");
        for (resource, amount) in cost.iter() {
            self.set(resource, self.get(resource) - amount);
        }
    }

    /// Try to subtract, returning false if insufficient
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.subtract(cost);
        true
    }

    /// Remove one card chosen uniformly among all cards held
    pub fn remove_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        let mut pick = rng.gen_range(0..total);
        let mut chosen = None;
        for (resource, amount) in self.iter() {
            if pick < amount {
                chosen = Some(resource);
                break;
            }
            pick -= amount;
        }

        let resource = chosen?;
        self.subtract(&ResourceHand::single(resource, 1));
        Some(resource)
    }

    /// Resource counts in `Resource::ALL` order, zeros included
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL.into_iter().map(|r| (r, self.get(r)))
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Cost to build a road: 1 wood, 1 brick
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 0)
    }

    /// Cost to build a settlement: 1 wheat, 1 wood, 1 brick, 1 sheep
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(0, 1, 1, 1, 1)
    }

    /// Cost to upgrade to city: 3 ore, 2 wheat
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(3, 2, 0, 0, 0)
    }

    /// Cost to buy a development card: 1 ore, 1 wheat, 1 sheep
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 1)
    }
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub colour: Colour,
    /// Current resources
    pub resources: ResourceHand,
    /// Development cards held, including ones bought this turn
    pub dev_cards: DevCardHand,
    pub roads_left: u32,
    pub settlements_left: u32,
    pub cities_left: u32,
    /// Number of knights played (for Largest Army)
    pub knights_played: u32,
    /// Longest contiguous road, recomputed on every road build
    pub longest_road_length: u32,
    /// Bank exchange rate per resource
    pub trading_cost: BTreeMap<Resource, u32>,
    pub owned_edges: Vec<EdgeId>,
    /// Vertices holding this player's settlements and cities
    pub owned_vertices: Vec<Point>,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
}

impl Player {
    /// Create a new player
    pub fn new(colour: Colour) -> Self {
        Self {
            colour,
            resources: ResourceHand::new(),
            dev_cards: DevCardHand::new(),
            roads_left: ROADS_PER_PLAYER,
            settlements_left: SETTLEMENTS_PER_PLAYER,
            cities_left: CITIES_PER_PLAYER,
            knights_played: 0,
            longest_road_length: 0,
            trading_cost: Resource::ALL
                .into_iter()
                .map(|r| (r, DEFAULT_TRADE_RATE))
                .collect(),
            owned_edges: Vec::new(),
            owned_vertices: Vec::new(),
            has_longest_road: false,
            has_largest_army: false,
        }
    }

    pub fn cities_built(&self) -> u32 {
        CITIES_PER_PLAYER - self.cities_left
    }

    /// Settlements still on the board (not upgraded)
    pub fn settlements_standing(&self) -> u32 {
        self.owned_vertices.len() as u32 - self.cities_built()
    }

    pub fn roads_built(&self) -> u32 {
        ROADS_PER_PLAYER - self.roads_left
    }

    /// Points from buildings alone: 1 per settlement, 2 per city
    pub fn building_points(&self) -> u32 {
        self.settlements_standing() + 2 * self.cities_built()
    }

    /// Calculate total victory points
    pub fn victory_points(&self) -> u32 {
        let mut vp = self.building_points();

        if self.has_longest_road {
            vp += 2;
        }
        if self.has_largest_army {
            vp += 2;
        }

        vp + self.dev_cards.victory_point
    }

    /// Bank exchange rate for giving away `resource`
    pub fn trade_rate(&self, resource: Resource) -> u32 {
        self.trading_cost
            .get(&resource)
            .copied()
            .unwrap_or(DEFAULT_TRADE_RATE)
    }

    /// Lower exchange rates for a newly settled port
    pub fn apply_port(&mut self, port: PortKind) {
        match port {
            PortKind::Generic => {
                for rate in self.trading_cost.values_mut() {
                    *rate = (*rate).min(PortKind::Generic.rate());
                }
            }
            PortKind::Specific(resource) => {
                self.trading_cost.insert(resource, port.rate());
            }
        }
    }

    /// Can this player afford a road?
    pub fn can_afford_road(&self) -> bool {
        self.resources.can_afford(&costs::road()) && self.roads_left > 0
    }

    /// Can this player afford a settlement?
    pub fn can_afford_settlement(&self) -> bool {
        self.resources.can_afford(&costs::settlement()) && self.settlements_left > 0
    }

    /// Can this player afford a city upgrade?
    pub fn can_afford_city(&self) -> bool {
        self.resources.can_afford(&costs::city()) && self.cities_left > 0
    }

    /// Can this player afford a development card?
    pub fn can_afford_dev_card(&self) -> bool {
        self.resources.can_afford(&costs::development_card())
    }
}
