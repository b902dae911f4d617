//! Board representation for a game in progress.
//!
//! The board wraps a generated `CatanMap` and owns every rule that touches
//! the map itself:
//! - placement legality (distance rule, road connectivity)
//! - building roads, settlements and cities
//! - robber movement and production lookups
//! - longest road search

use crate::actions::GameEvent;
use crate::error::GameError;
use crate::hex::{HexCoord, Point};
use crate::map::{Building, CatanMap, EdgeId, Hextile, Resource};
use crate::player::{Colour, Player, Players};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Minimum road length before the Longest Road bonus is awarded
pub const LONGEST_ROAD_MIN: u32 = 5;

/// Units owed per colour for each resource
pub type Demand = BTreeMap<Resource, BTreeMap<Colour, u32>>;

/// The game board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    map: CatanMap,
}

impl Board {
    pub fn new(map: CatanMap) -> Self {
        Self { map }
    }

    /// Generate a board with a random map
    pub fn generate<R: Rng>(rng: &mut R) -> Result<Self, GameError> {
        Ok(Self::new(CatanMap::generate(rng)?))
    }

    // ==================== Query Methods ====================

    /// The underlying map, read-only
    pub fn map(&self) -> &CatanMap {
        &self.map
    }

    pub fn robber_location(&self) -> HexCoord {
        self.map.robber()
    }

    pub fn hex(&self, coord: &HexCoord) -> Option<&Hextile> {
        self.map.hex(coord)
    }

    /// Endpoints of a player's roads, deduplicated and ordered
    fn road_endpoints(&self, player: &Player) -> BTreeSet<Point> {
        player
            .owned_edges
            .iter()
            .filter_map(|id| self.map.edge(*id))
            .flat_map(|edge| edge.vertices)
            .collect()
    }

    // ==================== Validation Methods ====================

    /// Check if a vertex and all its neighbors are unclaimed
    pub fn satisfies_distance_rule(&self, point: &Point) -> bool {
        let Some(vertex) = self.map.vertex(point) else {
            return false;
        };

        vertex.owner.is_none()
            && vertex
                .vertex_neighbors
                .iter()
                .all(|n| self.map.vertex(n).is_some_and(|v| v.owner.is_none()))
    }

    /// Legal settlement spots. During initial placement any vertex obeying
    /// the distance rule qualifies, afterwards it must touch an owned road.
    pub fn settlement_spots(&self, player: &Player, initial: bool) -> Vec<Point> {
        if initial {
            return self
                .map
                .vertices()
                .keys()
                .filter(|p| self.satisfies_distance_rule(p))
                .copied()
                .collect();
        }

        self.road_endpoints(player)
            .into_iter()
            .filter(|p| self.satisfies_distance_rule(p))
            .collect()
    }

    /// Unroaded edges touching a vertex of the player's road network that is
    /// not blocked by an opponent's building
    pub fn road_spots(&self, player: &Player) -> Vec<EdgeId> {
        let mut spots = BTreeSet::new();

        for point in self.road_endpoints(player) {
            let Some(vertex) = self.map.vertex(&point) else {
                continue;
            };
            if vertex.owner.is_some_and(|o| o != player.colour) {
                continue;
            }
            spots.extend(
                vertex
                    .edge_neighbors
                    .iter()
                    .filter(|id| self.map.edge(**id).is_some_and(|e| !e.has_road)),
            );
        }

        spots.into_iter().collect()
    }

    /// Roads allowed right after an initial settlement: edges touching it
    pub fn setup_road_spots(&self, point: &Point) -> Vec<EdgeId> {
        self.map
            .vertex(point)
            .map(|vertex| {
                vertex
                    .edge_neighbors
                    .iter()
                    .filter(|id| self.map.edge(**id).is_some_and(|e| !e.has_road))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The player's settlements that can be upgraded
    pub fn city_spots(&self, player: &Player) -> Vec<Point> {
        player
            .owned_vertices
            .iter()
            .filter(|p| {
                self.map
                    .vertex(p)
                    .is_some_and(|v| v.building == Some(Building::Settlement))
            })
            .copied()
            .collect()
    }

    /// Every robber destination paired with each opponent that could be
    /// robbed there, or `None` when nobody can be
    pub fn robber_targets(
        &self,
        colour: Colour,
        players: &Players,
    ) -> Vec<(HexCoord, Option<Colour>)> {
        let mut targets = Vec::new();

        for (coord, tile) in self.map.land_hexes().filter(|(_, t)| !t.has_robber) {
            let victims: BTreeSet<Colour> = tile
                .vertex_neighbors
                .iter()
                .filter_map(|p| self.map.vertex(p).and_then(|v| v.owner))
                .filter(|owner| *owner != colour)
                .filter(|owner| players.get(owner).is_some_and(|p| !p.resources.is_empty()))
                .collect();

            if victims.is_empty() {
                targets.push((*coord, None));
            } else {
                targets.extend(victims.into_iter().map(|v| (*coord, Some(v))));
            }
        }

        targets
    }

    // ==================== Mutation Methods ====================

    /// Place a road and re-evaluate Longest Road
    pub fn build_road(
        &mut self,
        players: &mut Players,
        colour: Colour,
        edge_id: EdgeId,
    ) -> Result<Vec<GameEvent>, GameError> {
        let player = players
            .get_mut(&colour)
            .ok_or_else(|| GameError::UnknownPlayer(colour.to_string()))?;
        if player.roads_left == 0 {
            return Err(GameError::NoPiecesRemaining);
        }

        let edge = self.map.edge_mut(edge_id)?;
        if edge.has_road {
            return Err(GameError::InvalidLocation);
        }
        edge.has_road = true;
        edge.owner = Some(colour);

        player.owned_edges.push(edge_id);
        player.roads_left -= 1;
        player.longest_road_length = self.longest_road(colour);
        trace!(%colour, edge_id, length = player.longest_road_length, "road built");

        let mut events = vec![GameEvent::RoadBuilt {
            player: colour,
            edge: edge_id,
        }];
        events.extend(Self::update_longest_road(players, colour));
        Ok(events)
    }

    /// Place a settlement, applying any port it sits on
    pub fn build_settlement(
        &mut self,
        players: &mut Players,
        colour: Colour,
        point: Point,
    ) -> Result<Vec<GameEvent>, GameError> {
        if !self.satisfies_distance_rule(&point) {
            return Err(GameError::InvalidLocation);
        }
        let player = players
            .get_mut(&colour)
            .ok_or_else(|| GameError::UnknownPlayer(colour.to_string()))?;
        if player.settlements_left == 0 {
            return Err(GameError::NoPiecesRemaining);
        }

        let vertex = self.map.vertex_mut(&point)?;
        vertex.owner = Some(colour);
        vertex.building = Some(Building::Settlement);
        if let Some(port) = vertex.port {
            player.apply_port(port);
        }

        player.owned_vertices.push(point);
        player.settlements_left -= 1;
        trace!(%colour, %point, "settlement built");

        // A new settlement can cut through an opponent's road
        for (other, p) in players.iter_mut() {
            if *other != colour && !p.owned_edges.is_empty() {
                p.longest_road_length = self.longest_road(*other);
            }
        }

        let mut events = vec![GameEvent::SettlementBuilt {
            player: colour,
            location: point,
        }];
        events.extend(Self::recheck_longest_road(players));
        Ok(events)
    }

    /// Upgrade one of the player's settlements to a city
    pub fn build_city(
        &mut self,
        players: &mut Players,
        colour: Colour,
        point: Point,
    ) -> Result<Vec<GameEvent>, GameError> {
        let player = players
            .get_mut(&colour)
            .ok_or_else(|| GameError::UnknownPlayer(colour.to_string()))?;
        if player.cities_left == 0 {
            return Err(GameError::NoPiecesRemaining);
        }

        let vertex = self.map.vertex_mut(&point)?;
        if vertex.owner != Some(colour) || vertex.building != Some(Building::Settlement) {
            return Err(GameError::InvalidLocation);
        }
        vertex.building = Some(Building::City);

        player.cities_left -= 1;
        player.settlements_left += 1; // Settlement piece returned
        trace!(%colour, %point, "city built");

        Ok(vec![GameEvent::CityBuilt {
            player: colour,
            location: point,
        }])
    }

    /// Move the robber, returning where it was
    pub fn move_robber(&mut self, to: HexCoord) -> Result<HexCoord, GameError> {
        let from = self.map.robber();
        if from == to {
            return Err(GameError::InvalidRobberMove);
        }
        self.map.set_robber(to)?;
        Ok(from)
    }

    /// Transfer Longest Road to `colour` if it now beats the holder
    fn update_longest_road(players: &mut Players, colour: Colour) -> Option<GameEvent> {
        let length = players.get(&colour)?.longest_road_length;
        if length < LONGEST_ROAD_MIN {
            return None;
        }

        let holder = players
            .values()
            .find(|p| p.has_longest_road)
            .map(|p| (p.colour, p.longest_road_length));

        match holder {
            Some((current, _)) if current == colour => None,
            Some((_, held)) if length <= held => None,
            _ => {
                let previous = holder.map(|(c, _)| c);
                if let Some(prev) = previous.and_then(|c| players.get_mut(&c)) {
                    prev.has_longest_road = false;
                }
                players.get_mut(&colour)?.has_longest_road = true;
                Some(GameEvent::LongestRoadChanged {
                    previous,
                    current: colour,
                    length,
                })
            }
        }
    }

    /// After a road is cut, the holder keeps Longest Road only while still
    /// eligible and not behind anyone. Otherwise it passes to the sole
    /// longest road, or is set aside on a tie.
    fn recheck_longest_road(players: &mut Players) -> Option<GameEvent> {
        let (holder, held) = players
            .values()
            .find(|p| p.has_longest_road)
            .map(|p| (p.colour, p.longest_road_length))?;
        let best = players
            .values()
            .map(|p| p.longest_road_length)
            .max()
            .unwrap_or(0);
        if held >= LONGEST_ROAD_MIN && held >= best {
            return None;
        }

        players.get_mut(&holder)?.has_longest_road = false;
        let leaders: Vec<Colour> = players
            .values()
            .filter(|p| best >= LONGEST_ROAD_MIN && p.longest_road_length == best)
            .map(|p| p.colour)
            .collect();

        match leaders.as_slice() {
            [leader] => {
                players.get_mut(leader)?.has_longest_road = true;
                Some(GameEvent::LongestRoadChanged {
                    previous: Some(holder),
                    current: *leader,
                    length: best,
                })
            }
            _ => Some(GameEvent::LongestRoadLost { player: holder }),
        }
    }

    // ==================== Resource Distribution ====================

    /// Resources owed for a dice roll: 1 per settlement and 2 per city on
    /// every matching hex not blocked by the robber
    pub fn demand_for_roll(&self, roll: u8) -> Demand {
        let mut demand = Demand::new();

        for coord in self.map.hexes_with_value(roll) {
            let Some(tile) = self.map.hex(coord) else {
                continue;
            };
            if tile.has_robber {
                continue;
            }
            let Some(resource) = tile.kind.resource() else {
                continue;
            };

            for point in &tile.vertex_neighbors {
                let Some(vertex) = self.map.vertex(point) else {
                    continue;
                };
                if let (Some(owner), Some(building)) = (vertex.owner, vertex.building) {
                    *demand
                        .entry(resource)
                        .or_default()
                        .entry(owner)
                        .or_default() += building.production();
                }
            }
        }

        demand
    }

    /// Resources owed for a second initial settlement: one per adjacent
    /// producing hex
    pub fn demand_for_settlement(&self, point: &Point) -> Demand {
        let mut demand = Demand::new();
        let Some(vertex) = self.map.vertex(point) else {
            return demand;
        };
        let Some(owner) = vertex.owner else {
            return demand;
        };

        for coord in &vertex.hex_neighbors {
            if let Some(resource) = self.map.hex(coord).and_then(|t| t.kind.resource()) {
                *demand
                    .entry(resource)
                    .or_default()
                    .entry(owner)
                    .or_default() += 1;
            }
        }

        demand
    }

    // ==================== Longest Road Calculation ====================

    /// Length of the longest simple path through `colour`'s roads.
    /// A path may start at an opponent's building but never runs into one.
    pub fn longest_road(&self, colour: Colour) -> u32 {
        let owned: Vec<EdgeId> = self
            .map
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.owner == Some(colour))
            .map(|(id, _)| id)
            .collect();

        let mut visited = vec![false; self.map.edges().len()];
        let mut max_length = 0;

        for id in owned {
            let Some(edge) = self.map.edge(id) else {
                continue;
            };
            for start in edge.vertices {
                max_length = max_length.max(self.dfs_road_length(colour, start, &mut visited));
            }
        }

        max_length
    }

    fn dfs_road_length(&self, colour: Colour, from: Point, visited: &mut [bool]) -> u32 {
        let Some(vertex) = self.map.vertex(&from) else {
            return 0;
        };

        let mut longest = 0;
        for &id in &vertex.edge_neighbors {
            let Some(edge) = self.map.edge(id) else {
                continue;
            };
            if edge.owner != Some(colour) || visited[id] {
                continue;
            }

            let far = edge.other_end(&from);
            let blocked = self
                .map
                .vertex(&far)
                .and_then(|v| v.owner)
                .is_some_and(|owner| owner != colour);
            if blocked {
                continue;
            }

            visited[id] = true;
            longest = longest.max(1 + self.dfs_road_length(colour, far, visited));
            visited[id] = false;
        }

        longest
    }
}
