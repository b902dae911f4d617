//! Catan simulator - core engine
//!
//! This crate provides everything needed to play and study games of Catan:
//! - Hex coordinate system and pixel layout for the board
//! - Randomized map generation with ports and number tokens
//! - Board occupancy, placement rules and Longest Road
//! - Game state machine with full rule enforcement
//! - Random, weighted and tree-search agents
//!
//! # Modules
//!
//! - [`hex`]: Cube coordinates, layouts and board vertices
//! - [`map`]: Tiles, vertices, edges and map generation
//! - [`board`]: Placement queries, building and resource demand
//! - [`player`]: Player state, hands and costs
//! - [`game`]: Game state machine and statistics
//! - [`agent`]: The `Agent` trait and simple policies
//! - [`mcts`]: Monte Carlo Tree Search

pub mod actions;
pub mod agent;
pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod hex;
pub mod map;
pub mod mcts;
pub mod player;

// Re-export commonly used types
pub use actions::{Action, ActionKind, GameEvent};
pub use agent::{make_agent, Agent, AgentKind, RandomAgent, WeightedRandomAgent};
pub use board::{Board, Demand};
pub use config::{GameConfig, MctsConfig, RolloutPolicy, SearchScope};
pub use error::GameError;
pub use game::{GamePhase, GameState, GameTracker, TurnStage};
pub use hex::{HexCoord, Layout, Point};
pub use map::{CatanMap, EdgeId, PortKind, Resource, TileKind};
pub use mcts::{MctsAgent, SearchResult};
pub use player::{Colour, DevCard, Player, ResourceHand};
