//! Errors returned by map generation and the rules engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when generating a map or applying actions.
///
/// Every variant other than `MapGeneration` means the caller broke the
/// contract of `GameState::step`: the action was not in the legal set.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Map generation failed: {0}")]
    MapGeneration(String),

    #[error("Not your turn")]
    NotYourTurn,

    #[error("No player with colour {0}")]
    UnknownPlayer(String),

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Invalid placement location")]
    InvalidLocation,

    #[error("Unknown vertex {0}")]
    UnknownVertex(String),

    #[error("Unknown edge {0}")]
    UnknownEdge(usize),

    #[error("Unknown hex ({0}, {1}, {2})")]
    UnknownHex(i32, i32, i32),

    #[error("Cannot afford this")]
    CannotAfford,

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("No development cards left in the bank")]
    EmptyDeck,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("A development card was already played this turn")]
    DevCardAlreadyPlayed,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("Bank has no {0} left")]
    BankEmpty(String),

    #[error("Invalid player setup: {0}")]
    InvalidPlayers(String),

    #[error("Invalid robber move")]
    InvalidRobberMove,

    #[error("Agent for {0} returned no action")]
    NoActionChosen(String),

    #[error("Game is over")]
    GameOver,
}
