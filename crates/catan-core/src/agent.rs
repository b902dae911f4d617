//! Decision makers that pick one action from the legal set.
//!
//! - Random: uniform over legal actions
//! - Weighted: random, skewed toward cities, settlements and dev cards
//! - MCTS: tree search (see [`crate::mcts`])

use crate::actions::{Action, ActionKind};
use crate::config::MctsConfig;
use crate::game::GameState;
use crate::mcts::MctsAgent;
use crate::player::Colour;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Anything that can take a seat at the table.
pub trait Agent: Send {
    /// Human-readable name for this agent.
    fn name(&self) -> &str;

    /// Pick one of `legal`. `state` is the full game when the caller is
    /// willing to share it; rollouts pass `None`.
    fn choose_action(&mut self, legal: &[Action], state: Option<&GameState>) -> Option<Action>;
}

/// Picks uniformly at random.
pub struct RandomAgent {
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "Random"
    }

    fn choose_action(&mut self, legal: &[Action], _state: Option<&GameState>) -> Option<Action> {
        legal.choose(&mut self.rng).cloned()
    }
}

/// Relative pick weight for an action
pub fn action_weight(action: &Action) -> u32 {
    match action.kind() {
        ActionKind::BuildCity => 10_000,
        ActionKind::BuildSettlement => 1_000,
        ActionKind::BuyDevCard => 100,
        _ => 1,
    }
}

/// Pick one action with probability proportional to `action_weight`
pub fn choose_weighted(legal: &[Action], rng: &mut ChaCha8Rng) -> Option<Action> {
    legal.choose_weighted(rng, action_weight).ok().cloned()
}

/// Random, but cities > settlements > dev cards > everything else.
pub struct WeightedRandomAgent {
    rng: ChaCha8Rng,
}

impl WeightedRandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for WeightedRandomAgent {
    fn name(&self) -> &str {
        "Weighted"
    }

    fn choose_action(&mut self, legal: &[Action], _state: Option<&GameState>) -> Option<Action> {
        choose_weighted(legal, &mut self.rng)
    }
}

/// Agent selector for the CLI and batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Random,
    Weighted,
    Mcts,
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(AgentKind::Random),
            "weighted" => Ok(AgentKind::Weighted),
            "mcts" => Ok(AgentKind::Mcts),
            other => Err(format!("unknown agent kind: {other}")),
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentKind::Random => "random",
            AgentKind::Weighted => "weighted",
            AgentKind::Mcts => "mcts",
        };
        write!(f, "{name}")
    }
}

/// Build an agent for `colour`
pub fn make_agent(kind: AgentKind, colour: Colour, seed: u64, mcts: &MctsConfig) -> Box<dyn Agent> {
    match kind {
        AgentKind::Random => Box::new(RandomAgent::new(seed)),
        AgentKind::Weighted => Box::new(WeightedRandomAgent::new(seed)),
        AgentKind::Mcts => Box::new(MctsAgent::new(colour, mcts.clone(), seed)),
    }
}
