//! Game and search configuration.

use serde::{Deserialize, Serialize};

/// Rules knobs for a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Main-phase turns before the game is declared a draw
    pub turn_limit: u32,

    /// Victory points needed to win
    pub victory_points_to_win: u32,

    /// Player-to-player trade offers allowed per turn
    pub player_trade_limit: u32,

    /// Whether `GameState::reward` adds the early-building bonus
    pub reward_shaping: bool,

    /// A settlement or city built within this many main-phase turns earns
    /// the shaping bonus
    pub early_build_turns: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_limit: 1000,
            victory_points_to_win: 10,
            player_trade_limit: 1,
            reward_shaping: false,
            early_build_turns: 8,
        }
    }
}

impl GameConfig {
    /// Builder pattern: set the turn limit.
    pub fn with_turn_limit(mut self, turns: u32) -> Self {
        self.turn_limit = turns;
        self
    }

    /// Builder pattern: set the victory point target.
    pub fn with_victory_points(mut self, points: u32) -> Self {
        self.victory_points_to_win = points;
        self
    }

    /// Builder pattern: set the per-turn trade offer limit.
    pub fn with_player_trade_limit(mut self, limit: u32) -> Self {
        self.player_trade_limit = limit;
        self
    }

    /// Builder pattern: enable or disable reward shaping.
    pub fn with_reward_shaping(mut self, enabled: bool) -> Self {
        self.reward_shaping = enabled;
        self
    }
}

/// Policy used to play out rollouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RolloutPolicy {
    /// Uniform over legal actions
    Random,
    /// Skewed toward cities, settlements and dev cards
    Weighted,
}

/// When an MCTS agent searches instead of playing its fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    /// Only initial settlement and road placement
    InitialPlacement,
    /// Every decision with more than one legal action
    Always,
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MctsConfig {
    /// Select/expand/simulate/backpropagate iterations per tree
    pub iterations: u32,

    /// Exploration constant for the UCB1 formula.
    /// 0.0 makes selection purely greedy on mean value.
    pub exploration: f64,

    /// Prune initial settlement candidates at or below the median pip count
    pub pruning: bool,

    /// Give rollouts the early-building shaping bonus
    pub reward_shaping: bool,

    /// Independent trees grown in parallel and merged at the root.
    /// 1 means a single tree on the calling thread.
    pub ensemble_trees: usize,

    /// Turn limit applied to rollout clones
    pub rollout_turn_limit: u32,

    pub rollout_policy: RolloutPolicy,

    pub search_scope: SearchScope,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            exploration: 0.75,
            pruning: true,
            reward_shaping: true,
            ensemble_trees: 1,
            rollout_turn_limit: 1000,
            rollout_policy: RolloutPolicy::Weighted,
            search_scope: SearchScope::InitialPlacement,
        }
    }
}

impl MctsConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            iterations: 20,
            rollout_turn_limit: 60,
            ..Self::default()
        }
    }

    /// Builder pattern: set number of iterations.
    pub fn with_iterations(mut self, n: u32) -> Self {
        self.iterations = n;
        self
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: enable or disable placement pruning.
    pub fn with_pruning(mut self, enabled: bool) -> Self {
        self.pruning = enabled;
        self
    }

    /// Builder pattern: enable or disable reward shaping in rollouts.
    pub fn with_reward_shaping(mut self, enabled: bool) -> Self {
        self.reward_shaping = enabled;
        self
    }

    /// Builder pattern: set the number of ensemble trees.
    pub fn with_ensemble_trees(mut self, trees: usize) -> Self {
        self.ensemble_trees = trees.max(1);
        self
    }

    /// Builder pattern: set the rollout turn limit.
    pub fn with_rollout_turn_limit(mut self, turns: u32) -> Self {
        self.rollout_turn_limit = turns;
        self
    }

    /// Builder pattern: set the rollout policy.
    pub fn with_rollout_policy(mut self, policy: RolloutPolicy) -> Self {
        self.rollout_policy = policy;
        self
    }

    /// Builder pattern: set when the agent searches.
    pub fn with_search_scope(mut self, scope: SearchScope) -> Self {
        self.search_scope = scope;
        self
    }
}
