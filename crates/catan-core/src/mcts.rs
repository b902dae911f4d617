//! Monte Carlo Tree Search over cloned game states.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Every node owns the
//! state reached by applying its action to the parent's state. Rewards are
//! always from the searching colour's perspective and are added unchanged at
//! every level on the way back up.

use crate::actions::Action;
use crate::agent::{choose_weighted, Agent};
use crate::config::{MctsConfig, RolloutPolicy, SearchScope};
use crate::error::GameError;
use crate::game::{GamePhase, GameState};
use crate::player::Colour;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

/// Dice-probability weight of a number token
pub fn pip_count(value: u8) -> u32 {
    match value {
        2 | 12 => 1,
        3 | 11 => 2,
        4 | 10 => 3,
        5 | 9 => 4,
        6 | 8 => 5,
        _ => 0,
    }
}

/// Keep initial settlement candidates whose pip total is strictly above
/// the median. Falls back to the full list if nothing survives.
pub fn prune_placements(state: &GameState, actions: Vec<Action>) -> Vec<Action> {
    let map = state.board.map();
    let pips_at = |action: &Action| -> u32 {
        let Action::BuildSettlement(point) = action else {
            return 0;
        };
        map.vertex(point).map_or(0, |v| {
            v.hex_neighbors
                .iter()
                .filter_map(|coord| map.hex(coord).and_then(|h| h.value))
                .map(pip_count)
                .sum()
        })
    };

    let pips: Vec<u32> = actions.iter().map(pips_at).collect();
    let Some(med) = median(&pips) else {
        return actions;
    };

    let pruned: Vec<Action> = actions
        .iter()
        .zip(&pips)
        .filter(|(_, p)| f64::from(**p) > med)
        .map(|(a, _)| a.clone())
        .collect();

    if pruned.is_empty() {
        actions
    } else {
        pruned
    }
}

fn median(values: &[u32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    })
}

// ==================== Tree ====================

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct MctsNode {
    /// Parent node index (NONE for root)
    pub parent: NodeId,
    /// Action that led here from the parent (None for root)
    pub action: Option<Action>,
    pub state: GameState,
    /// Legal actions not yet expanded into children
    pub untried: Vec<Action>,
    pub children: Vec<NodeId>,
    pub visit_count: u32,
    pub value_sum: f64,
}

impl MctsNode {
    fn new(parent: NodeId, action: Option<Action>, state: GameState, untried: Vec<Action>) -> Self {
        Self {
            parent,
            action,
            state,
            untried,
            children: Vec::new(),
            visit_count: 0,
            value_sum: 0.0,
        }
    }

    /// Mean reward, 0.0 if never visited.
    pub fn mean_value(&self) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / f64::from(self.visit_count)
        }
    }

    /// UCB1: mean + c * sqrt(ln(N) / n)
    pub fn ucb_score(&self, parent_visits_ln: f64, exploration: f64) -> f64 {
        if self.visit_count == 0 {
            return f64::INFINITY;
        }
        self.mean_value() + exploration * (parent_visits_ln / f64::from(self.visit_count)).sqrt()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_over()
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }
}

/// Search tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree {
    nodes: Vec<MctsNode>,
}

impl MctsTree {
    /// Root the tree at `state`. With `prune`, an initial settlement
    /// decision only considers high-pip spots.
    pub fn new(state: GameState, prune: bool) -> Self {
        let mut untried = state.legal_actions();
        if prune && state.is_initial_settlement_step() {
            untried = prune_placements(&state, untried);
        }
        Self {
            nodes: vec![MctsNode::new(NodeId::NONE, None, state, untried)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> &MctsNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child with the highest UCB score. Ties go to the earliest child.
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(id);
        let parent_visits_ln = f64::from(node.visit_count.max(1)).ln();

        let mut best: Option<(NodeId, f64)> = None;
        for child in &node.children {
            let score = self.get(*child).ucb_score(parent_visits_ln, exploration);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((*child, score));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Walk down fully expanded nodes until reaching a leaf
    pub fn select(&self, exploration: f64) -> NodeId {
        let mut current = self.root();
        loop {
            let node = self.get(current);
            if node.is_terminal() || !node.is_fully_expanded() {
                return current;
            }
            match self.select_child(current, exploration) {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// Apply one untried action to a copy of the node's state
    pub fn expand(&mut self, id: NodeId) -> Result<NodeId, GameError> {
        let node = self.get_mut(id);
        let Some(action) = node.untried.pop() else {
            return Ok(id);
        };

        let mut state = node.state.clone();
        let colour = state.current_colour();
        state.step(colour, action.clone())?;
        let untried = state.legal_actions();

        let child = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(MctsNode::new(id, Some(action), state, untried));
        self.get_mut(id).children.push(child);
        Ok(child)
    }

    /// Add `reward` to every node from `leaf` up to the root.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let mut current = leaf;
        while current.is_some() {
            let node = self.get_mut(current);
            node.visit_count += 1;
            node.value_sum += reward;
            current = node.parent;
        }
    }

    /// Visit statistics of the root's children, in expansion order
    pub fn root_stats(&self) -> Vec<ChildStats> {
        self.get(self.root())
            .children
            .iter()
            .filter_map(|id| {
                let node = self.get(*id);
                node.action.clone().map(|action| ChildStats {
                    action,
                    visits: node.visit_count,
                    value: node.value_sum,
                })
            })
            .collect()
    }
}

// ==================== Search ====================

/// Aggregated statistics for one root action.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildStats {
    pub action: Action,
    pub visits: u32,
    pub value: f64,
}

/// Outcome of a search: merged root statistics from every tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    pub children: Vec<ChildStats>,
}

impl SearchResult {
    /// Most visited root action. Ties go to the earliest child.
    pub fn best_action(&self) -> Option<Action> {
        let mut best: Option<&ChildStats> = None;
        for child in &self.children {
            if best.map_or(true, |b| child.visits > b.visits) {
                best = Some(child);
            }
        }
        best.map(|c| c.action.clone())
    }

    pub fn total_visits(&self) -> u32 {
        self.children.iter().map(|c| c.visits).sum()
    }

    /// Fold another tree's root statistics into this one, matching by action
    pub fn merge(&mut self, other: Vec<ChildStats>) {
        for stats in other {
            match self.children.iter_mut().find(|c| c.action == stats.action) {
                Some(existing) => {
                    existing.visits += stats.visits;
                    existing.value += stats.value;
                }
                None => self.children.push(stats),
            }
        }
    }
}

/// Play `state` to the end with `policy` for every seat and score it
/// for `colour`.
pub fn rollout(
    mut state: GameState,
    colour: Colour,
    policy: RolloutPolicy,
    rng: &mut ChaCha8Rng,
) -> Result<f64, GameError> {
    while !state.is_over() {
        let legal = state.legal_actions();
        let action = match policy {
            RolloutPolicy::Random => legal.choose(rng).cloned(),
            RolloutPolicy::Weighted => choose_weighted(&legal, rng),
        };
        let current = state.current_colour();
        let action = action.ok_or_else(|| GameError::NoActionChosen(current.to_string()))?;
        state.step(current, action)?;
    }
    Ok(state.reward(colour))
}

/// Grow one tree from `state` and return its root statistics.
fn grow_tree(
    state: &GameState,
    colour: Colour,
    config: &MctsConfig,
    seed: u64,
) -> Result<Vec<ChildStats>, GameError> {
    let mut root_state = state.clone();
    root_state.config.turn_limit = state.turn.saturating_add(config.rollout_turn_limit);
    root_state.config.reward_shaping = config.reward_shaping;

    let mut tree = MctsTree::new(root_state, config.pruning);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    for _ in 0..config.iterations {
        let mut node = tree.select(config.exploration);
        if !tree.get(node).is_terminal() && !tree.get(node).is_fully_expanded() {
            node = tree.expand(node)?;
        }
        let reward = rollout(
            tree.get(node).state.clone(),
            colour,
            config.rollout_policy,
            &mut rng,
        )?;
        tree.backpropagate(node, reward);
    }

    Ok(tree.root_stats())
}

/// Search from `state` on behalf of `colour`. With more than one ensemble
/// tree, trees grow in parallel with derived seeds and merge at the root.
pub fn search(
    state: &GameState,
    colour: Colour,
    config: &MctsConfig,
    seed: u64,
) -> Result<SearchResult, GameError> {
    let start = Instant::now();
    let trees = config.ensemble_trees.max(1);

    let mut result = SearchResult::default();
    if trees == 1 {
        result.merge(grow_tree(state, colour, config, seed)?);
    } else {
        let grown: Vec<Vec<ChildStats>> = (0..trees as u64)
            .into_par_iter()
            .map(|i| grow_tree(state, colour, config, seed.wrapping_add(i)))
            .collect::<Result<_, _>>()?;
        for stats in grown {
            result.merge(stats);
        }
    }

    debug!(
        %colour,
        trees,
        iterations = config.iterations,
        children = result.children.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "MCTS search complete"
    );
    Ok(result)
}

// ==================== Agent ====================

/// Tree search agent. Outside its search scope, or when no state is
/// shared, it plays the weighted random policy.
pub struct MctsAgent {
    colour: Colour,
    config: MctsConfig,
    rng: ChaCha8Rng,
}

impl MctsAgent {
    pub fn new(colour: Colour, config: MctsConfig, seed: u64) -> Self {
        Self {
            colour,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    fn in_scope(&self, state: &GameState) -> bool {
        let scoped = match self.config.search_scope {
            SearchScope::InitialPlacement => state.phase == GamePhase::InitialPlacement,
            SearchScope::Always => true,
        };
        scoped && state.current_colour() == self.colour
    }
}

impl Agent for MctsAgent {
    fn name(&self) -> &str {
        "MCTS"
    }

    fn choose_action(&mut self, legal: &[Action], state: Option<&GameState>) -> Option<Action> {
        if legal.len() == 1 {
            return legal.first().cloned();
        }

        if let Some(state) = state.filter(|s| self.in_scope(s)) {
            let seed = self.rng.gen::<u64>();
            match search(state, self.colour, &self.config, seed) {
                Ok(result) => {
                    if let Some(action) = result.best_action().filter(|a| legal.contains(a)) {
                        return Some(action);
                    }
                }
                Err(e) => warn!(colour = %self.colour, error = %e, "search failed, playing weighted"),
            }
        }

        choose_weighted(legal, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::config::GameConfig;
    use crate::hex::Point;
    use pretty_assertions::assert_eq;

    fn new_game(seed: u64) -> GameState {
        GameState::new(&Colour::ALL, GameConfig::default(), seed).unwrap()
    }

    #[test]
    fn test_pip_counts() {
        let pips: Vec<u32> = (2..=12).map(pip_count).collect();
        assert_eq!(pips, vec![1, 2, 3, 4, 5, 0, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3, 1, 2]), Some(2.0));
        assert_eq!(median(&[4, 1, 2, 3]), Some(2.5));
    }

    #[test]
    fn test_pruning_keeps_above_median() {
        let game = new_game(1);
        let actions = game.legal_actions();
        let pruned = prune_placements(&game, actions.clone());

        assert!(!pruned.is_empty());
        assert!(pruned.len() < actions.len());
        assert!(pruned.iter().all(|a| actions.contains(a)));
    }

    #[test]
    fn test_pruning_falls_back_to_full_list() {
        let game = new_game(2);
        // Points off the board all score zero, so nothing beats the median
        let actions = vec![
            Action::BuildSettlement(Point::new(-1000.0, -1000.0)),
            Action::BuildSettlement(Point::new(-2000.0, -2000.0)),
        ];
        assert_eq!(prune_placements(&game, actions.clone()), actions);
    }

    #[test]
    fn test_backpropagate_adds_uniformly() {
        let mut tree = MctsTree::new(new_game(3), false);
        let child = tree.expand(tree.root()).unwrap();
        let grandchild = tree.expand(child).unwrap();

        tree.backpropagate(grandchild, -1.0);

        for id in [tree.root(), child, grandchild] {
            assert_eq!(tree.get(id).visit_count, 1);
            assert_eq!(tree.get(id).value_sum, -1.0);
        }
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_select_prefers_unvisited_leaf() {
        let mut tree = MctsTree::new(new_game(4), false);
        // Root still has untried actions, so it is the leaf
        assert_eq!(tree.select(0.75), tree.root());

        let child = tree.expand(tree.root()).unwrap();
        tree.backpropagate(child, 1.0);
        assert_eq!(tree.select(0.75), tree.root());
    }

    /// Fully expanded root with three children holding the given
    /// (visits, value) statistics
    fn tree_with_stats(stats: [(u32, f64); 3]) -> (MctsTree, Vec<NodeId>) {
        let mut tree = MctsTree::new(new_game(4), false);
        let root = tree.root();
        let children: Vec<NodeId> = (0..3).map(|_| tree.expand(root).unwrap()).collect();
        tree.get_mut(root).untried.clear();

        tree.get_mut(root).visit_count = stats.iter().map(|s| s.0).sum();
        for (child, (visits, value)) in children.iter().zip(stats) {
            let node = tree.get_mut(*child);
            node.visit_count = visits;
            node.value_sum = value;
        }
        (tree, children)
    }

    #[test]
    fn test_ucb_score() {
        let (tree, children) = tree_with_stats([(5, 2.5), (1, 0.3), (4, 2.4)]);
        let ln = 10f64.ln();

        let expected = 0.3 + 0.75 * ln.sqrt();
        assert!((tree.get(children[1]).ucb_score(ln, 0.75) - expected).abs() < 1e-9);
        assert_eq!(tree.get(children[0]).ucb_score(ln, 0.0), 0.5);
    }

    #[test]
    fn test_select_child_balances_exploration() {
        let (tree, children) = tree_with_stats([(5, 2.5), (1, 0.3), (4, 2.4)]);
        let root = tree.root();

        // 0.3 + 0.75 * sqrt(ln 10) beats 0.6 + 0.75 * sqrt(ln 10 / 4)
        assert_eq!(tree.select_child(root, 0.75), Some(children[1]));
        assert_eq!(tree.select(0.75), children[1]);

        // Without exploration the best mean wins
        assert_eq!(tree.select_child(root, 0.0), Some(children[2]));
        assert_eq!(tree.select(0.0), children[2]);
    }

    #[test]
    fn test_select_child_ties_go_to_first() {
        let (tree, children) = tree_with_stats([(3, 1.5), (3, 1.5), (3, 1.5)]);
        assert_eq!(tree.select_child(tree.root(), 0.75), Some(children[0]));
        assert_eq!(tree.select_child(tree.root(), 0.0), Some(children[0]));
    }

    #[test]
    fn test_select_child_prefers_unvisited() {
        let (tree, children) = tree_with_stats([(5, 5.0), (0, 0.0), (5, 5.0)]);
        assert_eq!(tree.select_child(tree.root(), 0.75), Some(children[1]));
    }

    #[test]
    fn test_search_visits_sum_to_iterations() {
        let game = new_game(5);
        let config = MctsConfig::for_testing();
        let result = search(&game, game.current_colour(), &config, 7).unwrap();

        assert_eq!(result.total_visits(), config.iterations);
        let best = result.best_action().unwrap();
        assert_eq!(best.kind(), ActionKind::BuildSettlement);
        assert!(game.legal_actions().contains(&best));
    }

    #[test]
    fn test_search_is_deterministic() {
        let game = new_game(6);
        let config = MctsConfig::for_testing().with_iterations(10);
        let colour = game.current_colour();

        let a = search(&game, colour, &config, 11).unwrap();
        let b = search(&game, colour, &config, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ensemble_merges_trees() {
        let game = new_game(7);
        let config = MctsConfig::for_testing()
            .with_iterations(8)
            .with_ensemble_trees(3);
        let result = search(&game, game.current_colour(), &config, 1).unwrap();

        assert_eq!(result.total_visits(), 24);
        for child in &result.children {
            let copies = result
                .children
                .iter()
                .filter(|c| c.action == child.action)
                .count();
            assert_eq!(copies, 1);
        }
    }

    #[test]
    fn test_merge_matches_by_action() {
        let mut result = SearchResult::default();
        result.merge(vec![ChildStats {
            action: Action::EndTurn,
            visits: 3,
            value: 1.0,
        }]);
        result.merge(vec![
            ChildStats {
                action: Action::EndTurn,
                visits: 2,
                value: -1.0,
            },
            ChildStats {
                action: Action::BuyDevCard,
                visits: 6,
                value: 2.0,
            },
        ]);

        assert_eq!(result.children.len(), 2);
        assert_eq!(result.children[0].visits, 5);
        assert_eq!(result.children[0].value, 0.0);
        assert_eq!(result.best_action(), Some(Action::BuyDevCard));
    }

    #[test]
    fn test_rollout_reward_in_range() {
        let game = new_game(8);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let reward = rollout(game, Colour::Red, RolloutPolicy::Random, &mut rng).unwrap();
        assert!([-1.0, 0.0, 1.0].contains(&reward));
    }

    #[test]
    fn test_agent_returns_only_action() {
        let mut agent = MctsAgent::new(Colour::Red, MctsConfig::for_testing(), 1);
        let legal = vec![Action::EndTurn];
        assert_eq!(agent.choose_action(&legal, None), Some(Action::EndTurn));
    }

    #[test]
    fn test_agent_searches_initial_placement() {
        let game = new_game(9);
        let colour = game.current_colour();
        let mut agent = MctsAgent::new(colour, MctsConfig::for_testing(), 3);
        let legal = game.legal_actions();

        let action = agent.choose_action(&legal, Some(&game)).unwrap();
        assert!(legal.contains(&action));
    }

    #[test]
    fn test_agent_without_state_plays_weighted() {
        let mut agent = MctsAgent::new(Colour::Red, MctsConfig::for_testing(), 4);
        let legal = vec![
            Action::EndTurn,
            Action::BuildCity(Point::new(1.0, 1.0)),
        ];
        let cities = (0..50)
            .filter_map(|_| agent.choose_action(&legal, None))
            .filter(|a| a.kind() == ActionKind::BuildCity)
            .count();
        assert!(cities >= 49);
    }
}
