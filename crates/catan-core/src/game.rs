//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all turn logic:
//! - initial placement (forward pass, then reverse pass)
//! - dice, discards, robber and resource distribution
//! - legal action enumeration and action application
//! - bonus tracks, victory and turn-limit detection
//! - statistics for batch simulation

use crate::actions::{Action, GameEvent};
use crate::agent::Agent;
use crate::board::{Board, Demand};
use crate::config::GameConfig;
use crate::error::GameError;
use crate::hex::{HexCoord, Point};
use crate::map::{EdgeId, Resource};
use crate::player::{costs, Colour, DevCard, DevCardHand, Player, Players, ResourceHand};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Minimum knights for Largest Army
pub const LARGEST_ARMY_MIN: u32 = 3;

/// Players holding at least this many cards discard half on a seven
const DISCARD_LIMIT: u32 = 7;

/// Probability that an opponent holding the wanted card accepts an offer
const TRADE_ACCEPT_PROBABILITY: f64 = 0.5;

/// Reward added to a win when the winner built early
const SHAPING_BONUS: f64 = 0.5;

/// Game phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Settlement + road placements, forward then reverse order
    InitialPlacement,
    /// Regular turns
    Main,
    /// Game is over, `winner` is None on a draw
    GameOver { winner: Option<Colour> },
}

/// Sub-stage of a main-phase turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStage {
    /// Trading, building, dev cards, ending the turn
    Build,
    /// After rolling 7 or playing a knight, must move the robber
    MoveRobber,
    /// Playing road building card - free roads left to place
    RoadBuilding { roads_remaining: u8 },
}

/// Statistics collected over one game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameTracker {
    pub winner: Option<Colour>,
    /// Main-phase turns played
    pub game_length: u32,
    /// Actions applied by `play`
    pub ticks: u64,
    /// First main-phase turn in which anyone built a settlement or city
    pub first_building_turn: Option<u32>,
    /// Settlements ever placed, including ones later upgraded
    pub settlements_built: BTreeMap<Colour, u32>,
    pub cities_built: BTreeMap<Colour, u32>,
    pub resources_collected: BTreeMap<Colour, u32>,
    pub dev_cards_purchased: BTreeMap<Colour, u32>,
    pub victory_points: BTreeMap<Colour, u32>,
}

impl GameTracker {
    fn new(colours: &[Colour]) -> Self {
        let zeroed: BTreeMap<Colour, u32> = colours.iter().map(|c| (*c, 0)).collect();
        Self {
            settlements_built: zeroed.clone(),
            cities_built: zeroed.clone(),
            resources_collected: zeroed.clone(),
            dev_cards_purchased: zeroed.clone(),
            victory_points: zeroed,
            ..Self::default()
        }
    }
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// The game board
    pub board: Board,
    /// All players
    pub players: Players,
    /// Turn rotation, randomized at creation
    pub player_order: Vec<Colour>,
    /// Index into `player_order` during the main phase
    current_player: usize,
    /// Current game phase
    pub phase: GamePhase,
    /// Sub-stage of the current main-phase turn
    pub stage: TurnStage,
    /// Main-phase turn number (0 during initial placement)
    pub turn: u32,
    /// Bank resource stock
    pub bank: ResourceHand,
    /// Development cards left in the bank
    pub dev_card_bank: DevCardHand,
    /// Last dice roll
    pub dice_roll: Option<(u8, u8)>,
    pub config: GameConfig,
    pub tracker: GameTracker,
    /// Whether a dev card has been played this turn
    dev_card_played: bool,
    /// Dev cards bought this turn (can't be played yet)
    devs_just_purchased: DevCardHand,
    trades_this_turn: u32,
    /// Forward then reverse player order for initial placement
    setup_order: Vec<Colour>,
    setup_index: usize,
    /// Settlement awaiting its initial road
    setup_settlement: Option<Point>,
    /// Players who built within `config.early_build_turns`
    early_builders: BTreeSet<Colour>,
    rng: ChaCha8Rng,
}

impl GameState {
    /// Create a new game on a freshly generated board
    pub fn new(colours: &[Colour], config: GameConfig, seed: u64) -> Result<Self, GameError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let board = Board::generate(&mut rng)?;
        Self::with_board(board, colours, config, rng)
    }

    /// Create a standard 4-player game with default rules
    pub fn new_standard_4player(seed: u64) -> Result<Self, GameError> {
        Self::new(&Colour::ALL, GameConfig::default(), seed)
    }

    /// Create a game on a provided board
    pub fn with_board(
        board: Board,
        colours: &[Colour],
        config: GameConfig,
        mut rng: ChaCha8Rng,
    ) -> Result<Self, GameError> {
        let unique: BTreeSet<Colour> = colours.iter().copied().collect();
        if !(2..=4).contains(&colours.len()) || unique.len() != colours.len() {
            return Err(GameError::InvalidPlayers(format!(
                "need 2-4 distinct colours, got {colours:?}"
            )));
        }

        let mut player_order = colours.to_vec();
        player_order.shuffle(&mut rng);

        let setup_order: Vec<Colour> = player_order
            .iter()
            .chain(player_order.iter().rev())
            .copied()
            .collect();

        debug!(order = ?player_order, "new game");

        Ok(Self {
            board,
            players: colours.iter().map(|c| (*c, Player::new(*c))).collect(),
            tracker: GameTracker::new(colours),
            player_order,
            current_player: 0,
            phase: GamePhase::InitialPlacement,
            stage: TurnStage::Build,
            turn: 0,
            bank: ResourceHand::bank(),
            dev_card_bank: DevCardHand::standard_bank(),
            dice_roll: None,
            config,
            dev_card_played: false,
            devs_just_purchased: DevCardHand::new(),
            trades_this_turn: 0,
            setup_order,
            setup_index: 0,
            setup_settlement: None,
            early_builders: BTreeSet::new(),
            rng,
        })
    }

    // ==================== Query Methods ====================

    /// The colour whose decision is pending
    pub fn current_colour(&self) -> Colour {
        match self.phase {
            GamePhase::InitialPlacement => self.setup_order[self.setup_index],
            _ => self.player_order[self.current_player],
        }
    }

    /// Get a player by colour
    pub fn player(&self, colour: Colour) -> Option<&Player> {
        self.players.get(&colour)
    }

    fn player_ref(&self, colour: Colour) -> Result<&Player, GameError> {
        self.players
            .get(&colour)
            .ok_or_else(|| GameError::UnknownPlayer(colour.to_string()))
    }

    fn player_mut(&mut self, colour: Colour) -> Result<&mut Player, GameError> {
        self.players
            .get_mut(&colour)
            .ok_or_else(|| GameError::UnknownPlayer(colour.to_string()))
    }

    pub fn victory_points(&self, colour: Colour) -> u32 {
        self.player(colour).map_or(0, Player::victory_points)
    }

    /// Check if the game is finished
    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver { .. })
    }

    /// The winner, if the game finished with one
    pub fn winner(&self) -> Option<Colour> {
        match self.phase {
            GamePhase::GameOver { winner } => winner,
            _ => None,
        }
    }

    /// Whether the pending decision is an initial settlement placement
    pub fn is_initial_settlement_step(&self) -> bool {
        self.phase == GamePhase::InitialPlacement && self.setup_settlement.is_none()
    }

    /// Settlement waiting for its initial road
    pub fn setup_settlement(&self) -> Option<Point> {
        self.setup_settlement
    }

    pub fn trades_this_turn(&self) -> u32 {
        self.trades_this_turn
    }

    pub fn dev_card_played(&self) -> bool {
        self.dev_card_played
    }

    /// Reward from `runner`'s perspective: +1 win (plus the shaping bonus
    /// when enabled and earned), -1 loss, 0 draw or unfinished
    pub fn reward(&self, runner: Colour) -> f64 {
        match self.phase {
            GamePhase::GameOver {
                winner: Some(winner),
            } if winner == runner => {
                let shaped = self.config.reward_shaping && self.early_builders.contains(&runner);
                1.0 + if shaped { SHAPING_BONUS } else { 0.0 }
            }
            GamePhase::GameOver { winner: Some(_) } => -1.0,
            _ => 0.0,
        }
    }

    // ==================== Action Enumeration ====================

    /// Every action the current player may take. Pure: no state changes.
    pub fn legal_actions(&self) -> Vec<Action> {
        let colour = self.current_colour();
        let Some(player) = self.player(colour) else {
            return Vec::new();
        };

        match self.phase {
            GamePhase::GameOver { .. } => Vec::new(),

            GamePhase::InitialPlacement => match self.setup_settlement {
                None => self
                    .board
                    .settlement_spots(player, true)
                    .into_iter()
                    .map(Action::BuildSettlement)
                    .collect(),
                Some(point) => self
                    .board
                    .setup_road_spots(&point)
                    .into_iter()
                    .map(Action::BuildRoad)
                    .collect(),
            },

            GamePhase::Main => match self.stage {
                TurnStage::MoveRobber => self
                    .board
                    .robber_targets(colour, &self.players)
                    .into_iter()
                    .map(|(hex, victim)| Action::MoveRobberAndRob { hex, victim })
                    .collect(),
                TurnStage::RoadBuilding { .. } => self
                    .board
                    .road_spots(player)
                    .into_iter()
                    .map(Action::BuildRoad)
                    .collect(),
                TurnStage::Build => self.build_stage_actions(player),
            },
        }
    }

    fn build_stage_actions(&self, player: &Player) -> Vec<Action> {
        let mut actions = vec![Action::EndTurn];

        actions.extend(self.bank_trades(player));

        if self.trades_this_turn < self.config.player_trade_limit {
            for (give, held) in player.resources.iter() {
                if held == 0 {
                    continue;
                }
                for receive in Resource::ALL.into_iter().filter(|r| *r != give) {
                    actions.push(Action::TradeWithPlayer { give, receive });
                }
            }
        }

        if player.can_afford_road() {
            actions.extend(
                self.board
                    .road_spots(player)
                    .into_iter()
                    .map(Action::BuildRoad),
            );
        }
        if player.can_afford_settlement() {
            actions.extend(
                self.board
                    .settlement_spots(player, false)
                    .into_iter()
                    .map(Action::BuildSettlement),
            );
        }
        if player.can_afford_city() {
            actions.extend(
                self.board
                    .city_spots(player)
                    .into_iter()
                    .map(Action::BuildCity),
            );
        }
        if player.can_afford_dev_card() && !self.dev_card_bank.is_empty() {
            actions.push(Action::BuyDevCard);
        }

        for card in self.playable_dev_cards(player) {
            match card {
                DevCard::Knight => actions.push(Action::PlayKnight),
                DevCard::RoadBuilding if player.roads_left >= 2 => {
                    actions.push(Action::PlayRoadBuilding)
                }
                DevCard::YearOfPlenty if !self.bank.is_empty() => {
                    actions.extend(
                        self.year_of_plenty_combinations()
                            .into_iter()
                            .map(|(a, b)| Action::PlayYearOfPlenty(a, b)),
                    );
                }
                DevCard::Monopoly => {
                    actions.extend(Resource::ALL.into_iter().map(Action::PlayMonopoly));
                }
                _ => {}
            }
        }

        actions
    }

    /// Bank trades at the player's port-adjusted rate, for resources the
    /// bank still holds
    fn bank_trades(&self, player: &Player) -> Vec<Action> {
        let mut trades = Vec::new();

        for (give, held) in player.resources.iter() {
            let rate = player.trade_rate(give);
            if held < rate {
                continue;
            }
            for receive in Resource::ALL {
                if receive != give && self.bank.get(receive) > 0 {
                    trades.push(Action::TradeWithBank {
                        give,
                        amount: rate,
                        receive,
                    });
                }
            }
        }

        trades
    }

    /// Single picks and unordered pairs the bank can cover
    fn year_of_plenty_combinations(&self) -> Vec<(Resource, Option<Resource>)> {
        let available: Vec<Resource> = Resource::ALL
            .into_iter()
            .filter(|r| self.bank.get(*r) > 0)
            .collect();

        let mut combos = Vec::new();
        for (i, first) in available.iter().enumerate() {
            combos.push((*first, None));
            for second in &available[i..] {
                if second == first && self.bank.get(*first) < 2 {
                    continue;
                }
                combos.push((*first, Some(*second)));
            }
        }
        combos
    }

    /// Dev cards the player may play now: one per turn, none bought this turn
    fn playable_dev_cards(&self, player: &Player) -> Vec<DevCard> {
        if self.dev_card_played {
            return Vec::new();
        }

        DevCard::ALL
            .into_iter()
            .filter(|card| card.is_playable())
            .filter(|card| {
                player.dev_cards.get(*card) > self.devs_just_purchased.get(*card)
            })
            .collect()
    }

    // ==================== Action Application ====================

    /// Apply an action for `colour`. Actions outside `legal_actions()` are
    /// contract violations and return an error without changing state.
    pub fn step(&mut self, colour: Colour, action: Action) -> Result<Vec<GameEvent>, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        if colour != self.current_colour() {
            return Err(GameError::NotYourTurn);
        }
        trace!(%colour, ?action, turn = self.turn, "step");

        let mut events = match self.phase {
            GamePhase::InitialPlacement => self.step_setup(colour, action)?,
            GamePhase::Main => match self.stage {
                TurnStage::Build => self.step_build(colour, action)?,
                TurnStage::MoveRobber => match action {
                    Action::MoveRobberAndRob { hex, victim } => {
                        self.move_robber_and_rob(colour, hex, victim)?
                    }
                    _ => return Err(GameError::InvalidPhase),
                },
                TurnStage::RoadBuilding { roads_remaining } => match action {
                    Action::BuildRoad(edge) => self.build_free_road(colour, edge, roads_remaining)?,
                    _ => return Err(GameError::InvalidPhase),
                },
            },
            GamePhase::GameOver { .. } => return Err(GameError::GameOver),
        };

        if !self.is_over() {
            events.extend(self.check_win_condition());
        }
        Ok(events)
    }

    fn step_setup(&mut self, colour: Colour, action: Action) -> Result<Vec<GameEvent>, GameError> {
        match (action, self.setup_settlement) {
            // ==================== Setup Settlement ====================
            (Action::BuildSettlement(point), None) => {
                let mut events = self.board.build_settlement(&mut self.players, colour, point)?;
                if self.setup_index >= self.player_order.len() {
                    let demand = self.board.demand_for_settlement(&point);
                    events.extend(self.distribute(demand));
                }
                self.setup_settlement = Some(point);
                Ok(events)
            }

            // ==================== Setup Road ====================
            (Action::BuildRoad(edge), Some(settlement)) => {
                if !self.board.setup_road_spots(&settlement).contains(&edge) {
                    return Err(GameError::InvalidLocation);
                }
                let mut events = self.board.build_road(&mut self.players, colour, edge)?;
                self.setup_settlement = None;
                self.setup_index += 1;

                if self.setup_index == self.setup_order.len() {
                    debug!("initial placement complete");
                    self.phase = GamePhase::Main;
                    self.current_player = 0;
                    self.turn = 1;
                    events.extend(self.start_turn());
                }
                Ok(events)
            }

            _ => Err(GameError::InvalidPhase),
        }
    }

    fn step_build(&mut self, colour: Colour, action: Action) -> Result<Vec<GameEvent>, GameError> {
        match action {
            // ==================== Turn Management ====================
            Action::EndTurn => Ok(self.end_turn()),

            // ==================== Building ====================
            Action::BuildRoad(edge) => {
                let player = self.player_ref(colour)?;
                if !player.can_afford_road() {
                    return Err(GameError::CannotAfford);
                }
                if !self.board.road_spots(player).contains(&edge) {
                    return Err(GameError::InvalidLocation);
                }
                self.pay(colour, &costs::road())?;
                self.board.build_road(&mut self.players, colour, edge)
            }

            Action::BuildSettlement(point) => {
                let player = self.player_ref(colour)?;
                if !player.can_afford_settlement() {
                    return Err(GameError::CannotAfford);
                }
                if !self.board.settlement_spots(player, false).contains(&point) {
                    return Err(GameError::InvalidLocation);
                }
                self.pay(colour, &costs::settlement())?;
                self.record_building(colour);
                self.board.build_settlement(&mut self.players, colour, point)
            }

            Action::BuildCity(point) => {
                let player = self.player_ref(colour)?;
                if !player.can_afford_city() {
                    return Err(GameError::CannotAfford);
                }
                if !self.board.city_spots(player).contains(&point) {
                    return Err(GameError::InvalidLocation);
                }
                self.pay(colour, &costs::city())?;
                self.record_building(colour);
                self.board.build_city(&mut self.players, colour, point)
            }

            // ==================== Development Cards ====================
            Action::BuyDevCard => self.buy_dev_card(colour),

            Action::PlayKnight => {
                self.take_dev_card(colour, DevCard::Knight)?;
                let player = self.player_mut(colour)?;
                player.knights_played += 1;
                self.stage = TurnStage::MoveRobber;

                let mut events = vec![GameEvent::KnightPlayed { player: colour }];
                events.extend(self.update_largest_army(colour));
                Ok(events)
            }

            Action::PlayRoadBuilding => {
                if self.player_ref(colour)?.roads_left < 2 {
                    return Err(GameError::NoPiecesRemaining);
                }
                self.take_dev_card(colour, DevCard::RoadBuilding)?;
                if !self.board.road_spots(self.player_ref(colour)?).is_empty() {
                    self.stage = TurnStage::RoadBuilding { roads_remaining: 2 };
                }
                Ok(vec![GameEvent::RoadBuildingPlayed { player: colour }])
            }

            Action::PlayMonopoly(resource) => {
                self.take_dev_card(colour, DevCard::Monopoly)?;
                let mut total_stolen = 0;
                for (other, player) in self.players.iter_mut() {
                    if *other != colour {
                        total_stolen += player.resources.get(resource);
                        player.resources.set(resource, 0);
                    }
                }
                self.player_mut(colour)?
                    .resources
                    .add(resource, total_stolen);
                Ok(vec![GameEvent::MonopolyPlayed {
                    player: colour,
                    resource,
                    total_stolen,
                }])
            }

            Action::PlayYearOfPlenty(first, second) => {
                let gains: Vec<Resource> = std::iter::once(first).chain(second).collect();
                for resource in &gains {
                    let needed = gains.iter().filter(|r| *r == resource).count() as u32;
                    if self.bank.get(*resource) < needed {
                        return Err(GameError::BankEmpty(resource.to_string()));
                    }
                }
                self.take_dev_card(colour, DevCard::YearOfPlenty)?;
                for resource in &gains {
                    self.bank.subtract(&ResourceHand::single(*resource, 1));
                    self.player_mut(colour)?.resources.add(*resource, 1);
                }
                Ok(vec![GameEvent::YearOfPlentyPlayed {
                    player: colour,
                    resources: gains,
                }])
            }

            // ==================== Trading ====================
            Action::TradeWithBank {
                give,
                amount,
                receive,
            } => self.trade_with_bank(colour, give, amount, receive),

            Action::TradeWithPlayer { give, receive } => {
                self.trade_with_players(colour, give, receive)
            }

            Action::MoveRobberAndRob { .. } => Err(GameError::InvalidPhase),
        }
    }

    // ==================== Turn Flow ====================

    fn end_turn(&mut self) -> Vec<GameEvent> {
        let player = self.current_colour();
        self.current_player = (self.current_player + 1) % self.player_order.len();
        self.turn += 1;
        self.devs_just_purchased = DevCardHand::new();
        self.dev_card_played = false;
        self.trades_this_turn = 0;
        self.stage = TurnStage::Build;

        let mut events = vec![GameEvent::TurnEnded {
            player,
            next_player: self.current_colour(),
        }];
        events.extend(self.start_turn());
        events
    }

    /// Roll for the new current player, or end the game at the turn limit
    fn start_turn(&mut self) -> Vec<GameEvent> {
        if self.turn > self.config.turn_limit {
            debug!(turn = self.turn, "turn limit reached");
            return self.finish(None);
        }
        self.roll_dice()
    }

    fn roll_dice(&mut self) -> Vec<GameEvent> {
        let roll: (u8, u8) = (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6));
        let total = roll.0 + roll.1;
        self.dice_roll = Some(roll);

        let mut events = vec![GameEvent::DiceRolled {
            player: self.current_colour(),
            roll,
            total,
        }];

        if total == 7 {
            events.extend(self.discard_half());
            self.stage = TurnStage::MoveRobber;
        } else {
            let demand = self.board.demand_for_roll(total);
            events.extend(self.distribute(demand));
        }
        events
    }

    /// Every player at the hand limit discards half, rounded down, at random
    fn discard_half(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();

        for colour in &self.player_order {
            let Some(player) = self.players.get_mut(colour) else {
                continue;
            };
            let held = player.resources.total();
            if held < DISCARD_LIMIT {
                continue;
            }

            let mut discarded = ResourceHand::new();
            for _ in 0..held / 2 {
                if let Some(resource) = player.resources.remove_random(&mut self.rng) {
                    discarded.add(resource, 1);
                }
            }
            self.bank.add_hand(&discarded);
            events.push(GameEvent::CardsDiscarded {
                player: *colour,
                cards: discarded,
            });
        }

        events
    }

    /// Pay out owed resources. A resource the bank cannot cover in full is
    /// not paid to anyone.
    fn distribute(&mut self, demand: Demand) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut distributions = Vec::new();

        for (resource, owed) in demand {
            let demanded: u32 = owed.values().sum();
            let available = self.bank.get(resource);
            if demanded > available {
                debug!(%resource, demanded, available, "not enough in bank to distribute");
                events.push(GameEvent::DistributionSkipped {
                    resource,
                    demanded,
                    available,
                });
                continue;
            }

            for (colour, amount) in owed {
                let Some(player) = self.players.get_mut(&colour) else {
                    continue;
                };
                self.bank.subtract(&ResourceHand::single(resource, amount));
                player.resources.add(resource, amount);
                *self.tracker.resources_collected.entry(colour).or_default() += amount;
                distributions.push((colour, resource, amount));
            }
        }

        if !distributions.is_empty() {
            events.insert(0, GameEvent::ResourcesDistributed { distributions });
        }
        events
    }

    // ==================== Action Helpers ====================

    /// Move a cost from the player's hand to the bank
    fn pay(&mut self, colour: Colour, cost: &ResourceHand) -> Result<(), GameError> {
        let player = self.player_mut(colour)?;
        if !player.resources.try_subtract(cost) {
            return Err(GameError::CannotAfford);
        }
        self.bank.add_hand(cost);
        Ok(())
    }

    fn record_building(&mut self, colour: Colour) {
        self.tracker.first_building_turn.get_or_insert(self.turn);
        if self.turn <= self.config.early_build_turns {
            self.early_builders.insert(colour);
        }
    }

    fn build_free_road(
        &mut self,
        colour: Colour,
        edge: EdgeId,
        roads_remaining: u8,
    ) -> Result<Vec<GameEvent>, GameError> {
        if !self.board.road_spots(self.player_ref(colour)?).contains(&edge) {
            return Err(GameError::InvalidLocation);
        }
        let events = self.board.build_road(&mut self.players, colour, edge)?;

        let player = self.player_ref(colour)?;
        let remaining = roads_remaining.saturating_sub(1);
        let next = if remaining == 0
            || player.roads_left == 0
            || self.board.road_spots(player).is_empty()
        {
            TurnStage::Build
        } else {
            TurnStage::RoadBuilding {
                roads_remaining: remaining,
            }
        };
        self.stage = next;
        Ok(events)
    }

    /// Draw a card uniformly over the kinds still in the bank
    fn buy_dev_card(&mut self, colour: Colour) -> Result<Vec<GameEvent>, GameError> {
        if !self.player_ref(colour)?.can_afford_dev_card() {
            return Err(GameError::CannotAfford);
        }
        let Some(card) = self.dev_card_bank.available().choose(&mut self.rng).copied() else {
            debug!(%colour, "no development cards left in the bank");
            return Err(GameError::EmptyDeck);
        };

        self.pay(colour, &costs::development_card())?;
        self.dev_card_bank.remove(card);
        self.player_mut(colour)?.dev_cards.add(card);
        if card != DevCard::VictoryPoint {
            self.devs_just_purchased.add(card);
        }
        *self.tracker.dev_cards_purchased.entry(colour).or_default() += 1;

        Ok(vec![GameEvent::DevCardPurchased { player: colour }])
    }

    fn take_dev_card(&mut self, colour: Colour, card: DevCard) -> Result<(), GameError> {
        if self.dev_card_played {
            return Err(GameError::DevCardAlreadyPlayed);
        }
        if !self.playable_dev_cards(self.player_ref(colour)?).contains(&card) {
            return Err(GameError::NoSuchCard);
        }
        self.player_mut(colour)?.dev_cards.remove(card);
        self.dev_card_played = true;
        Ok(())
    }

    fn move_robber_and_rob(
        &mut self,
        colour: Colour,
        hex: HexCoord,
        victim: Option<Colour>,
    ) -> Result<Vec<GameEvent>, GameError> {
        if !self
            .board
            .robber_targets(colour, &self.players)
            .contains(&(hex, victim))
        {
            return Err(GameError::InvalidRobberMove);
        }

        let from = self.board.move_robber(hex)?;
        self.stage = TurnStage::Build;
        let mut events = vec![GameEvent::RobberMoved {
            player: colour,
            from,
            to: hex,
        }];

        if let Some(victim) = victim {
            let stolen = self
                .players
                .get_mut(&victim)
                .ok_or_else(|| GameError::UnknownPlayer(victim.to_string()))?
                .resources
                .remove_random(&mut self.rng);
            if let Some(resource) = stolen {
                self.player_mut(colour)?.resources.add(resource, 1);
                events.push(GameEvent::ResourceStolen {
                    thief: colour,
                    victim,
                    resource,
                });
            }
        }

        Ok(events)
    }

    fn trade_with_bank(
        &mut self,
        colour: Colour,
        give: Resource,
        amount: u32,
        receive: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        let player = self.player_ref(colour)?;
        if give == receive || amount != player.trade_rate(give) {
            return Err(GameError::InvalidTrade);
        }
        if player.resources.get(give) < amount {
            return Err(GameError::CannotAfford);
        }
        if self.bank.get(receive) == 0 {
            return Err(GameError::BankEmpty(receive.to_string()));
        }

        self.pay(colour, &ResourceHand::single(give, amount))?;
        self.bank.subtract(&ResourceHand::single(receive, 1));
        self.player_mut(colour)?.resources.add(receive, 1);

        Ok(vec![GameEvent::BankTradeCompleted {
            player: colour,
            gave: give,
            gave_count: amount,
            received: receive,
        }])
    }

    /// Offer one `give` for one `receive`. Each opponent holding `receive`
    /// accepts at random and the proposer picks among acceptors. The attempt
    /// counts against the per-turn limit even if nobody accepts.
    ///
    /// Agents are not consulted mid-step: both the accept/decline answers
    /// and the proposer's pick are drawn from the game RNG in their place.
    fn trade_with_players(
        &mut self,
        colour: Colour,
        give: Resource,
        receive: Resource,
    ) -> Result<Vec<GameEvent>, GameError> {
        if give == receive || self.trades_this_turn >= self.config.player_trade_limit {
            return Err(GameError::InvalidTrade);
        }
        if self.player_ref(colour)?.resources.get(give) == 0 {
            return Err(GameError::CannotAfford);
        }
        self.trades_this_turn += 1;

        let mut acceptors = Vec::new();
        for other in &self.player_order {
            let holds = self
                .players
                .get(other)
                .is_some_and(|p| p.resources.get(receive) > 0);
            if *other != colour && holds && self.rng.gen_bool(TRADE_ACCEPT_PROBABILITY) {
                acceptors.push(*other);
            }
        }

        let Some(acceptor) = acceptors.choose(&mut self.rng).copied() else {
            debug!(%colour, %give, %receive, "trade offer declined by all players");
            return Ok(vec![GameEvent::TradeDeclined {
                proposer: colour,
                give,
                receive,
            }]);
        };

        let other = self.player_mut(acceptor)?;
        other.resources.subtract(&ResourceHand::single(receive, 1));
        other.resources.add(give, 1);
        let player = self.player_mut(colour)?;
        player.resources.subtract(&ResourceHand::single(give, 1));
        player.resources.add(receive, 1);

        Ok(vec![GameEvent::PlayerTradeCompleted {
            proposer: colour,
            acceptor,
            gave: give,
            received: receive,
        }])
    }

    // ==================== Scoring ====================

    /// Transfer Largest Army to `colour` if it now beats the holder
    fn update_largest_army(&mut self, colour: Colour) -> Option<GameEvent> {
        let knights = self.players.get(&colour)?.knights_played;
        if knights < LARGEST_ARMY_MIN {
            return None;
        }

        let holder = self
            .players
            .values()
            .find(|p| p.has_largest_army)
            .map(|p| (p.colour, p.knights_played));

        match holder {
            Some((current, _)) if current == colour => None,
            Some((_, held)) if knights <= held => None,
            _ => {
                let previous = holder.map(|(c, _)| c);
                if let Some(prev) = previous.and_then(|c| self.players.get_mut(&c)) {
                    prev.has_largest_army = false;
                }
                self.players.get_mut(&colour)?.has_largest_army = true;
                Some(GameEvent::LargestArmyChanged {
                    previous,
                    current: colour,
                    knights,
                })
            }
        }
    }

    fn check_win_condition(&mut self) -> Vec<GameEvent> {
        let winner = self
            .player_order
            .iter()
            .copied()
            .find(|c| self.victory_points(*c) >= self.config.victory_points_to_win);

        match winner {
            Some(winner) => self.finish(Some(winner)),
            None => Vec::new(),
        }
    }

    fn finish(&mut self, winner: Option<Colour>) -> Vec<GameEvent> {
        self.phase = GamePhase::GameOver { winner };
        self.tracker.winner = winner;
        self.tracker.game_length = self.turn.min(self.config.turn_limit);

        for (colour, player) in &self.players {
            self.tracker
                .settlements_built
                .insert(*colour, player.owned_vertices.len() as u32);
            self.tracker
                .cities_built
                .insert(*colour, player.cities_built());
            self.tracker
                .victory_points
                .insert(*colour, player.victory_points());
        }

        let victory_points = winner.map_or(0, |w| self.victory_points(w));
        debug!(?winner, turn = self.turn, victory_points, "game over");
        vec![GameEvent::GameOver {
            winner,
            victory_points,
        }]
    }

    // ==================== Running Games ====================

    /// Run the game to completion, asking each colour's agent for actions
    pub fn play(
        &mut self,
        agents: &mut BTreeMap<Colour, Box<dyn Agent>>,
    ) -> Result<GameTracker, GameError> {
        while !self.is_over() {
            let colour = self.current_colour();
            let legal = self.legal_actions();
            let agent = agents
                .get_mut(&colour)
                .ok_or_else(|| GameError::UnknownPlayer(colour.to_string()))?;
            let action = agent
                .choose_action(&legal, Some(&*self))
                .ok_or_else(|| GameError::NoActionChosen(colour.to_string()))?;

            self.step(colour, action)?;
            self.tracker.ticks += 1;
        }

        Ok(self.tracker.clone())
    }

    // ==================== Snapshots ====================

    /// Serialize the full state, RNG included
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a state produced by `to_json`
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use pretty_assertions::assert_eq;

    fn new_game(seed: u64) -> GameState {
        GameState::new_standard_4player(seed).unwrap()
    }

    /// Play initial placement with the first legal action every time
    fn complete_setup(game: &mut GameState) {
        while game.phase == GamePhase::InitialPlacement {
            let colour = game.current_colour();
            let action = game.legal_actions()[0].clone();
            game.step(colour, action).unwrap();
        }
    }

    /// A game in the main phase, ready for build actions
    fn main_phase_game(seed: u64) -> GameState {
        let mut game = new_game(seed);
        complete_setup(&mut game);
        if game.stage == TurnStage::MoveRobber {
            let colour = game.current_colour();
            let action = game.legal_actions()[0].clone();
            game.step(colour, action).unwrap();
        }
        assert_eq!(game.stage, TurnStage::Build);
        game
    }

    #[test]
    fn test_new_game_starts_in_initial_placement() {
        let game = new_game(1);
        assert_eq!(game.phase, GamePhase::InitialPlacement);
        assert_eq!(game.turn, 0);
        assert_eq!(game.bank, ResourceHand::bank());
        assert_eq!(game.dev_card_bank.total(), 25);
        assert!(game.is_initial_settlement_step());
    }

    #[test]
    fn test_rejects_bad_player_lists() {
        assert!(matches!(
            GameState::new(&[Colour::Red], GameConfig::default(), 1),
            Err(GameError::InvalidPlayers(_))
        ));
        assert!(matches!(
            GameState::new(&[Colour::Red, Colour::Red], GameConfig::default(), 1),
            Err(GameError::InvalidPlayers(_))
        ));
    }

    #[test]
    fn test_setup_valid_actions() {
        let game = new_game(2);
        let actions = game.legal_actions();

        assert_eq!(actions.len(), 54);
        assert!(actions
            .iter()
            .all(|a| a.kind() == ActionKind::BuildSettlement));
    }

    #[test]
    fn test_setup_road_follows_settlement() {
        let mut game = new_game(3);
        let colour = game.current_colour();
        let Action::BuildSettlement(point) = game.legal_actions()[0] else {
            panic!("expected a settlement action");
        };
        game.step(colour, Action::BuildSettlement(point)).unwrap();

        // Same player places the road, touching the new settlement
        assert_eq!(game.current_colour(), colour);
        let actions = game.legal_actions();
        assert!(!actions.is_empty());
        for action in actions {
            let Action::BuildRoad(edge) = action else {
                panic!("expected a road action");
            };
            assert!(game
                .board
                .map()
                .edge(edge)
                .unwrap()
                .vertices
                .contains(&point));
        }
    }

    #[test]
    fn test_setup_order_forward_then_reverse() {
        let mut game = new_game(4);
        let order = game.player_order.clone();
        let mut seen = Vec::new();

        while game.phase == GamePhase::InitialPlacement {
            let colour = game.current_colour();
            if game.is_initial_settlement_step() {
                seen.push(colour);
            }
            let action = game.legal_actions()[0].clone();
            game.step(colour, action).unwrap();
        }

        let expected: Vec<Colour> = order.iter().chain(order.iter().rev()).copied().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_setup_completes_into_main_phase() {
        let mut game = new_game(5);
        complete_setup(&mut game);

        assert_eq!(game.phase, GamePhase::Main);
        assert_eq!(game.turn, 1);
        assert_eq!(game.current_colour(), game.player_order[0]);
        assert!(game.dice_roll.is_some());

        for player in game.players.values() {
            assert_eq!(player.owned_vertices.len(), 2);
            assert_eq!(player.owned_edges.len(), 2);
            assert_eq!(player.victory_points(), 2);
        }

        // Second settlements paid out, and the ledger balances
        let held: u32 = game.players.values().map(|p| p.resources.total()).sum();
        assert!(held > 0);
        assert_eq!(held + game.bank.total(), 5 * 19);
    }

    #[test]
    fn test_wrong_player_is_rejected() {
        let mut game = new_game(6);
        let other = game
            .player_order
            .iter()
            .copied()
            .find(|c| *c != game.current_colour())
            .unwrap();
        let action = game.legal_actions()[0].clone();
        assert_eq!(game.step(other, action), Err(GameError::NotYourTurn));
    }

    #[test]
    fn test_wrong_phase_is_rejected() {
        let mut game = new_game(7);
        let colour = game.current_colour();
        assert_eq!(game.step(colour, Action::EndTurn), Err(GameError::InvalidPhase));
    }

    #[test]
    fn test_end_turn_advances_rotation() {
        let mut game = main_phase_game(8);
        let first = game.current_colour();
        let events = game.step(first, Action::EndTurn).unwrap();

        assert_eq!(game.turn, 2);
        assert_eq!(game.current_colour(), game.player_order[1]);
        assert!(events.contains(&GameEvent::TurnEnded {
            player: first,
            next_player: game.player_order[1]
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::DiceRolled { .. })));
    }

    #[test]
    fn test_bank_trade_moves_exact_amounts() {
        let mut game = main_phase_game(9);
        let colour = game.current_colour();
        let player = game.players.get_mut(&colour).unwrap();
        player.resources = ResourceHand::with_amounts(4, 0, 0, 0, 0);
        player.trading_cost.insert(Resource::Ore, 4);
        game.bank = ResourceHand::bank();

        let trade = Action::TradeWithBank {
            give: Resource::Ore,
            amount: 4,
            receive: Resource::Wood,
        };
        assert!(game.legal_actions().contains(&trade));
        game.step(colour, trade).unwrap();

        assert_eq!(
            game.players[&colour].resources,
            ResourceHand::single(Resource::Wood, 1)
        );
        assert_eq!(game.bank.ore, 23);
        assert_eq!(game.bank.wood, 18);
    }

    #[test]
    fn test_bank_trade_requires_enough_cards() {
        let mut game = main_phase_game(10);
        let colour = game.current_colour();
        let player = game.players.get_mut(&colour).unwrap();
        player.resources = ResourceHand::with_amounts(3, 0, 0, 0, 0);
        player.trading_cost.insert(Resource::Ore, 4);
        let bank_before = game.bank.clone();

        let trade = Action::TradeWithBank {
            give: Resource::Ore,
            amount: 4,
            receive: Resource::Wood,
        };
        assert!(!game.legal_actions().contains(&trade));
        assert_eq!(game.step(colour, trade), Err(GameError::CannotAfford));
        assert_eq!(game.players[&colour].resources.ore, 3);
        assert_eq!(game.bank, bank_before);
    }

    #[test]
    fn test_distribution_credits_and_debits() {
        let mut game = main_phase_game(11);
        let colour = game.player_order[0];
        let before_player = game.players[&colour].resources.clone();
        let before_bank = game.bank.clone();

        let mut demand = Demand::new();
        demand
            .entry(Resource::Sheep)
            .or_default()
            .insert(colour, 2);
        game.distribute(demand);

        assert_eq!(
            game.players[&colour].resources.sheep,
            before_player.sheep + 2
        );
        assert_eq!(game.bank.sheep, before_bank.sheep - 2);
    }

    #[test]
    fn test_distribution_shortfall_pays_nobody() {
        let mut game = main_phase_game(12);
        let (a, b) = (game.player_order[0], game.player_order[1]);
        game.bank.set(Resource::Brick, 2);
        let before: Vec<ResourceHand> = game.players.values().map(|p| p.resources.clone()).collect();

        let mut demand = Demand::new();
        let owed = demand.entry(Resource::Brick).or_default();
        owed.insert(a, 2);
        owed.insert(b, 1);
        let events = game.distribute(demand);

        assert_eq!(
            events,
            vec![GameEvent::DistributionSkipped {
                resource: Resource::Brick,
                demanded: 3,
                available: 2
            }]
        );
        assert_eq!(game.bank.brick, 2);
        let after: Vec<ResourceHand> = game.players.values().map(|p| p.resources.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_discard_half_over_limit() {
        let mut game = main_phase_game(13);
        let (big, small) = (game.player_order[0], game.player_order[1]);
        for player in game.players.values_mut() {
            player.resources = ResourceHand::new();
        }
        game.players.get_mut(&big).unwrap().resources = ResourceHand::with_amounts(2, 2, 2, 2, 1);
        game.players.get_mut(&small).unwrap().resources = ResourceHand::with_amounts(2, 2, 1, 1, 0);
        let bank_before = game.bank.total();

        let events = game.discard_half();

        assert_eq!(events.len(), 1);
        assert_eq!(game.players[&big].resources.total(), 5);
        assert_eq!(game.players[&small].resources.total(), 6);
        assert_eq!(game.bank.total(), bank_before + 4);
    }

    #[test]
    fn test_discard_half_at_seven_cards() {
        let mut game = main_phase_game(13);
        let colour = game.player_order[0];
        for player in game.players.values_mut() {
            player.resources = ResourceHand::new();
        }
        game.players.get_mut(&colour).unwrap().resources = ResourceHand::with_amounts(2, 2, 2, 1, 0);
        let bank_before = game.bank.total();

        let events = game.discard_half();

        assert_eq!(events.len(), 1);
        match &events[0] {
            GameEvent::CardsDiscarded { player, cards } => {
                assert_eq!(*player, colour);
                assert_eq!(cards.total(), 3);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(game.players[&colour].resources.total(), 4);
        assert_eq!(game.bank.total(), bank_before + 3);
    }

    #[test]
    fn test_settlement_spot_disappears_after_build() {
        let mut game = main_phase_game(14);
        let colour = game.current_colour();
        game.players.get_mut(&colour).unwrap().resources = ResourceHand::with_amounts(0, 5, 12, 12, 5);

        // Extend the road network until a settlement spot opens up
        for _ in 0..11 {
            if game
                .legal_actions()
                .iter()
                .any(|a| a.kind() == ActionKind::BuildSettlement)
            {
                break;
            }
            let road = game
                .legal_actions()
                .into_iter()
                .find(|a| a.kind() == ActionKind::BuildRoad)
                .unwrap();
            game.step(colour, road).unwrap();
        }

        let Some(Action::BuildSettlement(point)) = game
            .legal_actions()
            .into_iter()
            .find(|a| a.kind() == ActionKind::BuildSettlement)
        else {
            panic!("no settlement spot reachable");
        };
        game.step(colour, Action::BuildSettlement(point)).unwrap();

        let neighbors = game.board.map().vertex(&point).unwrap().vertex_neighbors.clone();
        for action in game.legal_actions() {
            if let Action::BuildSettlement(p) = action {
                assert_ne!(p, point);
                assert!(!neighbors.contains(&p));
            }
        }
        assert_eq!(game.tracker.first_building_turn, Some(1));
    }

    #[test]
    fn test_dev_card_not_playable_on_purchase_turn() {
        let mut game = main_phase_game(15);
        let colour = game.current_colour();
        game.players.get_mut(&colour).unwrap().resources = ResourceHand::with_amounts(1, 1, 0, 0, 1);
        game.dev_card_bank = DevCardHand {
            monopoly: 1,
            ..DevCardHand::new()
        };

        game.step(colour, Action::BuyDevCard).unwrap();
        assert_eq!(game.players[&colour].dev_cards.monopoly, 1);
        assert!(game.dev_card_bank.is_empty());
        assert!(!game
            .legal_actions()
            .iter()
            .any(|a| a.kind() == ActionKind::PlayMonopoly || a.kind() == ActionKind::BuyDevCard));
        assert_eq!(
            game.step(colour, Action::PlayMonopoly(Resource::Ore)),
            Err(GameError::NoSuchCard)
        );
        assert_eq!(game.tracker.dev_cards_purchased[&colour], 1);
    }

    #[test]
    fn test_knight_grants_largest_army_and_moves_robber() {
        let mut game = main_phase_game(16);
        let colour = game.current_colour();
        let player = game.players.get_mut(&colour).unwrap();
        player.knights_played = 2;
        player.dev_cards.add(DevCard::Knight);

        let events = game.step(colour, Action::PlayKnight).unwrap();
        assert!(events.contains(&GameEvent::LargestArmyChanged {
            previous: None,
            current: colour,
            knights: 3
        }));
        assert!(game.players[&colour].has_largest_army);
        assert_eq!(game.stage, TurnStage::MoveRobber);

        let actions = game.legal_actions();
        assert!(!actions.is_empty());
        assert!(actions
            .iter()
            .all(|a| a.kind() == ActionKind::MoveRobberAndRob));

        let robber = actions[0].clone();
        game.step(colour, robber).unwrap();
        assert_eq!(game.stage, TurnStage::Build);
        assert!(!game
            .legal_actions()
            .iter()
            .any(|a| a.kind() == ActionKind::PlayKnight));
    }

    #[test]
    fn test_largest_army_needs_strictly_more() {
        let mut game = main_phase_game(17);
        let colour = game.current_colour();
        let holder = game.player_order[1];
        let h = game.players.get_mut(&holder).unwrap();
        h.knights_played = 3;
        h.has_largest_army = true;

        let player = game.players.get_mut(&colour).unwrap();
        player.knights_played = 2;
        player.dev_cards.add(DevCard::Knight);
        game.step(colour, Action::PlayKnight).unwrap();

        assert!(game.players[&holder].has_largest_army);
        assert!(!game.players[&colour].has_largest_army);
    }

    #[test]
    fn test_road_building_places_two_free_roads() {
        let mut game = main_phase_game(18);
        let colour = game.current_colour();
        let player = game.players.get_mut(&colour).unwrap();
        player.resources = ResourceHand::new();
        player.dev_cards.add(DevCard::RoadBuilding);
        let roads_before = player.roads_left;

        game.step(colour, Action::PlayRoadBuilding).unwrap();
        assert_eq!(game.stage, TurnStage::RoadBuilding { roads_remaining: 2 });

        for _ in 0..2 {
            let actions = game.legal_actions();
            assert!(actions.iter().all(|a| a.kind() == ActionKind::BuildRoad));
            game.step(colour, actions[0].clone()).unwrap();
        }

        assert_eq!(game.stage, TurnStage::Build);
        assert_eq!(game.players[&colour].roads_left, roads_before - 2);
        assert!(game.players[&colour].resources.is_empty());
    }

    #[test]
    fn test_monopoly_takes_from_everyone() {
        let mut game = main_phase_game(19);
        let colour = game.current_colour();
        for player in game.players.values_mut() {
            player.resources = ResourceHand::single(Resource::Wheat, 2);
        }
        game.players
            .get_mut(&colour)
            .unwrap()
            .dev_cards
            .add(DevCard::Monopoly);

        game.step(colour, Action::PlayMonopoly(Resource::Wheat))
            .unwrap();

        assert_eq!(game.players[&colour].resources.wheat, 8);
        for (other, player) in &game.players {
            if *other != colour {
                assert_eq!(player.resources.wheat, 0);
            }
        }
    }

    #[test]
    fn test_year_of_plenty_bounded_by_bank() {
        let mut game = main_phase_game(20);
        let colour = game.current_colour();
        game.players
            .get_mut(&colour)
            .unwrap()
            .dev_cards
            .add(DevCard::YearOfPlenty);
        game.bank = ResourceHand::single(Resource::Ore, 1);

        let plays: Vec<Action> = game
            .legal_actions()
            .into_iter()
            .filter(|a| a.kind() == ActionKind::PlayYearOfPlenty)
            .collect();
        assert_eq!(plays, vec![Action::PlayYearOfPlenty(Resource::Ore, None)]);

        assert_eq!(
            game.step(
                colour,
                Action::PlayYearOfPlenty(Resource::Ore, Some(Resource::Ore))
            ),
            Err(GameError::BankEmpty("ORE".into()))
        );

        let ore_before = game.players[&colour].resources.ore;
        game.step(colour, plays[0].clone()).unwrap();
        assert_eq!(game.players[&colour].resources.ore, ore_before + 1);
        assert!(game.bank.is_empty());
    }

    #[test]
    fn test_year_of_plenty_combinations() {
        let mut game = main_phase_game(21);
        game.bank = ResourceHand::with_amounts(2, 1, 0, 0, 0);
        let combos = game.year_of_plenty_combinations();

        assert_eq!(
            combos,
            vec![
                (Resource::Ore, None),
                (Resource::Ore, Some(Resource::Ore)),
                (Resource::Ore, Some(Resource::Wheat)),
                (Resource::Wheat, None),
            ]
        );
    }

    #[test]
    fn test_player_trade_consumes_attempt() {
        let mut game = main_phase_game(22);
        let colour = game.current_colour();
        for player in game.players.values_mut() {
            player.resources = ResourceHand::single(Resource::Sheep, 1);
        }
        game.players.get_mut(&colour).unwrap().resources = ResourceHand::single(Resource::Ore, 1);

        let offer = Action::TradeWithPlayer {
            give: Resource::Ore,
            receive: Resource::Sheep,
        };
        assert!(game.legal_actions().contains(&offer));
        let events = game.step(colour, offer.clone()).unwrap();

        assert_eq!(game.trades_this_turn(), 1);
        assert!(!game
            .legal_actions()
            .iter()
            .any(|a| a.kind() == ActionKind::TradeWithPlayer));
        assert_eq!(game.step(colour, offer), Err(GameError::InvalidTrade));

        let total: u32 = game.players.values().map(|p| p.resources.total()).sum();
        assert_eq!(total, game.players.len() as u32);
        match &events[0] {
            GameEvent::PlayerTradeCompleted { acceptor, .. } => {
                assert_eq!(game.players[&colour].resources, ResourceHand::single(Resource::Sheep, 1));
                assert_eq!(game.players[acceptor].resources.ore, 1);
            }
            GameEvent::TradeDeclined { .. } => {
                assert_eq!(game.players[&colour].resources, ResourceHand::single(Resource::Ore, 1));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_turn_limit_ends_in_draw() {
        let config = GameConfig::default().with_turn_limit(2);
        let mut game = GameState::new(&Colour::ALL, config, 23).unwrap();
        complete_setup(&mut game);

        while !game.is_over() {
            let colour = game.current_colour();
            let action = if game.stage == TurnStage::Build {
                Action::EndTurn
            } else {
                game.legal_actions()[0].clone()
            };
            game.step(colour, action).unwrap();
        }

        assert_eq!(game.phase, GamePhase::GameOver { winner: None });
        assert_eq!(game.tracker.game_length, 2);
        assert_eq!(game.reward(Colour::Red), 0.0);
        assert_eq!(game.step(Colour::Red, Action::EndTurn), Err(GameError::GameOver));
    }

    #[test]
    fn test_win_reward_with_shaping() {
        let config = GameConfig::default()
            .with_victory_points(3)
            .with_reward_shaping(true);
        let mut game = GameState::new(&Colour::ALL, config, 24).unwrap();
        complete_setup(&mut game);
        if game.stage == TurnStage::MoveRobber {
            let colour = game.current_colour();
            let action = game.legal_actions()[0].clone();
            game.step(colour, action).unwrap();
        }

        let colour = game.current_colour();
        let point = game.players[&colour].owned_vertices[0];
        game.players.get_mut(&colour).unwrap().resources = ResourceHand::with_amounts(3, 2, 0, 0, 0);
        let events = game.step(colour, Action::BuildCity(point)).unwrap();

        assert_eq!(game.winner(), Some(colour));
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver { .. })));
        assert_eq!(game.reward(colour), 1.5);
        let loser = game.player_order.iter().copied().find(|c| *c != colour).unwrap();
        assert_eq!(game.reward(loser), -1.0);
        assert_eq!(game.tracker.cities_built[&colour], 1);
    }

    #[test]
    fn test_json_round_trip() {
        let mut game = new_game(25);
        complete_setup(&mut game);

        let json = game.to_json().unwrap();
        let restored = GameState::from_json(&json).unwrap();
        assert_eq!(restored.to_json().unwrap(), json);

        // The restored copy continues identically, RNG included
        let mut a = game;
        let mut b = restored;
        for _ in 0..5 {
            let colour = a.current_colour();
            let action = a.legal_actions()[0].clone();
            let ea = a.step(colour, action.clone()).unwrap();
            let eb = b.step(colour, action).unwrap();
            assert_eq!(ea, eb);
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let game = main_phase_game(26);
        let mut copy = game.clone();
        let colour = copy.current_colour();
        copy.players.get_mut(&colour).unwrap().resources.add(Resource::Ore, 5);
        copy.step(colour, Action::EndTurn).unwrap();

        assert_ne!(game.players[&colour].resources, copy.players[&colour].resources);
        assert_eq!(game.turn, 1);
        assert_eq!(copy.turn, 2);
    }
}
