//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions.

use crate::hex::{HexCoord, Point};
use crate::map::{EdgeId, Resource};
use crate::player::{Colour, ResourceHand};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    // ==================== Turn Management ====================
    /// End your turn, the next player rolls
    EndTurn,

    // ==================== Building Actions ====================
    /// Build a road at an edge
    BuildRoad(EdgeId),
    /// Build a settlement at a vertex
    BuildSettlement(Point),
    /// Upgrade a settlement to a city
    BuildCity(Point),
    /// Buy a development card from the bank
    BuyDevCard,

    // ==================== Development Card Actions ====================
    /// Play a knight card (move robber, steal, counts toward largest army)
    PlayKnight,
    /// Play road building card (build 2 free roads)
    PlayRoadBuilding,
    /// Play monopoly (take all of one resource from all players)
    PlayMonopoly(Resource),
    /// Play year of plenty (take one or two resources from the bank)
    PlayYearOfPlenty(Resource, Option<Resource>),

    // ==================== Trading Actions ====================
    /// Trade with the bank (4:1) or harbor (3:1 or 2:1)
    TradeWithBank {
        give: Resource,
        amount: u32,
        receive: Resource,
    },
    /// Offer one card for one card to the other players
    TradeWithPlayer { give: Resource, receive: Resource },

    // ==================== Robber Actions ====================
    /// Move the robber and optionally steal from a player next to it
    MoveRobberAndRob {
        hex: HexCoord,
        victim: Option<Colour>,
    },
}

/// Action kind without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    EndTurn,
    BuildRoad,
    BuildSettlement,
    BuildCity,
    BuyDevCard,
    PlayKnight,
    PlayRoadBuilding,
    PlayMonopoly,
    PlayYearOfPlenty,
    TradeWithBank,
    TradeWithPlayer,
    MoveRobberAndRob,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::EndTurn => ActionKind::EndTurn,
            Action::BuildRoad(_) => ActionKind::BuildRoad,
            Action::BuildSettlement(_) => ActionKind::BuildSettlement,
            Action::BuildCity(_) => ActionKind::BuildCity,
            Action::BuyDevCard => ActionKind::BuyDevCard,
            Action::PlayKnight => ActionKind::PlayKnight,
            Action::PlayRoadBuilding => ActionKind::PlayRoadBuilding,
            Action::PlayMonopoly(_) => ActionKind::PlayMonopoly,
            Action::PlayYearOfPlenty(..) => ActionKind::PlayYearOfPlenty,
            Action::TradeWithBank { .. } => ActionKind::TradeWithBank,
            Action::TradeWithPlayer { .. } => ActionKind::TradeWithPlayer,
            Action::MoveRobberAndRob { .. } => ActionKind::MoveRobberAndRob,
        }
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled {
        player: Colour,
        roll: (u8, u8),
        total: u8,
    },

    /// Resources were distributed after a dice roll or second settlement
    ResourcesDistributed {
        distributions: Vec<(Colour, Resource, u32)>,
    },

    /// The bank could not cover every claim on a resource
    DistributionSkipped {
        resource: Resource,
        demanded: u32,
        available: u32,
    },

    /// Player had to discard cards after a seven
    CardsDiscarded { player: Colour, cards: ResourceHand },

    /// The robber was moved
    RobberMoved {
        player: Colour,
        from: HexCoord,
        to: HexCoord,
    },

    /// A resource was stolen
    ResourceStolen {
        thief: Colour,
        victim: Colour,
        resource: Resource,
    },

    /// A road was built
    RoadBuilt { player: Colour, edge: EdgeId },

    /// A settlement was built
    SettlementBuilt { player: Colour, location: Point },

    /// A settlement was upgraded to a city
    CityBuilt { player: Colour, location: Point },

    /// A development card was purchased
    DevCardPurchased { player: Colour },

    /// A knight was played
    KnightPlayed { player: Colour },

    /// Road building card was played
    RoadBuildingPlayed { player: Colour },

    /// Monopoly card was played
    MonopolyPlayed {
        player: Colour,
        resource: Resource,
        total_stolen: u32,
    },

    /// Year of plenty card was played
    YearOfPlentyPlayed {
        player: Colour,
        resources: Vec<Resource>,
    },

    /// Bank or harbor trade completed
    BankTradeCompleted {
        player: Colour,
        gave: Resource,
        gave_count: u32,
        received: Resource,
    },

    /// A one-for-one trade between players completed
    PlayerTradeCompleted {
        proposer: Colour,
        acceptor: Colour,
        gave: Resource,
        received: Resource,
    },

    /// No opponent accepted a trade offer
    TradeDeclined {
        proposer: Colour,
        give: Resource,
        receive: Resource,
    },

    /// Longest road changed hands
    LongestRoadChanged {
        previous: Option<Colour>,
        current: Colour,
        length: u32,
    },

    /// Longest road bonus set aside with no eligible successor
    LongestRoadLost { player: Colour },

    /// Largest army changed hands
    LargestArmyChanged {
        previous: Option<Colour>,
        current: Colour,
        knights: u32,
    },

    /// Turn ended
    TurnEnded { player: Colour, next_player: Colour },

    /// The game finished, `winner` is None on a draw
    GameOver {
        winner: Option<Colour>,
        victory_points: u32,
    },
}
