//! Aggregate statistics over many finished games.

use catan_core::{Colour, GameTracker};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Per-player averages for one side of the result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideMeans {
    pub settlements_built: f64,
    pub cities_built: f64,
    pub resources_collected: f64,
    pub dev_cards_purchased: f64,
}

impl SideMeans {
    fn from_samples(samples: &[(u32, u32, u32, u32)]) -> Self {
        Self {
            settlements_built: mean(samples.iter().map(|s| s.0)),
            cities_built: mean(samples.iter().map(|s| s.1)),
            resources_collected: mean(samples.iter().map(|s| s.2)),
            dev_cards_purchased: mean(samples.iter().map(|s| s.3)),
        }
    }
}

/// Batch results. Draws count toward `games` and `draws` only; every other
/// figure is over decided games.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub games: usize,
    pub draws: usize,
    pub wins_by_colour: BTreeMap<Colour, usize>,
    pub mean_game_length: f64,
    pub mean_ticks: f64,
    pub mean_first_building_turn: f64,
    pub winners: SideMeans,
    pub losers: SideMeans,
}

fn mean<I: Iterator<Item = u32>>(values: I) -> f64 {
    let (sum, count) = values.fold((0u64, 0u64), |(s, c), v| (s + u64::from(v), c + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn sample(tracker: &GameTracker, colour: Colour) -> (u32, u32, u32, u32) {
    let get = |m: &BTreeMap<Colour, u32>| m.get(&colour).copied().unwrap_or(0);
    (
        get(&tracker.settlements_built),
        get(&tracker.cities_built),
        get(&tracker.resources_collected),
        get(&tracker.dev_cards_purchased),
    )
}

impl Summary {
    pub fn from_trackers(trackers: &[GameTracker]) -> Self {
        let decided: Vec<(&GameTracker, Colour)> = trackers
            .iter()
            .filter_map(|t| t.winner.map(|w| (t, w)))
            .collect();

        let mut wins_by_colour: BTreeMap<Colour, usize> =
            Colour::ALL.iter().map(|c| (*c, 0)).collect();
        let mut winners = Vec::new();
        let mut losers = Vec::new();

        for (tracker, winner) in &decided {
            *wins_by_colour.entry(*winner).or_default() += 1;
            winners.push(sample(tracker, *winner));
            for colour in tracker.settlements_built.keys().filter(|c| *c != winner) {
                losers.push(sample(tracker, *colour));
            }
        }

        Self {
            games: trackers.len(),
            draws: trackers.len() - decided.len(),
            wins_by_colour,
            mean_game_length: mean(decided.iter().map(|(t, _)| t.game_length)),
            mean_ticks: mean(decided.iter().map(|(t, _)| t.ticks as u32)),
            mean_first_building_turn: mean(
                decided.iter().filter_map(|(t, _)| t.first_building_turn),
            ),
            winners: SideMeans::from_samples(&winners),
            losers: SideMeans::from_samples(&losers),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decided = self.games - self.draws;
        writeln!(f, "--- Summary ({} games, {} draws discarded) ---", self.games, self.draws)?;
        for (colour, wins) in &self.wins_by_colour {
            let pct = if decided > 0 {
                *wins as f64 / decided as f64 * 100.0
            } else {
                0.0
            };
            writeln!(f, "  {:8}: {:>5} wins ({:.1}%)", colour.to_string(), wins, pct)?;
        }
        writeln!(f)?;
        writeln!(f, "  Mean game length:         {:.2}", self.mean_game_length)?;
        writeln!(f, "  Mean ticks:               {:.2}", self.mean_ticks)?;
        writeln!(f, "  Mean first building turn: {:.2}", self.mean_first_building_turn)?;
        writeln!(f)?;
        writeln!(f, "  {:<22} {:>10} {:>10}", "", "Winners", "Losers")?;
        let rows = [
            ("Settlements built", self.winners.settlements_built, self.losers.settlements_built),
            ("Cities built", self.winners.cities_built, self.losers.cities_built),
            ("Resources collected", self.winners.resources_collected, self.losers.resources_collected),
            ("Dev cards purchased", self.winners.dev_cards_purchased, self.losers.dev_cards_purchased),
        ];
        for (label, winners, losers) in rows {
            writeln!(f, "  {label:<22} {winners:>10.2} {losers:>10.2}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tracker(winner: Option<Colour>, length: u32, built: [u32; 4]) -> GameTracker {
        let per_colour = |values: [u32; 4]| -> BTreeMap<Colour, u32> {
            Colour::ALL.iter().copied().zip(values).collect()
        };
        GameTracker {
            winner,
            game_length: length,
            ticks: u64::from(length) * 10,
            first_building_turn: Some(length / 10),
            settlements_built: per_colour(built),
            cities_built: per_colour([0; 4]),
            resources_collected: per_colour([10, 20, 30, 40]),
            dev_cards_purchased: per_colour([1; 4]),
            victory_points: per_colour([0; 4]),
        }
    }

    #[test]
    fn test_draws_are_discarded() {
        let trackers = vec![
            tracker(Some(Colour::Red), 100, [5, 2, 2, 2]),
            tracker(None, 1000, [3, 3, 3, 3]),
            tracker(Some(Colour::Blue), 200, [2, 2, 2, 6]),
        ];
        let summary = Summary::from_trackers(&trackers);

        assert_eq!(summary.games, 3);
        assert_eq!(summary.draws, 1);
        assert_eq!(summary.wins_by_colour[&Colour::Red], 1);
        assert_eq!(summary.wins_by_colour[&Colour::Blue], 1);
        assert_eq!(summary.wins_by_colour[&Colour::White], 0);
        assert_eq!(summary.mean_game_length, 150.0);
        assert_eq!(summary.mean_ticks, 1500.0);
        assert_eq!(summary.mean_first_building_turn, 15.0);
    }

    #[test]
    fn test_winner_and_loser_means() {
        let trackers = vec![tracker(Some(Colour::Red), 100, [5, 2, 2, 2])];
        let summary = Summary::from_trackers(&trackers);

        assert_eq!(summary.winners.settlements_built, 5.0);
        assert_eq!(summary.losers.settlements_built, 2.0);
        assert_eq!(summary.winners.resources_collected, 10.0);
        assert_eq!(summary.losers.resources_collected, 30.0);
    }

    #[test]
    fn test_empty_batch() {
        let summary = Summary::from_trackers(&[]);
        assert_eq!(summary.games, 0);
        assert_eq!(summary.mean_game_length, 0.0);
        assert!(summary.to_string().contains("0 games"));
    }
}
