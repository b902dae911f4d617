//! Catan batch simulator.

use anyhow::{bail, Context};
use catan_core::{
    make_agent, Agent, AgentKind, Colour, GameConfig, GameEvent, GameState, GameTracker,
    MctsConfig, RolloutPolicy, SearchScope,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod stats;

use stats::Summary;

#[derive(Parser)]
#[command(name = "catan-sim", about = "Catan simulator and agent benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single game and narrate it
    Play {
        #[arg(short, long, env = "CATAN_SEED", default_value_t = 42)]
        seed: u64,
        #[command(flatten)]
        setup: SetupArgs,
    },
    /// Run many games in parallel and report aggregate statistics
    Simulate {
        #[arg(short, long, env = "CATAN_GAMES", default_value_t = 1000)]
        games: u64,
        /// Seed of the first game; game i uses seed + i
        #[arg(short, long, env = "CATAN_SEED", default_value_t = 0)]
        seed: u64,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        setup: SetupArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Random,
    Weighted,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Placement,
    Always,
}

#[derive(Args, Clone)]
struct SetupArgs {
    /// Agents in seat order (Red, White, Orange, Blue): random, weighted or
    /// mcts. A single entry seats that agent everywhere.
    #[arg(
        short,
        long,
        env = "CATAN_AGENTS",
        value_delimiter = ',',
        default_value = "random"
    )]
    agents: Vec<AgentKind>,

    #[arg(long, env = "CATAN_TURN_LIMIT", default_value_t = 1000)]
    turn_limit: u32,

    #[arg(long, env = "CATAN_VICTORY_POINTS", default_value_t = 10)]
    victory_points: u32,

    /// Add the early-building bonus to game rewards
    #[arg(long, env = "CATAN_REWARD_SHAPING")]
    reward_shaping: bool,

    #[arg(long, env = "CATAN_MCTS_ITERATIONS", default_value_t = 1000)]
    iterations: u32,

    #[arg(long, env = "CATAN_MCTS_EXPLORATION", default_value_t = 0.75)]
    exploration: f64,

    /// Search every initial settlement instead of above-median spots
    #[arg(long)]
    no_pruning: bool,

    /// Search without the rollout shaping bonus
    #[arg(long)]
    no_search_shaping: bool,

    #[arg(long, env = "CATAN_MCTS_TREES", default_value_t = 1)]
    ensemble_trees: usize,

    #[arg(long, value_enum, default_value = "weighted")]
    rollout_policy: PolicyArg,

    #[arg(long, value_enum, default_value = "placement")]
    search_scope: ScopeArg,
}

impl SetupArgs {
    fn game_config(&self) -> GameConfig {
        GameConfig::default()
            .with_turn_limit(self.turn_limit)
            .with_victory_points(self.victory_points)
            .with_reward_shaping(self.reward_shaping)
    }

    fn mcts_config(&self) -> MctsConfig {
        MctsConfig::default()
            .with_iterations(self.iterations)
            .with_exploration(self.exploration)
            .with_pruning(!self.no_pruning)
            .with_reward_shaping(!self.no_search_shaping)
            .with_ensemble_trees(self.ensemble_trees)
            .with_rollout_policy(match self.rollout_policy {
                PolicyArg::Random => RolloutPolicy::Random,
                PolicyArg::Weighted => RolloutPolicy::Weighted,
            })
            .with_search_scope(match self.search_scope {
                ScopeArg::Placement => SearchScope::InitialPlacement,
                ScopeArg::Always => SearchScope::Always,
            })
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.agents.len() != 1 && self.agents.len() != Colour::ALL.len() {
            bail!(
                "expected 1 or {} agents, got {}",
                Colour::ALL.len(),
                self.agents.len()
            );
        }
        Ok(())
    }

    fn make_agents(&self, seed: u64) -> BTreeMap<Colour, Box<dyn Agent>> {
        let mcts = self.mcts_config();
        Colour::ALL
            .iter()
            .enumerate()
            .map(|(i, colour)| {
                let kind = self.agents.get(i).or(self.agents.first()).copied();
                let kind = kind.unwrap_or(AgentKind::Random);
                let agent_seed = seed.wrapping_mul(31).wrapping_add(i as u64);
                (*colour, make_agent(kind, *colour, agent_seed, &mcts))
            })
            .collect()
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { seed, setup } => cmd_play(seed, &setup),
        Commands::Simulate {
            games,
            seed,
            json,
            setup,
        } => cmd_simulate(games, seed, json, &setup),
    }
}

fn cmd_play(seed: u64, setup: &SetupArgs) -> anyhow::Result<()> {
    setup.validate()?;
    info!(seed, "starting game");

    let mut game = GameState::new(&Colour::ALL, setup.game_config(), seed)?;
    let mut agents = setup.make_agents(seed);
    info!(order = ?game.player_order, "player order");

    while !game.is_over() {
        let colour = game.current_colour();
        let legal = game.legal_actions();
        let agent = agents
            .get_mut(&colour)
            .with_context(|| format!("no agent seated for {colour}"))?;
        let action = agent
            .choose_action(&legal, Some(&game))
            .with_context(|| format!("{} agent for {colour} chose nothing", agent.name()))?;

        for event in game.step(colour, action)? {
            narrate(&event);
        }
        game.tracker.ticks += 1;
    }

    for colour in &game.player_order {
        info!(%colour, victory_points = game.victory_points(*colour), "final score");
    }
    println!("{}", serde_json::to_string_pretty(&game.tracker)?);
    Ok(())
}

fn narrate(event: &GameEvent) {
    match event {
        GameEvent::DiceRolled { .. } | GameEvent::TurnEnded { .. } => debug!(?event),
        GameEvent::GameOver {
            winner,
            victory_points,
        } => match winner {
            Some(winner) => info!(%winner, victory_points, "game over"),
            None => info!("game over: turn limit reached"),
        },
        _ => info!(?event),
    }
}

fn run_one(seed: u64, setup: &SetupArgs) -> anyhow::Result<GameTracker> {
    let mut game = GameState::new(&Colour::ALL, setup.game_config(), seed)?;
    let mut agents = setup.make_agents(seed);
    game.play(&mut agents)
        .with_context(|| format!("game with seed {seed} failed"))
}

fn cmd_simulate(games: u64, seed: u64, json: bool, setup: &SetupArgs) -> anyhow::Result<()> {
    setup.validate()?;
    info!(
        games,
        threads = rayon::current_num_threads(),
        agents = ?setup.agents,
        "simulating"
    );

    let start = Instant::now();
    let trackers: Vec<GameTracker> = (0..games)
        .into_par_iter()
        .map(|i| run_one(seed.wrapping_add(i), setup))
        .collect::<anyhow::Result<_>>()?;
    info!(elapsed_s = start.elapsed().as_secs_f64(), "simulation complete");

    let summary = Summary::from_trackers(&trackers);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}
