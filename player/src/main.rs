use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use blackjack::{card, Deck, Router, SharedDeck};
use clap::Parser;
use player::{
    AgentConfig, PlayerAgent, ReplyBoundPolicy, ScriptedTable, StepOutcome, TermDisplay,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    /// Name the player sits down with
    #[arg(short, long, default_value = "alice")]
    name: String,

    /// Polling interval of the player's scheduler loop, in milliseconds
    #[arg(short, long, default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Extra cards to draw after the automatic opening draw
    #[arg(long, default_value_t = 0)]
    hits: u32,

    /// Halt reply polling outright once every table has answered
    #[arg(long, default_value_t = false)]
    hard_stop_reply_bound: bool,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    // Get a random seed
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let router = Router::new();
    let deck = SharedDeck::new(Deck::shuffled(&mut rng));

    // The table must be in the directory before the player searches it.
    let table = ScriptedTable::new(&router, "table-1", card!("Q♠"));
    let host = thread::spawn(move || {
        table.seat_one_player(Duration::from_millis(50), Duration::from_secs(120))
    });

    let endpoint = router.endpoint(&args.name);
    let display = TermDisplay::new(&args.name);
    let config = AgentConfig {
        name: args.name.clone(),
        reply_bound_policy: if args.hard_stop_reply_bound {
            ReplyBoundPolicy::HardStop
        } else {
            ReplyBoundPolicy::Advisory
        },
    };
    let (mut agent, handle) = PlayerAgent::new(config, endpoint, deck, Box::new(display));

    // This loop is the player's scheduler: one non-blocking step per tick.
    let poll_interval = Duration::from_millis(args.poll_interval_ms);
    loop {
        match agent.step()? {
            StepOutcome::NoHostFound => return Err(anyhow!("no table available")),
            StepOutcome::TurnStarted => {
                for _ in 0..args.hits {
                    handle.hit();
                }
                handle.stand();
            }
            StepOutcome::TurnReported { .. } => break,
            _ => {}
        }
        thread::sleep(poll_interval);
    }

    let report = host
        .join()
        .map_err(|_| anyhow!("table thread panicked"))??;
    println!("{} reported a total of {}", report.player_name, report.total);

    Ok(())
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
