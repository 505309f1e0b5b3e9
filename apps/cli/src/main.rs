#![deny(warnings)]

//! Headless CLI: load a scenario, play it out with the advisor, report KPIs.

use anyhow::{Context, Result};
use estate_ai::{suggest, AdvisorConfig};
use estate_core::{Difficulty, GameConfig, PropertyId};
use estate_engine::{Command, Session, SessionState, Snapshot};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

const CLASSIC: &str = include_str!("../../../assets/scenarios/classic.yaml");

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    seed: Option<u64>,
    difficulty: Option<Difficulty>,
    turns: Option<u32>,
    json: bool,
    no_advisor: bool,
    /// Trades placed on turn 0 before any advisor move, in order.
    orders: Vec<Command>,
}

fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    let mut it = argv.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--difficulty" => {
                let value = it.next().unwrap_or_default();
                args.difficulty = Some(value.parse()?);
            }
            "--turns" => args.turns = it.next().and_then(|s| s.parse().ok()),
            "--json" => args.json = true,
            "--no-advisor" => args.no_advisor = true,
            "--buy" | "--sell" => {
                let id = it
                    .next()
                    .with_context(|| format!("{arg} needs a property id"))?;
                let id = PropertyId::new(id);
                args.orders.push(if arg == "--buy" {
                    Command::Buy(id)
                } else {
                    Command::Sell(id)
                });
            }
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let text = match &args.scenario {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {path}"))?,
        None => CLASSIC.to_string(),
    };
    let mut cfg = GameConfig::from_yaml_str(&text)?;
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
    if let Some(d) = args.difficulty {
        cfg.starting_cash = d.starting_cash();
    }
    if let Some(turns) = args.turns {
        cfg.max_turns = turns;
    }
    Ok(cfg)
}

/// Apply advisor suggestions until it has nothing more to do this turn.
fn play_turn(session: &mut Session, advisor: &AdvisorConfig) {
    // Every accepted buy consumes a listing, so this bound is never the limiting factor.
    let limit = session.catalog().len() * 2;
    for _ in 0..limit {
        let Some(cmd) = suggest(&session.snapshot(), advisor) else {
            break;
        };
        if let Err(e) = session.execute(cmd.clone()) {
            warn!(?cmd, error = %e, "advisor command rejected");
            break;
        }
        if matches!(cmd, Command::Sell(_)) {
            // Do not rebuy what was just sold on the same turn.
            break;
        }
    }
}

/// Execute the opening orders; a rejected order is reported and skipped.
fn place_orders(session: &mut Session, orders: &[Command]) -> usize {
    let mut filled = 0;
    for cmd in orders {
        match session.execute(cmd.clone()) {
            Ok(outcome) => {
                info!(?outcome, "order filled");
                filled += 1;
            }
            Err(e) => warn!(?cmd, error = %e, "order rejected"),
        }
    }
    filled
}

fn print_summary(session: &Session, snap: &Snapshot) {
    let date = snap
        .date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".into());
    let best = snap
        .best_investment
        .as_ref()
        .and_then(|id| snap.property(id))
        .map(|p| format!("{} ({}%)", p.id, p.cap_rate.unwrap_or_default()))
        .unwrap_or_else(|| "-".into());
    println!(
        "Session | seed: {} | properties: {} | trades: {} | best cap rate: {}",
        session.seed(),
        snap.properties.len(),
        session.ledger().len(),
        best
    );
    println!(
        "KPI | turn: {}/{} | date: {} | state: {:?} | cash: ${} | net worth: ${} | ROI: {:.1}% | holdings: {} | market: {:?}",
        snap.turn,
        snap.max_turns,
        date,
        snap.state,
        snap.cash.round_dp(2),
        snap.net_worth.round_dp(2),
        snap.roi * rust_decimal::Decimal::ONE_HUNDRED,
        snap.holdings.len(),
        snap.temperature
    );
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(?args, git_sha = env!("GIT_SHA"), "starting CLI");

    let cfg = load_config(&args)?;
    let mut session = Session::new(&cfg)?;
    let advisor = AdvisorConfig::default();
    place_orders(&mut session, &args.orders);

    while session.state() == SessionState::Active {
        if !args.no_advisor {
            play_turn(&mut session, &advisor);
        }
        session.advance()?;
    }

    let snap = session.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    } else {
        print_summary(&session, &snap);
    }
    Ok(())
}
