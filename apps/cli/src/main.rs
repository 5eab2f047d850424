#![deny(warnings)]

//! Terminal front end: play over stdin, or run a headless simulation.
//!
//! Interactive commands, one per line: `tap`, `up`, `buy <upgrade>`,
//! `hire <helper>`, `master <level>`, `prestige`, `tutorial`, `status`,
//! `save`, `help`, `quit`. Events are written to stdout as JSON lines; logs
//! go to stderr.

use anyhow::{Context, Result};
use chrono::Utc;
use crumbs_core::{GameConfig, Millis, PlayerState};
use crumbs_runtime::autoplay::{self, AutoplayConfig};
use crumbs_runtime::{Game, GameEvent, Session};
use persistence::{default_save_dir, FileStore};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    save_dir: Option<PathBuf>,
    seed: Option<u64>,
    simulate: Option<u64>,
    taps_per_second: Option<u32>,
    reset: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--save-dir" => args.save_dir = it.next().map(PathBuf::from),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--simulate" => args.simulate = it.next().and_then(|s| s.parse().ok()),
            "--taps-per-second" => args.taps_per_second = it.next().and_then(|s| s.parse().ok()),
            "--reset" => args.reset = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => GameConfig::default(),
    };
    if args.seed.is_some() {
        cfg.rng_seed = args.seed;
    }
    Ok(cfg)
}

fn now_ms() -> Millis {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn simulate(cfg: GameConfig, seconds: u64, taps_per_second: Option<u32>) {
    let mut auto = AutoplayConfig {
        seconds,
        ..AutoplayConfig::default()
    };
    if let Some(tps) = taps_per_second {
        auto.taps_per_second = tps;
    }
    let mut game = Game::seeded(PlayerState::default(), cfg, 0);
    let s = autoplay::run(&mut game, 0, &auto);
    println!(
        "KPI | seconds: {} | level: {} | money: {} | earned: {} | taps: {} | upgrades: {} ok / {} failed | bought: {} | helpers: {} | mastery: {} | prestiges: {} | tickets: {} | achievements: {}",
        s.seconds,
        s.final_level,
        s.final_money,
        s.total_earned,
        s.taps,
        s.upgrades_succeeded,
        s.upgrades_failed,
        s.upgrades_bought,
        s.helpers_hired,
        s.mastery_stars,
        s.prestiges,
        s.prestige_tickets,
        s.achievements
    );
}

fn report(event: &GameEvent) -> Result<()> {
    match event {
        GameEvent::Saved { at } => debug!(at, "saved"),
        other => println!("{}", serde_json::to_string(other)?),
    }
    Ok(())
}

/// Apply one command line. Returns `false` when the player asked to quit.
fn handle(session: &mut Session<FileStore>, line: &str) -> Result<bool> {
    let now = now_ms();
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(true);
    };
    let arg = words.next();
    let outcome = match (cmd, arg) {
        ("tap", _) => session.tap(now, 0.0, 0.0).map(|_| ()),
        ("up" | "upgrade", _) => session.attempt_upgrade(now).map(|_| ()),
        ("buy", Some(id)) => session.buy_upgrade(id, now).map(|_| ()),
        ("hire", Some(id)) => session.buy_helper(id, now).map(|_| ()),
        ("master", Some(level)) => match level.parse() {
            Ok(level) => session.upgrade_mastery(level, now).map(|_| ()),
            Err(_) => {
                println!("master expects a level number");
                return Ok(true);
            }
        },
        ("prestige", _) => session.prestige(now).map(|_| ()),
        ("tutorial", _) => session.complete_tutorial(now),
        ("status", _) => {
            println!("{}", serde_json::to_string_pretty(&session.view(now))?);
            return Ok(true);
        }
        ("save", _) => {
            if let Err(e) = session.save_now(now) {
                println!("save failed: {e}");
            }
            return Ok(true);
        }
        ("quit" | "exit", _) => return Ok(false),
        _ => {
            println!("commands: tap | up | buy <upgrade> | hire <helper> | master <level> | prestige | tutorial | status | save | quit");
            return Ok(true);
        }
    };
    if let Err(e) = outcome {
        println!("rejected: {e}");
    }
    Ok(true)
}

async fn play(mut session: Session<FileStore>) -> Result<()> {
    let poll = Duration::from_millis(session.game().config().poll_interval_ms.max(1));
    let mut ticker = tokio::time::interval(poll);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => session.tick(now_ms()),
            line = lines.next_line() => {
                let keep_going = match line.context("reading stdin")? {
                    Some(line) => handle(&mut session, line.trim())?,
                    None => false,
                };
                if !keep_going {
                    break;
                }
            }
        }
        for event in session.drain_events() {
            report(&event)?;
        }
    }

    if let Err(e) = session.shutdown(now_ms()) {
        warn!(error = %e, "final save failed");
    }
    info!("bye");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    info!(git_sha = env!("GIT_SHA"), ?args, "starting crumbs");
    let cfg = load_config(&args)?;

    if let Some(seconds) = args.simulate {
        simulate(cfg, seconds, args.taps_per_second);
        return Ok(());
    }

    let dir = args.save_dir.clone().unwrap_or_else(default_save_dir);
    let mut session = Session::open(FileStore::new(&dir), cfg, now_ms());
    if args.reset {
        session.reset(now_ms()).context("resetting save")?;
    }
    info!(dir = %dir.display(), origin = ?session.load_origin(), "save slot ready");
    play(session).await
}
