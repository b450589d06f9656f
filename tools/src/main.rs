//! session-runner: headless session runner for Governopoly.
//!
//! Usage:
//!   session-runner --seed 12345 --policy profit --db run.db
//!   session-runner --seed 12345 --policy random --realtime
//!   session-runner --seed 12345 --ipc-mode

mod autoplay;

use anyhow::Result;
use autoplay::{Autoplayer, Policy};
use governopoly_core::{
    catalog::EmailCatalog,
    command::PlayerCommand,
    config::SessionConfig,
    engine::{ChoiceReceipt, SessionEngine},
    event::NotificationCue,
    inbox::DeliveredEmail,
    observer::SessionObserver,
    report::{LeaderboardEntry, SessionReport},
    store::SessionStore,
    types::{new_session_id, Millis},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Advance {
        ms: Millis,
    },
    Command {
        command: PlayerCommand,
    },
    Quit,
}

/// Stands in for the sound player and the end screen.
struct CueLogger;

impl SessionObserver for CueLogger {
    fn on_email_delivered(&mut self, email: &DeliveredEmail, cue: NotificationCue) {
        log::info!("[{cue:?} cue] new email '{}' at {}ms", email.template_id, email.delivered_at_ms);
    }

    fn on_choice_applied(&mut self, receipt: &ChoiceReceipt) {
        log::info!("'{}' answered: {}", receipt.email_id, receipt.description);
    }

    fn on_session_ended(&mut self, report: &SessionReport) {
        log::info!("session over: {}", report.headline());
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let policy = parse_arg(&args, "--policy", Policy::Profit);
    let reaction_ms = parse_arg(&args, "--reaction-ms", 1_500u64);
    let realtime = args.iter().any(|a| a == "--realtime");
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let player = flag_value(&args, "--player").unwrap_or("autoplay");

    let config = SessionConfig::load(data_dir)?;
    let catalog = EmailCatalog::load_dir(data_dir)?;

    if !ipc_mode {
        println!("Governopoly session-runner");
        println!("  seed:      {seed}");
        println!("  policy:    {policy:?}");
        println!("  reaction:  {reaction_ms}ms");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  company:   {}", config.company_name);
        println!();
    }

    let store = SessionStore::open(db)?;
    store.migrate()?;

    let session_id = new_session_id();
    let mut engine = SessionEngine::new(session_id, seed, config, catalog, store)?;
    engine.add_observer(Box::new(CueLogger));

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        let mut bot = Autoplayer::new(policy, reaction_ms);
        if realtime {
            run_realtime(&mut engine, &mut bot)?;
        } else {
            run_batch(&mut engine, &mut bot)?;
        }
        print_summary(&engine, &bot, player)?;
    }

    Ok(())
}

fn run_batch(engine: &mut SessionEngine, bot: &mut Autoplayer) -> Result<()> {
    let interval = engine.config().tick_interval_ms;
    engine.start()?;
    while engine.clock.is_running() {
        engine.tick(interval)?;
        bot.act(engine)?;
    }
    Ok(())
}

fn run_realtime(engine: &mut SessionEngine, bot: &mut Autoplayer) -> Result<()> {
    let interval = Duration::from_millis(engine.config().tick_interval_ms);
    engine.start()?;
    let started = Instant::now();
    let mut feed = WallClockFeed::default();
    while engine.clock.is_running() {
        thread::sleep(interval);
        engine.tick(feed.delta(started.elapsed()))?;
        bot.act(engine)?;
    }
    Ok(())
}

/// Turns wall-clock time since start into tick deltas. Deltas are whole
/// milliseconds; the sub-millisecond rest carries into the next delta.
#[derive(Default)]
struct WallClockFeed {
    fed_ms: Millis,
}

impl WallClockFeed {
    fn delta(&mut self, since_start: Duration) -> Millis {
        let total_ms = since_start.as_millis() as Millis;
        let delta = total_ms.saturating_sub(self.fed_ms);
        self.fed_ms = total_ms;
        delta
    }
}

fn run_ipc_loop(engine: &mut SessionEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let interval = engine.config().tick_interval_ms;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::Advance { ms } => {
                let mut remaining = ms;
                while remaining > 0 && engine.clock.is_running() {
                    let delta = remaining.min(interval);
                    engine.tick(delta)?;
                    remaining -= delta;
                }
            }
            IpcCommand::Command { command } => {
                if let Err(e) = engine.submit(command) {
                    let err_json = serde_json::json!({ "error": e.to_string() });
                    writeln!(stdout, "{}", err_json)?;
                    stdout.flush()?;
                    continue;
                }
            }
        }
        writeln!(stdout, "{}", serde_json::to_string(&engine.snapshot())?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(engine: &SessionEngine, bot: &Autoplayer, player: &str) -> Result<()> {
    let Some(report) = engine.report() else {
        println!("Session did not finish.");
        return Ok(());
    };
    let session_id = &engine.session_id;
    let events = engine.store().events_for_session(session_id)?.len();
    let missed = engine.store().event_count(session_id, "urgent_deadline_missed")?;

    println!("=== SESSION SUMMARY ===");
    println!("  session_id:     {session_id}");
    println!("  elapsed:        {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!("  final tick:     {}", engine.clock.current_tick);
    println!("  delivered:      {}", report.emails_delivered);
    println!("  answered:       {} (bot: {})", report.emails_answered, bot.answered());
    println!("  missed urgent:  {missed}");
    println!("  journal events: {events}");
    println!();
    println!("=== RESULT ===");
    match report.outcome.defeat_reason() {
        Some(reason) => println!("  DEFEAT: {} ({reason:?})", reason.headline()),
        None => println!("  VICTORY: {} ({:?})", report.tier().headline(), report.tier()),
    }
    println!("  budget:         ${}", report.stats.cdo_budget);
    println!("  profit:         ${}", report.stats.company_profit);
    println!("  data quality:   {}%", report.stats.data_quality);
    println!("  reputation:     {}%", report.stats.reputation);

    let entry = LeaderboardEntry::from_report(report, player, &engine.config().company_name, chrono::Utc::now());
    println!();
    println!("=== LEADERBOARD PAYLOAD ===");
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
