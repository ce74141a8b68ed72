use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use heistwatch_core::storage::{Config, Database};
use heistwatch_core::{Event, PhaseTimer};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a setup lap
    StartSetup,
    /// Complete the running setup lap
    CompleteSetup,
    /// Start the heist phase
    StartHeist,
    /// Complete the heist and record the run
    CompleteHeist,
    /// Drive whichever transition the current phase admits
    Advance,
    /// Reset the in-progress attempt (run history is kept)
    Reset {
        /// Skip the confirmation step
        #[arg(long)]
        force: bool,
    },
    /// Set the label applied to the next lap and run
    Label { text: String },
    /// Print current timer state as JSON
    Status,
    /// Poll the running timer, printing the readout until interrupted
    Watch,
}

fn open_engine() -> Result<PhaseTimer, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(PhaseTimer::load(Box::new(db)))
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;

    match action {
        TimerAction::StartSetup => {
            let event = engine.start_setup();
            print_outcome(event, &engine)?;
        }
        TimerAction::CompleteSetup => {
            let event = engine.complete_setup();
            print_outcome(event, &engine)?;
        }
        TimerAction::StartHeist => {
            let event = engine.start_heist();
            print_outcome(event, &engine)?;
        }
        TimerAction::CompleteHeist => {
            let event = engine.complete_heist();
            print_outcome(event, &engine)?;
        }
        TimerAction::Advance => {
            let event = engine.advance();
            print_outcome(event, &engine)?;
        }
        TimerAction::Reset { force } => {
            let event = engine.reset(force);
            print_outcome(event, &engine)?;
        }
        TimerAction::Label { text } => {
            engine.set_label(&text);
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        TimerAction::Status => {
            // Tick once to reconcile overflow sub-timers.
            let spawned = engine.tick();
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            let rings = engine.overflow_rings();
            if !rings.is_empty() {
                println!("{}", serde_json::to_string_pretty(&rings)?);
            }
            if let Some(event) = spawned {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
        }
        TimerAction::Watch => watch(&mut engine)?,
    }
    Ok(())
}

fn print_outcome(
    event: Option<Event>,
    engine: &PhaseTimer,
) -> Result<(), Box<dyn std::error::Error>> {
    // A no-op command still reports where the timer stands.
    match event {
        Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
        None => println!("{}", serde_json::to_string_pretty(&engine.snapshot())?),
    }
    Ok(())
}

fn watch(engine: &mut PhaseTimer) -> Result<(), Box<dyn std::error::Error>> {
    if !engine.is_ticking() {
        println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        return Ok(());
    }
    let config = Config::load_or_default();
    let interval = Duration::from_millis(config.timer.tick_interval_ms.max(10));
    let mut stdout = std::io::stdout();
    loop {
        if let Some(event) = engine.tick() {
            println!("\n{}", serde_json::to_string_pretty(&event)?);
        }
        let ring = engine.ring_state();
        print!(
            "\r{}  {}  {}   ",
            engine.status_label(),
            engine.display_string(),
            ring.color
        );
        stdout.flush()?;
        std::thread::sleep(interval);
    }
}
