use clap::Subcommand;
use heistwatch_core::storage::{Config, Database};
use heistwatch_core::timer::format_time;
use heistwatch_core::PhaseTimer;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List the pending setup laps of the current attempt
    List {
        /// Show every lap instead of the configured limit
        #[arg(long)]
        all: bool,
    },
    /// List completed heist runs with their lap breakdowns
    Runs {
        /// Show every run instead of the configured limit
        #[arg(long)]
        all: bool,
    },
    /// Print aggregate history statistics as JSON
    Stats,
    /// Clear the completed-run history
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut engine = PhaseTimer::load(Box::new(db));

    match action {
        HistoryAction::List { all } => {
            let laps = engine.setup_laps();
            if laps.is_empty() {
                println!("No setups recorded yet");
                return Ok(());
            }
            let limit = if all { laps.len() } else { history_limit() };
            let total = laps.len();
            for (index, lap) in laps.iter().take(limit).enumerate() {
                let name = if lap.label.trim().is_empty() {
                    format!("Setup {}", total - index)
                } else {
                    lap.label.clone()
                };
                println!("{name}  {}  [{}]", lap.display, lap.rating);
            }
        }
        HistoryAction::Runs { all } => {
            let runs = engine.heist_runs();
            if runs.is_empty() {
                println!("No heists completed yet");
                return Ok(());
            }
            let limit = if all { runs.len() } else { history_limit() };
            let total = runs.len();
            for (index, run) in runs.iter().take(limit).enumerate() {
                let name = if run.label.trim().is_empty() {
                    format!("Heist {}", total - index)
                } else {
                    run.label.clone()
                };
                let marker = if run.failed { "  FAILED" } else { "" };
                println!(
                    "{name} ({} setups)  {}{marker}",
                    run.setup_count,
                    format_time(run.total_duration_ms),
                );
                for lap in &run.laps {
                    let lap_name = if lap.label.trim().is_empty() {
                        "Setup".to_string()
                    } else {
                        lap.label.clone()
                    };
                    println!("  {lap_name}  {}  [{}]", lap.display, lap.rating);
                }
            }
        }
        HistoryAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&engine.history_stats())?);
        }
        HistoryAction::Clear => {
            if let Some(event) = engine.clear_history() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
        }
    }
    Ok(())
}

fn history_limit() -> usize {
    Config::load_or_default().ui.history_limit
}
