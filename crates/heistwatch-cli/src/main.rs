use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "heistwatch-cli", version, about = "Heistwatch CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Lap and run history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn timer_reset_accepts_force_flag() {
        let cli = Cli::try_parse_from(["heistwatch-cli", "timer", "reset", "--force"]).unwrap();
        match cli.command {
            Commands::Timer {
                action: commands::timer::TimerAction::Reset { force },
            } => assert!(force),
            _ => panic!("expected timer reset"),
        }
    }

    #[test]
    fn label_takes_positional_text() {
        let cli = Cli::try_parse_from(["heistwatch-cli", "timer", "label", "vault job"]).unwrap();
        match cli.command {
            Commands::Timer {
                action: commands::timer::TimerAction::Label { text },
            } => assert_eq!(text, "vault job"),
            _ => panic!("expected timer label"),
        }
    }

    #[test]
    fn history_list_accepts_all_flag() {
        let cli = Cli::try_parse_from(["heistwatch-cli", "history", "list", "--all"]).unwrap();
        match cli.command {
            Commands::History {
                action: commands::history::HistoryAction::List { all },
            } => assert!(all),
            _ => panic!("expected history list"),
        }
    }
}
