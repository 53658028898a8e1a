mod commands;
mod config;
mod handoff;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use crate::commands::{history, polish};
use crate::config::Settings;

#[derive(Debug, Parser)]
#[command(name = "polisher", version, about = "Turn plain sentences into idioms")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// History database path
    #[arg(long, env = "POLISHER_DB", global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Polish text and pick a phrase
    Polish(polish::PolishArgs),
    /// List or edit past results
    History(history::HistoryArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.storage.database_path = Some(db);
    }

    match cli.command {
        Command::Polish(args) => polish::run(args, settings).await,
        Command::History(args) => history::run(args, &settings).map(|()| ExitCode::SUCCESS),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "warn,polisher=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_polish_with_seed() {
        let cli = Cli::try_parse_from(["polisher", "polish", "他很高兴", "--replace"]).unwrap();
        let Command::Polish(args) = cli.command else {
            panic!("expected polish command");
        };
        assert_eq!(args.text.as_deref(), Some("他很高兴"));
        assert!(args.replace);
    }

    #[test]
    fn test_parse_history_remove() {
        let cli =
            Cli::try_parse_from(["polisher", "--db", "/tmp/h.db", "history", "--remove", "a"])
                .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/h.db")));
        let Command::History(args) = cli.command else {
            panic!("expected history command");
        };
        assert_eq!(args.remove.as_deref(), Some("a"));
    }
}
