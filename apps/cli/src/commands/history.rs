use anyhow::{Context, Result};
use clap::Args;
use console::style;

use super::{format_record, open_history};
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Show at most this many records
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Delete the record for this text instead of listing
    #[arg(long, value_name = "TEXT")]
    pub remove: Option<String>,
}

pub fn run(args: HistoryArgs, settings: &Settings) -> Result<()> {
    let store = open_history(&settings.storage.database_path())?;

    if let Some(text) = args.remove {
        let record = store
            .find(&text)?
            .with_context(|| format!("no history record for \"{text}\""))?;
        store.delete(&record)?;
        eprintln!("{} {}", style("Removed").green(), format_record(&record));
        return Ok(());
    }

    let records = store.list_all().current();
    if records.is_empty() {
        eprintln!("{}", style("No history yet.").dim());
        return Ok(());
    }
    for record in records.iter().take(args.limit) {
        println!("{}", format_record(record));
    }
    Ok(())
}
