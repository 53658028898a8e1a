use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use polisher_core::{HostHandoffRef, PolishResult};
use polisher_events::TracingEventBus;
use polisher_remote::HttpPolisher;
use polisher_session::{PolishingSession, SessionDeps, SessionState, SubmitOutcome};

use super::{format_record, open_history};
use crate::config::Settings;
use crate::handoff::{ClipboardHandoff, ReplaceHandoff};

/// History records offered at the input prompt.
const HISTORY_CHOICES: usize = 10;

#[derive(Debug, Args)]
pub struct PolishArgs {
    /// Text to polish, `-` to read stdin. Prompts when omitted.
    pub text: Option<String>,

    /// Print the chosen phrase to stdout as well as copying it
    #[arg(long)]
    pub replace: bool,

    /// Polishing service root URL
    #[arg(long, env = "POLISHER_BACKEND_URL", value_name = "URL")]
    pub backend_url: Option<String>,
}

pub async fn run(args: PolishArgs, mut settings: Settings) -> Result<ExitCode> {
    if let Some(url) = args.backend_url {
        settings.remote.base_url = url;
    }

    let seed = match args.text.as_deref() {
        Some("-") => Some(interactive(read_stdin)?),
        other => other.map(str::to_string),
    };

    let polisher =
        HttpPolisher::new(&settings.remote).context("invalid polishing service settings")?;
    let history = open_history(&settings.storage.database_path())?;
    let handoff: HostHandoffRef = if args.replace {
        Arc::new(ReplaceHandoff::new(io::stdout(), Some(ClipboardHandoff)))
    } else {
        Arc::new(ClipboardHandoff)
    };
    tracing::debug!(endpoint = %polisher.endpoint(), replace = args.replace, "Starting session");

    let deps = SessionDeps::new(Arc::new(polisher), history, handoff)
        .with_events(Arc::new(TracingEventBus));
    let session = PolishingSession::new(deps, seed);
    let theme = ColorfulTheme::default();

    loop {
        match session.state() {
            SessionState::Input { draft } => {
                interactive(|| prompt_input(&session, &theme, draft))?
            }
            SessionState::Loading { .. } => wait_for_response(&session).await?,
            SessionState::Result { result, .. } => {
                interactive(|| prompt_result(&session, &theme, &result))?
            }
            SessionState::Error { message, .. } => {
                interactive(|| prompt_error(&session, &theme, &message))?
            }
            SessionState::Finished { .. } => break,
        }
    }

    if let Err(e) = session.flush_persistence().await {
        eprintln!("{} {e}", style("warning:").yellow());
    }

    match session.state() {
        SessionState::Finished {
            phrase: Some(phrase),
        } => {
            if !args.replace {
                eprintln!("{} {}", style("Copied").green().bold(), phrase);
            }
            Ok(ExitCode::SUCCESS)
        }
        _ if args.replace => Ok(ExitCode::FAILURE),
        _ => Ok(ExitCode::SUCCESS),
    }
}

/// Run blocking terminal I/O without holding up the runtime's other tasks.
fn interactive<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    tokio::task::block_in_place(f)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read text from stdin")?;
    Ok(text.trim_end_matches(['\r', '\n']).to_string())
}

fn prompt_input(session: &PolishingSession, theme: &ColorfulTheme, draft: String) -> Result<()> {
    let records = session.history().current();
    let shown = records.len().min(HISTORY_CHOICES);

    if shown > 0 {
        let mut items = Vec::with_capacity(shown + 2);
        items.push("Enter text".to_string());
        items.extend(records.iter().take(shown).map(format_record));
        items.push("Quit".to_string());

        let choice = Select::with_theme(theme)
            .with_prompt("Polish")
            .items(&items)
            .default(0)
            .interact_opt()?;
        match choice {
            Some(0) => {}
            Some(i) if i <= shown => {
                session.select_record(&records[i - 1]);
                return Ok(());
            }
            _ => {
                session.cancel()?;
                return Ok(());
            }
        }
    }

    let text: String = Input::with_theme(theme)
        .with_prompt("Text")
        .with_initial_text(draft)
        .allow_empty(true)
        .interact_text()?;
    session.set_draft(text);
    if session.submit() == SubmitOutcome::BlankInput {
        eprintln!("{}", style("Nothing to polish.").yellow());
    }
    Ok(())
}

async fn wait_for_response(session: &PolishingSession) -> Result<()> {
    eprintln!("{}", style("Polishing...").dim());
    let mut rx = session.subscribe();
    rx.wait_for(|state| !matches!(state, SessionState::Loading { .. }))
        .await
        .context("session ended while waiting for the service")?;
    Ok(())
}

fn print_result(result: &PolishResult) {
    eprintln!();
    eprintln!("  {}", style(&result.idiom).green().bold());
    if !result.alternatives.is_empty() {
        eprintln!("  {} {}", style("also:").dim(), result.alternatives.join(", "));
    }
    if !result.explanation.is_empty() {
        eprintln!("  {}", result.explanation);
    }
    if !result.tone_score.is_empty() {
        eprintln!("  {} {}", style("tone:").dim(), result.tone_score);
    }
    eprintln!();
}

fn prompt_result(session: &PolishingSession, theme: &ColorfulTheme, result: &PolishResult) -> Result<()> {
    print_result(result);

    let phrases: Vec<&str> = result.phrases().collect();
    let mut items: Vec<String> = phrases.iter().map(|p| p.to_string()).collect();
    items.push("Try another text".to_string());
    items.push("Cancel".to_string());

    let choice = Select::with_theme(theme)
        .with_prompt("Use")
        .items(&items)
        .default(0)
        .interact_opt()?;
    match choice {
        Some(i) if i < phrases.len() => {
            let phrase = phrases[i];
            session
                .select(phrase)
                .with_context(|| format!("could not hand off \"{phrase}\""))?;
        }
        Some(i) if i == phrases.len() => {
            session.reset();
        }
        _ => {
            session.cancel()?;
        }
    }
    Ok(())
}

fn prompt_error(session: &PolishingSession, theme: &ColorfulTheme, message: &str) -> Result<()> {
    eprintln!("{} {message}", style("✗").red().bold());

    let choice = Select::with_theme(theme)
        .items(&["Edit and retry", "Cancel"])
        .default(0)
        .interact_opt()?;
    if choice == Some(0) {
        session.dismiss();
    } else {
        session.cancel()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_interactive_keeps_runtime_responsive() {
        let prompt = tokio::spawn(async {
            let (tx, rx) = mpsc::channel();
            tokio::spawn(async move {
                tx.send(()).ok();
            });
            interactive(|| {
                rx.recv_timeout(Duration::from_secs(5))
                    .context("background task never ran")
            })
        });

        prompt.await.unwrap().unwrap();
    }
}
