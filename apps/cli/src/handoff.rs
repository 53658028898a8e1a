//! Ways of handing the chosen phrase back to the user.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use polisher_core::{HandoffError, HostHandoff};

/// Copies the phrase to the system clipboard.
#[derive(Default)]
pub struct ClipboardHandoff;

impl ClipboardHandoff {
    pub fn copy(&self, phrase: &str) -> Result<(), HandoffError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| HandoffError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(phrase)
            .map_err(|e| HandoffError::Clipboard(e.to_string()))?;
        tracing::debug!(chars = phrase.chars().count(), "Copied phrase to clipboard");
        Ok(())
    }
}

impl HostHandoff for ClipboardHandoff {
    fn on_finish(&self, phrase: Option<&str>) -> Result<(), HandoffError> {
        match phrase {
            Some(phrase) => self.copy(phrase),
            None => Ok(()),
        }
    }
}

/// Writes the phrase to `out` for a wrapping caller to substitute, and
/// copies it to the clipboard when one is configured.
///
/// A clipboard failure is only logged: the phrase has already been
/// delivered.
pub struct ReplaceHandoff<W> {
    out: Mutex<W>,
    clipboard: Option<ClipboardHandoff>,
}

impl<W: Write + Send> ReplaceHandoff<W> {
    pub fn new(out: W, clipboard: Option<ClipboardHandoff>) -> Self {
        Self {
            out: Mutex::new(out),
            clipboard,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> HostHandoff for ReplaceHandoff<W> {
    fn on_finish(&self, phrase: Option<&str>) -> Result<(), HandoffError> {
        let Some(phrase) = phrase else {
            return Ok(());
        };

        {
            let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
            writeln!(out, "{phrase}").map_err(|e| HandoffError::Delivery(e.to_string()))?;
            out.flush()
                .map_err(|e| HandoffError::Delivery(e.to_string()))?;
        }

        if let Some(clipboard) = &self.clipboard {
            if let Err(e) = clipboard.copy(phrase) {
                tracing::warn!(error = %e, "Phrase delivered but not copied");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_writes_phrase_line() {
        let handoff = ReplaceHandoff::new(Vec::new(), None);
        handoff.on_finish(Some("欣喜若狂")).unwrap();

        assert_eq!(String::from_utf8(handoff.into_inner()).unwrap(), "欣喜若狂\n");
    }

    #[test]
    fn test_replace_writes_nothing_when_cancelled() {
        let handoff = ReplaceHandoff::new(Vec::new(), None);
        handoff.on_finish(None).unwrap();

        assert!(handoff.into_inner().is_empty());
    }

    #[test]
    fn test_clipboard_ignores_cancel() {
        assert!(ClipboardHandoff.on_finish(None).is_ok());
    }
}
