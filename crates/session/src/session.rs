use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use polisher_core::{
    is_blank, HostHandoffRef, PolishRecord, PolishResult, RemoteError, RemotePolisherRef,
};
use polisher_events::{
    event_names, EventBus, EventBusRef, HistoryPersistFailedEvent, HistoryUpdatedEvent,
    NullEventBus, SessionFinishedEvent,
};
use polisher_storage::{HistoryStore, HistoryView};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{SessionError, SessionResult, SessionState};

/// Collaborators a session talks to.
#[derive(Clone)]
pub struct SessionDeps {
    pub polisher: RemotePolisherRef,
    pub history: Arc<HistoryStore>,
    pub handoff: HostHandoffRef,
    pub events: EventBusRef,
}

impl SessionDeps {
    pub fn new(polisher: RemotePolisherRef, history: Arc<HistoryStore>, handoff: HostHandoffRef) -> Self {
        Self {
            polisher,
            history,
            handoff,
            events: Arc::new(NullEventBus),
        }
    }

    pub fn with_events(mut self, events: EventBusRef) -> Self {
        self.events = events;
        self
    }
}

/// What happened to a submit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A remote call was started.
    Started,
    /// The draft was blank; nothing changed.
    BlankInput,
    /// The session was not in `Input` (already loading, showing a result,
    /// finished or closed).
    NotAccepting,
}

/// Whether a user action applied to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

struct Core {
    state: SessionState,
    /// Bumped on every entry into `Loading`; outcomes of older attempts are dropped.
    attempt: u64,
    closed: bool,
    /// Write tasks not yet awaited by `flush_persistence`.
    pending_writes: Vec<JoinHandle<()>>,
    /// Resolves once the most recently started write has ended.
    last_write: Option<oneshot::Receiver<()>>,
    /// First write failure since the last flush.
    write_error: Option<SessionError>,
}

impl Core {
    fn record_write_error(&mut self, error: SessionError) {
        if self.write_error.is_none() {
            self.write_error = Some(error);
        }
    }
}

struct Shared {
    deps: SessionDeps,
    core: Mutex<Core>,
    state_tx: watch::Sender<SessionState>,
    cancel: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the core lock held so observers see transitions in order.
    fn transition(&self, core: &mut Core, next: SessionState) {
        tracing::debug!(from = ?core.state.phase(), to = ?next.phase(), "Session transition");
        core.state = next;
        self.state_tx.send_replace(core.state.clone());
        emit(
            self.deps.events.as_ref(),
            event_names::SESSION_STATE_CHANGED,
            &core.state.to_event(),
        );
    }

    fn begin_loading(self: &Arc<Self>, core: &mut Core, text: String) {
        core.attempt += 1;
        let attempt = core.attempt;
        tracing::info!(attempt, chars = text.chars().count(), "Polish request started");
        self.transition(core, SessionState::Loading { text: text.clone() });

        let shared = Arc::clone(self);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(attempt, "Polish request cancelled");
                    return;
                }
                outcome = shared.deps.polisher.polish(&text) => outcome,
            };
            shared.complete(attempt, text, outcome);
        });
    }

    fn complete(self: &Arc<Self>, attempt: u64, text: String, outcome: Result<PolishResult, RemoteError>) {
        let mut core = self.lock();
        if core.closed
            || core.attempt != attempt
            || !matches!(core.state, SessionState::Loading { .. })
        {
            tracing::debug!(attempt, "Discarding stale polish outcome");
            return;
        }

        match outcome {
            Ok(result) => {
                tracing::info!(attempt, idiom = %result.idiom, "Polish request succeeded");
                self.persist(&mut core, text.clone(), result.clone());
                self.transition(&mut core, SessionState::Result { result, draft: text });
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Polish request failed");
                self.transition(
                    &mut core,
                    SessionState::Error {
                        message: format!("Request failed: {e}"),
                        draft: text,
                    },
                );
            }
        }
    }

    /// Queue a history write behind every write this session started before.
    ///
    /// Writes run off the caller's thread, one at a time, in the order their
    /// results were shown. They are not tied to the session's cancellation:
    /// once a result has been shown it is recorded even if the session
    /// closes right after.
    fn persist(self: &Arc<Self>, core: &mut Core, text: String, result: PolishResult) {
        core.pending_writes.retain(|write| !write.is_finished());

        let previous = core.last_write.take();
        let (done_tx, done_rx) = oneshot::channel::<()>();
        core.last_write = Some(done_rx);

        let shared = Arc::clone(self);
        let write = tokio::spawn(async move {
            if let Some(previous) = previous {
                // The sender is dropped, never sent on, when that write ends.
                let _ = previous.await;
            }
            if let Err(e) = shared.write_history(text, result).await {
                shared.lock().record_write_error(e);
            }
            drop(done_tx);
        });
        core.pending_writes.push(write);
    }

    async fn write_history(&self, text: String, result: PolishResult) -> SessionResult<()> {
        let history = Arc::clone(&self.deps.history);
        let key = text.clone();
        let written = tokio::task::spawn_blocking(move || history.upsert(&key, &result))
            .await
            .map_err(|e| SessionError::PersistenceTask(e.to_string()))?;

        match written {
            Ok(record) => {
                emit(
                    self.deps.events.as_ref(),
                    event_names::HISTORY_UPDATED,
                    &HistoryUpdatedEvent {
                        original_text: record.original_text,
                        idiom: record.idiom,
                        timestamp: record.timestamp,
                    },
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to write history");
                emit(
                    self.deps.events.as_ref(),
                    event_names::HISTORY_PERSIST_FAILED,
                    &HistoryPersistFailedEvent {
                        original_text: text,
                        error: e.to_string(),
                    },
                );
                Err(e.into())
            }
        }
    }
}

fn emit<T: Serialize>(events: &dyn EventBus, topic: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => events.emit(topic, value),
        Err(e) => tracing::warn!(topic, error = %e, "Failed to serialize event"),
    }
}

/// One user-facing polishing interaction.
///
/// Dropping the session tears it down: an in-flight remote call is cancelled
/// and its outcome never reaches the state.
pub struct PolishingSession {
    shared: Arc<Shared>,
}

impl PolishingSession {
    /// Create a session, auto-submitting `seed` when it is not blank.
    ///
    /// Must be called inside a tokio runtime when `seed` is non-blank.
    pub fn new(deps: SessionDeps, seed: Option<String>) -> Self {
        let seed = seed.unwrap_or_default();
        let initial = SessionState::Input {
            draft: seed.clone(),
        };
        let (state_tx, _) = watch::channel(initial.clone());
        let shared = Arc::new(Shared {
            deps,
            core: Mutex::new(Core {
                state: initial,
                attempt: 0,
                closed: false,
                pending_writes: Vec::new(),
                last_write: None,
                write_error: None,
            }),
            state_tx,
            cancel: CancellationToken::new(),
        });

        {
            let mut core = shared.lock();
            if is_blank(&seed) {
                emit(
                    shared.deps.events.as_ref(),
                    event_names::SESSION_STATE_CHANGED,
                    &core.state.to_event(),
                );
            } else {
                tracing::info!("Seed text supplied, submitting immediately");
                shared.begin_loading(&mut core, seed);
            }
        }

        Self { shared }
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.shared.state_tx.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    /// Live history view from the session's store.
    pub fn history(&self) -> HistoryView {
        self.shared.deps.history.list_all()
    }

    /// Replace the draft. Only accepted in `Input`.
    pub fn set_draft(&self, text: impl Into<String>) -> Transition {
        let mut core = self.shared.lock();
        if core.closed || !matches!(core.state, SessionState::Input { .. }) {
            return Transition::Ignored;
        }
        self.shared.transition(&mut core, SessionState::Input { draft: text.into() });
        Transition::Applied
    }

    /// Commit the draft and start a remote call.
    ///
    /// Blank drafts are skipped silently; so is any submit outside `Input`,
    /// which keeps at most one remote call in flight per session.
    pub fn submit(&self) -> SubmitOutcome {
        let mut core = self.shared.lock();
        if core.closed {
            return SubmitOutcome::NotAccepting;
        }
        let text = match &core.state {
            SessionState::Input { draft } if is_blank(draft) => return SubmitOutcome::BlankInput,
            SessionState::Input { draft } => draft.clone(),
            other => {
                tracing::debug!(phase = ?other.phase(), "Submit ignored");
                return SubmitOutcome::NotAccepting;
            }
        };
        self.shared.begin_loading(&mut core, text);
        SubmitOutcome::Started
    }

    /// Show a history record as the result, without a remote call.
    ///
    /// Alternatives are not stored, so the result carries none. The record's
    /// original text becomes the draft.
    pub fn select_record(&self, record: &PolishRecord) -> Transition {
        let mut core = self.shared.lock();
        if core.closed || !matches!(core.state, SessionState::Input { .. }) {
            return Transition::Ignored;
        }
        tracing::debug!(id = record.id, "Showing history record");
        self.shared.transition(
            &mut core,
            SessionState::Result {
                result: PolishResult::from(record),
                draft: record.original_text.clone(),
            },
        );
        Transition::Applied
    }

    /// Hand `phrase` to the host and end the session. Only accepted in `Result`.
    pub fn select(&self, phrase: &str) -> SessionResult<Transition> {
        {
            let mut core = self.shared.lock();
            if core.closed || !matches!(core.state, SessionState::Result { .. }) {
                return Ok(Transition::Ignored);
            }
            self.shared.transition(
                &mut core,
                SessionState::Finished {
                    phrase: Some(phrase.to_string()),
                },
            );
        }
        self.finish(Some(phrase))
    }

    /// Drop the result and start over with an empty draft.
    pub fn reset(&self) -> Transition {
        let mut core = self.shared.lock();
        if core.closed || !matches!(core.state, SessionState::Result { .. }) {
            return Transition::Ignored;
        }
        self.shared.transition(&mut core, SessionState::Input { draft: String::new() });
        Transition::Applied
    }

    /// Acknowledge an error and return to `Input` with the failed draft.
    pub fn dismiss(&self) -> Transition {
        let mut core = self.shared.lock();
        if core.closed {
            return Transition::Ignored;
        }
        let SessionState::Error { draft, .. } = &core.state else {
            return Transition::Ignored;
        };
        let draft = draft.clone();
        self.shared.transition(&mut core, SessionState::Input { draft });
        Transition::Applied
    }

    /// End the session without a phrase, from any non-terminal state.
    ///
    /// An in-flight remote call is abandoned.
    pub fn cancel(&self) -> SessionResult<Transition> {
        {
            let mut core = self.shared.lock();
            if core.closed || core.state.is_finished() {
                return Ok(Transition::Ignored);
            }
            self.shared
                .transition(&mut core, SessionState::Finished { phrase: None });
        }
        self.finish(None)
    }

    fn finish(&self, phrase: Option<&str>) -> SessionResult<Transition> {
        self.shared.cancel.cancel();
        tracing::info!(selected = phrase.is_some(), "Session finished");
        emit(
            self.shared.deps.events.as_ref(),
            event_names::SESSION_FINISHED,
            &SessionFinishedEvent {
                phrase: phrase.map(str::to_string),
            },
        );
        self.shared.deps.handoff.on_finish(phrase)?;
        Ok(Transition::Applied)
    }

    /// Tear the session down without a handoff.
    ///
    /// Any in-flight remote call is cancelled and the state is frozen.
    /// History writes already started still complete.
    pub fn close(&self) {
        let mut core = self.shared.lock();
        if core.closed {
            return;
        }
        core.closed = true;
        self.shared.cancel.cancel();
        tracing::debug!(phase = ?core.state.phase(), "Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Wait for every history write started so far.
    ///
    /// Returns the first failure since the previous flush. The result state
    /// is not affected by it.
    pub async fn flush_persistence(&self) -> SessionResult<()> {
        let pending = std::mem::take(&mut self.shared.lock().pending_writes);

        for write in pending {
            if let Err(e) = write.await {
                self.shared
                    .lock()
                    .record_write_error(SessionError::PersistenceTask(e.to_string()));
            }
        }

        let error = self.shared.lock().write_error.take();
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for PolishingSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use polisher_core::{HandoffError, HostHandoff, RemotePolisher};

    struct EchoPolisher;

    #[async_trait]
    impl RemotePolisher for EchoPolisher {
        async fn polish(&self, text: &str) -> Result<PolishResult, RemoteError> {
            Ok(PolishResult {
                original: text.to_string(),
                idiom: format!("{text}!"),
                alternatives: Vec::new(),
                explanation: String::new(),
                tone_score: String::new(),
            })
        }
    }

    struct NoHandoff;

    impl HostHandoff for NoHandoff {
        fn on_finish(&self, _phrase: Option<&str>) -> Result<(), HandoffError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_finished_writes_are_released() {
        let history = Arc::new(HistoryStore::open_in_memory().unwrap());
        let deps = SessionDeps::new(Arc::new(EchoPolisher), history.clone(), Arc::new(NoHandoff));
        let session = PolishingSession::new(deps, None);

        for i in 0..20 {
            session.set_draft(format!("text {i}"));
            assert_eq!(session.submit(), SubmitOutcome::Started);
            let mut rx = session.subscribe();
            tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.result().is_some()))
                .await
                .unwrap()
                .unwrap();
            tokio::time::timeout(Duration::from_secs(5), async {
                while !session.shared.lock().pending_writes.iter().all(|w| w.is_finished()) {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .unwrap();
            session.reset();
        }

        assert_eq!(session.shared.lock().pending_writes.len(), 1);
        session.flush_persistence().await.unwrap();
        assert!(session.shared.lock().pending_writes.is_empty());
        assert_eq!(history.len().unwrap(), 20);
    }
}
