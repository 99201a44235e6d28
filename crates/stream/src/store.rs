//! Public state store observed by the UI.
//!
//! Holds the message log and projection for the current session and
//! publishes a [`SessionSnapshot`] on every change through a `watch` channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use council_core::{AuthorizationRequest, ConnectionStatus, Decision, LogEntry, Phase};
use events::StreamEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::authorization::AuthorizationDetector;
use crate::config::StreamConfig;
use crate::log::MessageLog;
use crate::projector::{Projector, ProjectorUpdate};

/// Read model of one session view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub phase: Phase,
    /// Messages ordered by `occurred_at`
    pub messages: Vec<LogEntry>,
    pub decision: Option<Decision>,
    pub status: ConnectionStatus,
    /// User-facing error text, if any
    pub error: Option<String>,
    pub authorization_request: Option<AuthorizationRequest>,
    /// Frames dropped because they did not decode
    pub ignored_frames: u64,
}

impl SessionSnapshot {
    /// No further automatic activity will happen for this session.
    pub fn is_terminal(&self) -> bool {
        self.status == ConnectionStatus::Disconnected
    }
}

pub fn retry_message(attempt: u32, max_attempts: u32) -> String {
    format!(
        "Connection lost. Reconnecting (attempt {}/{})...",
        attempt, max_attempts
    )
}

pub fn exhausted_message(max_attempts: u32) -> String {
    format!(
        "Unable to reconnect after {} attempts. Please refresh the page.",
        max_attempts
    )
}

#[derive(Debug)]
struct SessionState {
    session_id: Option<String>,
    log: MessageLog,
    projector: Projector,
    status: ConnectionStatus,
    error: Option<String>,
    ignored_frames: u64,
}

impl SessionState {
    fn new(session_id: Option<String>, config: &StreamConfig) -> Self {
        Self {
            session_id,
            log: MessageLog::new(),
            projector: Projector::new(AuthorizationDetector::new(config.clone())),
            status: ConnectionStatus::default(),
            error: None,
            ignored_frames: 0,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            phase: self.projector.phase(),
            messages: self.log.entries().to_vec(),
            decision: self.projector.decision().cloned(),
            status: self.status,
            error: self.error.clone(),
            authorization_request: self.projector.authorization().cloned(),
            ignored_frames: self.ignored_frames,
        }
    }

    fn apply_event(&mut self, event: &StreamEvent) -> bool {
        // Replayed messages must not reach the projector again.
        if let StreamEvent::AgentMessage(entry) = event {
            if !self.log.append(entry.clone()) {
                debug!(agent = %entry.participant_id, "Dropping duplicate message");
                return false;
            }
        }

        match self.projector.apply(event) {
            ProjectorUpdate::Unchanged => matches!(event, StreamEvent::AgentMessage(_)),
            ProjectorUpdate::Changed => true,
            ProjectorUpdate::ApplicationError(message) => {
                self.status = ConnectionStatus::Error;
                self.error = Some(message);
                true
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus, error: Option<String>) -> bool {
        self.status = status;
        self.error = error;
        true
    }
}

pub struct StateStore {
    config: StreamConfig,
    state: Mutex<SessionState>,
    tx: watch::Sender<SessionSnapshot>,
    generation: AtomicU64,
}

impl StateStore {
    pub fn new(config: StreamConfig) -> Self {
        let state = SessionState::new(None, &config);
        let (tx, _) = watch::channel(state.snapshot());
        Self {
            config,
            state: Mutex::new(state),
            tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Current state, read synchronously.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Discard everything and start over for `session_id`.
    pub fn reset(&self, session_id: &str) {
        self.update(None, |state| {
            *state = SessionState::new(Some(session_id.to_string()), &self.config);
            true
        });
    }

    /// Grant write access to a new driver run, revoking every earlier one.
    pub fn begin_run(self: &Arc<Self>) -> RunLease {
        let run = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RunLease {
            store: Arc::clone(self),
            run,
        }
    }

    /// Revoke write access from every outstanding run.
    pub fn revoke_runs(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Decode one raw frame and fold it into the state.
    pub fn handle_frame(&self, raw: &str) {
        self.handle_frame_for(None, raw);
    }

    pub fn apply_event(&self, event: &StreamEvent) {
        self.apply_event_for(None, event);
    }

    /// Whether the stream reached graceful completion.
    pub fn is_completed(&self) -> bool {
        self.lock().projector.is_completed()
    }

    /// Keeps any retry message so it stays visible while reconnecting.
    pub fn set_connecting(&self) {
        self.update(None, |state| {
            state.status = ConnectionStatus::Connecting;
            true
        });
    }

    pub fn clear_error(&self) {
        self.update(None, |state| state.error.take().is_some());
    }

    pub fn set_connected(&self) {
        self.update(None, |state| state.set_status(ConnectionStatus::Connected, None));
    }

    /// Stream ended after completion, or the client was stopped.
    pub fn set_disconnected(&self) {
        self.update(None, |state| {
            state.status = ConnectionStatus::Disconnected;
            true
        });
    }

    pub fn set_retrying(&self, attempt: u32, max_attempts: u32) {
        self.update(None, |state| {
            state.set_status(
                ConnectionStatus::Error,
                Some(retry_message(attempt, max_attempts)),
            )
        });
    }

    pub fn set_exhausted(&self, max_attempts: u32) {
        self.update(None, |state| {
            state.set_status(
                ConnectionStatus::Disconnected,
                Some(exhausted_message(max_attempts)),
            )
        });
    }

    /// The authorization flow finished for `request_id`.
    pub fn resolve_authorization(&self, request_id: &str) -> bool {
        let mut resolved = false;
        self.update(None, |state| {
            resolved = state.projector.resolve_authorization(request_id);
            resolved
        });
        resolved
    }

    /// The authorization flow was cancelled.
    pub fn dismiss_authorization(&self) -> bool {
        let mut dismissed = false;
        self.update(None, |state| {
            dismissed = state.projector.dismiss_authorization();
            dismissed
        });
        dismissed
    }

    fn is_current(&self, run: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == run
    }

    fn handle_frame_for(&self, run: Option<u64>, raw: &str) -> bool {
        match events::decode_or_ignore(raw) {
            Some(event) => self.apply_event_for(run, &event),
            None => self.update(run, |state| {
                state.ignored_frames += 1;
                true
            }),
        }
    }

    fn apply_event_for(&self, run: Option<u64>, event: &StreamEvent) -> bool {
        if event.is_liveness_only() {
            debug!(kind = event.kind(), "Liveness frame");
            return run.map_or(true, |run| self.is_current(run));
        }
        self.update(run, |state| state.apply_event(event))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` under the lock. With `run`, nothing is written unless that
    /// run still holds the lease; returns false in that case.
    fn update<F>(&self, run: Option<u64>, f: F) -> bool
    where
        F: FnOnce(&mut SessionState) -> bool,
    {
        let mut state = self.lock();
        if let Some(run) = run {
            if !self.is_current(run) {
                return false;
            }
        }
        if f(&mut state) {
            let snapshot = state.snapshot();
            self.tx.send_replace(snapshot);
        }
        true
    }
}

/// Write access held by one driver run.
///
/// Every write re-checks the lease while holding the store lock, so once
/// [`StateStore::revoke_runs`] returns, a superseded run can no longer
/// change the state. Each method returns false when the lease was lost.
pub struct RunLease {
    store: Arc<StateStore>,
    run: u64,
}

impl RunLease {
    pub fn is_current(&self) -> bool {
        self.store.is_current(self.run)
    }

    pub fn is_completed(&self) -> bool {
        self.store.is_completed()
    }

    pub fn handle_frame(&self, raw: &str) -> bool {
        self.store.handle_frame_for(Some(self.run), raw)
    }

    pub fn set_connecting(&self) -> bool {
        self.store.update(Some(self.run), |state| {
            state.status = ConnectionStatus::Connecting;
            true
        })
    }

    pub fn set_connected(&self) -> bool {
        self.store.update(Some(self.run), |state| {
            state.set_status(ConnectionStatus::Connected, None)
        })
    }

    pub fn set_disconnected(&self) -> bool {
        self.store.update(Some(self.run), |state| {
            state.status = ConnectionStatus::Disconnected;
            true
        })
    }

    pub fn set_retrying(&self, attempt: u32, max_attempts: u32) -> bool {
        self.store.update(Some(self.run), |state| {
            state.set_status(
                ConnectionStatus::Error,
                Some(retry_message(attempt, max_attempts)),
            )
        })
    }

    pub fn set_exhausted(&self, max_attempts: u32) -> bool {
        self.store.update(Some(self.run), |state| {
            state.set_status(
                ConnectionStatus::Disconnected,
                Some(exhausted_message(max_attempts)),
            )
        })
    }
}

impl std::fmt::Debug for RunLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLease")
            .field("run", &self.run)
            .field("current", &self.is_current())
            .finish()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("StateStore")
            .field("session_id", &snapshot.session_id)
            .field("status", &snapshot.status)
            .field("phase", &snapshot.phase)
            .field("messages", &snapshot.messages.len())
            .finish()
    }
}
