//! Connection lifecycle for one session stream.
//!
//! A controller runs at most one driver task. The driver opens the stream,
//! feeds frames to the [`StateStore`], and on close either finishes (the
//! workflow completed) or waits out the backoff and opens a new stream.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::StreamConfig;
use crate::policy::ReconnectPolicy;
use crate::store::{RunLease, SessionSnapshot, StateStore};
use crate::transport::{FrameReceiver, SseTransport, Transport};

/// How an open stream ended.
#[derive(Debug)]
enum StreamEnd {
    /// Server closed the stream
    Closed,
    /// Transport reported an error
    Failed(String),
    /// The run was superseded while reading
    Cancelled,
}

pub struct ConnectionController {
    config: StreamConfig,
    transport: Arc<dyn Transport>,
    store: Arc<StateStore>,
    policy: ReconnectPolicy,
    session_id: Option<String>,
    driver: Option<JoinHandle<()>>,
}

impl ConnectionController {
    pub fn new(config: StreamConfig) -> Self {
        let transport = SseTransport::new().with_capacity(config.channel_capacity);
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: StreamConfig, transport: Arc<dyn Transport>) -> Self {
        let policy = config.reconnect_policy();
        let store = Arc::new(StateStore::new(config.clone()));
        Self {
            config,
            transport,
            store,
            policy,
            session_id: None,
            driver: None,
        }
    }

    /// Open the stream for `session_id`, superseding any previous run.
    ///
    /// A different session id starts from empty state. Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.teardown();

        if self.session_id.as_deref() != Some(session_id.as_str()) {
            info!(session_id = %session_id, "Starting new session view");
            self.store.reset(&session_id);
        }
        self.session_id = Some(session_id.clone());
        self.spawn_driver(session_id);
    }

    /// Close the stream and cancel any pending reconnection.
    pub fn stop(&mut self) {
        if self.teardown() {
            info!(session_id = ?self.session_id, "Session stream stopped");
            self.store.set_disconnected();
        }
    }

    /// Tear down and reconnect immediately with a fresh attempt budget.
    pub fn reconnect(&mut self) {
        let Some(session_id) = self.session_id.clone() else {
            warn!("Reconnect requested before any session was started");
            return;
        };

        self.teardown();
        info!(session_id = %session_id, "Manual reconnect");
        self.store.clear_error();
        self.spawn_driver(session_id);
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.store.subscribe()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether a driver is still connecting, reading or waiting to retry.
    pub fn is_running(&self) -> bool {
        self.driver
            .as_ref()
            .is_some_and(|driver| !driver.is_finished())
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn spawn_driver(&mut self, session_id: String) {
        let run = DriverRun {
            url: self.config.session_url(&session_id),
            session_id,
            transport: Arc::clone(&self.transport),
            policy: self.policy,
            lease: self.store.begin_run(),
        };

        run.lease.set_connecting();
        self.driver = Some(tokio::spawn(run.drive()));
    }

    /// Returns whether a driver was running.
    fn teardown(&mut self) -> bool {
        // Revoke first so a driver mid-poll cannot write again.
        self.store.revoke_runs();
        match self.driver.take() {
            Some(driver) => {
                driver.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for ConnectionController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ConnectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionController")
            .field("session_id", &self.session_id)
            .field("running", &self.is_running())
            .field("policy", &self.policy)
            .finish()
    }
}

struct DriverRun {
    session_id: String,
    url: String,
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    lease: RunLease,
}

impl DriverRun {
    async fn drive(self) {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            if !self.lease.set_connecting() {
                return;
            }
            info!(session_id = %self.session_id, url = %self.url, attempt, "Opening session stream");

            let end = match self.transport.connect(&self.url).await {
                Ok(mut frames) => {
                    if !self.lease.set_connected() {
                        return;
                    }
                    info!(session_id = %self.session_id, "Session stream open");
                    attempt = 0;
                    self.pump(&mut frames).await
                }
                Err(e) => StreamEnd::Failed(e.to_string()),
            };

            if matches!(end, StreamEnd::Cancelled) {
                return;
            }

            if self.lease.is_completed() {
                info!(session_id = %self.session_id, "Session stream finished after completion");
                self.lease.set_disconnected();
                return;
            }

            attempt += 1;
            match self.policy.next_delay(attempt) {
                Some(delay) => {
                    if !self.lease.set_retrying(attempt, max_attempts) {
                        return;
                    }
                    warn!(
                        session_id = %self.session_id,
                        reason = ?end,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Session stream lost, scheduling reconnect"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    if self.lease.set_exhausted(max_attempts) {
                        error!(
                            session_id = %self.session_id,
                            reason = ?end,
                            max_attempts,
                            "Giving up on session stream"
                        );
                    }
                    return;
                }
            }
        }
    }

    async fn pump(&self, frames: &mut FrameReceiver) -> StreamEnd {
        let end = loop {
            match frames.next_frame().await {
                Some(Ok(raw)) => {
                    if !self.lease.handle_frame(&raw) {
                        break StreamEnd::Cancelled;
                    }
                }
                Some(Err(e)) => break StreamEnd::Failed(e.to_string()),
                None => break StreamEnd::Closed,
            }
        };
        frames.close();
        end
    }
}
