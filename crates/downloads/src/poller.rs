use crate::progress::{PollGate, ProgressCell};
use async_std::task::{self, JoinHandle};
use futures::channel::mpsc;
use futures::StreamExt;
use futures_timer::Delay;
use kcriff_client::{DownloadClaim, ModelClient};
use kcriff_core::config::DownloadConfig;
use kcriff_core::manifest::DownloadState;
use kcriff_core::protocol::{DownloadEvent, DownloadOutcome, FailureReason};
use kcriff_core::ClientError;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Requested,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl PollerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollerState::Completed
                | PollerState::Failed
                | PollerState::TimedOut
                | PollerState::Cancelled
        )
    }

    fn of(outcome: &DownloadOutcome) -> Self {
        match outcome {
            DownloadOutcome::Completed(_) => PollerState::Completed,
            DownloadOutcome::Failed(_) => PollerState::Failed,
            DownloadOutcome::TimedOut { .. } => PollerState::TimedOut,
            DownloadOutcome::Cancelled => PollerState::Cancelled,
        }
    }
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollerState::Idle => "idle",
            PollerState::Requested => "requested",
            PollerState::Polling => "polling",
            PollerState::Completed => "completed",
            PollerState::Failed => "failed",
            PollerState::TimedOut => "timed out",
            PollerState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Measured from `start()`
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        (&DownloadConfig::default()).into()
    }
}

impl From<&DownloadConfig> for PollerConfig {
    fn from(config: &DownloadConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.timeout(),
        }
    }
}

struct Shared {
    gate: PollGate,
    progress: ProgressCell,
    state: Mutex<PollerState>,
    wake: mpsc::UnboundedSender<()>,
}

impl Shared {
    fn state(&self) -> PollerState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: PollerState) {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !guard.is_terminal() {
            *guard = next;
        }
    }
}

/// Observer and stop switch for a poller, usable from any task.
#[derive(Clone)]
pub struct PollerHandle {
    model: Arc<str>,
    shared: Arc<Shared>,
}

impl PollerHandle {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn state(&self) -> PollerState {
        self.shared.state()
    }

    /// Latest progress the poller observed, 0 before the first reading.
    pub fn progress(&self) -> f64 {
        self.shared.progress.get()
    }

    /// Cooperative stop. No status call begins after this returns; a call already in
    /// flight finishes and its result is thrown away.
    pub fn stop(&self) {
        if self.shared.state().is_terminal() {
            return;
        }
        let was_in_flight = self.shared.gate.stop();
        log::info!(
            "stopping download of {}{}",
            self.model,
            if was_in_flight { " (discarding in-flight poll)" } else { "" }
        );
        let _ = self.shared.wake.unbounded_send(());
    }
}

/// Drives one model's download to a terminal state by polling its status.
pub struct DownloadPoller {
    client: Arc<ModelClient>,
    model: String,
    config: PollerConfig,
    shared: Arc<Shared>,
    wake: mpsc::UnboundedReceiver<()>,
    started_at: Option<Instant>,
    claim: Option<DownloadClaim>,
    outcome: Option<DownloadOutcome>,
}

impl DownloadPoller {
    pub fn new(client: Arc<ModelClient>, model: impl Into<String>, config: PollerConfig) -> Self {
        let (wake_tx, wake_rx) = mpsc::unbounded();
        Self {
            client,
            model: model.into(),
            config,
            shared: Arc::new(Shared {
                gate: PollGate::new(),
                progress: ProgressCell::new(),
                state: Mutex::new(PollerState::Idle),
                wake: wake_tx,
            }),
            wake: wake_rx,
            started_at: None,
            claim: None,
            outcome: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn state(&self) -> PollerState {
        self.shared.state()
    }

    pub fn handle(&self) -> PollerHandle {
        PollerHandle {
            model: Arc::from(self.model.as_str()),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn stop(&self) {
        self.handle().stop();
    }

    /// Requests the download from the backend. Only acts on an idle poller.
    ///
    /// Any failure here is final: the poller moves straight to `Failed` and never polls.
    pub async fn start(&mut self) -> Result<(), FailureReason> {
        if self.state() != PollerState::Idle {
            return match &self.outcome {
                Some(DownloadOutcome::Failed(reason)) => Err(reason.clone()),
                _ => Ok(()),
            };
        }

        self.started_at = Some(Instant::now());
        if self.shared.gate.is_stopped() {
            self.conclude(DownloadOutcome::Cancelled);
            return Ok(());
        }

        match self.client.claim_download(&self.model) {
            Some(claim) => self.claim = Some(claim),
            None => {
                log::warn!("{} is already being downloaded", self.model);
                return self.fail(FailureReason::AlreadyActive);
            }
        }

        self.shared.set_state(PollerState::Requested);
        match self.client.start_download(&self.model).await {
            Ok(ack) => {
                log::info!(
                    "download of {} accepted ({})",
                    self.model,
                    ack.status.as_deref().unwrap_or("no status")
                );
                self.shared.set_state(PollerState::Polling);
                Ok(())
            }
            Err(e) => {
                log::warn!("download of {} rejected: {}", self.model, e);
                let reason = match e {
                    ClientError::Remote(msg) => FailureReason::Rejected(msg),
                    other => FailureReason::Rejected(other.to_string()),
                };
                self.fail(reason)
            }
        }
    }

    /// Runs the poller to completion, starting it first if needed. `Finished` is always the
    /// last event sent on `events`.
    pub async fn run(mut self, events: mpsc::UnboundedSender<DownloadEvent>) -> DownloadOutcome {
        if self.state() == PollerState::Idle {
            let _ = self.start().await;
        }

        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => self.poll(&events).await,
        };

        self.conclude(outcome.clone());
        let _ = events.unbounded_send(DownloadEvent::Finished {
            model: self.model.clone(),
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Runs the poller on its own task.
    pub fn spawn(self) -> DownloadSession {
        let handle = self.handle();
        let (tx, rx) = mpsc::unbounded();
        let task = task::spawn(self.run(tx));
        DownloadSession {
            handle,
            events: rx,
            task,
        }
    }

    async fn poll(&mut self, events: &mpsc::UnboundedSender<DownloadEvent>) -> DownloadOutcome {
        let started = self.started_at.unwrap_or_else(Instant::now);
        // A timeout too large to represent never expires.
        let deadline = started.checked_add(self.config.timeout);
        let mut last_sent: Option<f64> = None;
        let mut delivered: HashSet<u64> = HashSet::new();

        loop {
            if self.shared.gate.is_stopped() {
                return DownloadOutcome::Cancelled;
            }
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                log::warn!(
                    "download of {} timed out after {:?}",
                    self.model,
                    self.config.timeout
                );
                return DownloadOutcome::TimedOut {
                    after: self.config.timeout,
                    last_progress: last_sent,
                };
            }

            if !self.shared.gate.begin() {
                return DownloadOutcome::Cancelled;
            }
            let result = self.client.get_download_status(&self.model).await;
            if !self.shared.gate.finish() {
                log::debug!("discarding status of {} received after stop", self.model);
                return DownloadOutcome::Cancelled;
            }

            match result {
                Ok(status) => {
                    if status.completed || status.state == DownloadState::Completed {
                        self.shared.progress.set(status.progress);
                        log::info!(
                            "download of {} completed at {:.1}%",
                            self.model,
                            status.progress
                        );
                        return DownloadOutcome::Completed(status);
                    }
                    if matches!(status.state, DownloadState::Failed | DownloadState::Timeout) {
                        return DownloadOutcome::Failed(FailureReason::Remote(format!(
                            "backend reported status {}",
                            status.state.as_str()
                        )));
                    }
                    // A value is delivered once, even if the backend moves back to it.
                    if delivered.insert(status.progress.to_bits()) {
                        last_sent = Some(status.progress);
                        self.shared.progress.set(status.progress);
                        let event = DownloadEvent::Progress {
                            model: self.model.clone(),
                            progress: status.progress,
                        };
                        if events.unbounded_send(event).is_err() {
                            log::debug!("nobody is listening to {} progress", self.model);
                        }
                    }
                }
                Err(ClientError::Remote(msg)) => {
                    log::warn!("download of {} failed: {}", self.model, msg);
                    return DownloadOutcome::Failed(FailureReason::Remote(msg));
                }
                Err(e) => {
                    log::warn!("status poll for {} failed, retrying: {}", self.model, e);
                }
            }

            let nap = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        continue;
                    }
                    self.config.interval.min(remaining)
                }
                None => self.config.interval,
            };
            futures::future::select(Delay::new(nap), self.wake.next()).await;
        }
    }

    fn fail(&mut self, reason: FailureReason) -> Result<(), FailureReason> {
        self.conclude(DownloadOutcome::Failed(reason.clone()));
        Err(reason)
    }

    fn conclude(&mut self, outcome: DownloadOutcome) {
        self.shared.set_state(PollerState::of(&outcome));
        self.claim = None;
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }
}

/// A poller running on its own task, with its event stream.
pub struct DownloadSession {
    handle: PollerHandle,
    events: mpsc::UnboundedReceiver<DownloadEvent>,
    task: JoinHandle<DownloadOutcome>,
}

impl DownloadSession {
    pub fn handle(&self) -> &PollerHandle {
        &self.handle
    }

    pub fn model(&self) -> &str {
        self.handle.model()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.next().await
    }

    /// Waits for the terminal outcome, dropping any events not yet read.
    pub async fn wait(self) -> DownloadOutcome {
        self.task.await
    }
}
