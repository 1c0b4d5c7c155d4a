use crate::{Call, Capability, Transport, TransportKind};
use async_std::task;
use async_trait::async_trait;
use kcriff_core::RequestError;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub type Reply = Result<String, RequestError>;

const SIMULATED_STEP: u32 = 20;

/// Status payload in the shape the HTTP service sends.
pub fn status_payload(model: &str, progress: f64, completed: bool) -> String {
    let status = if completed { "completed" } else { "downloading" };
    json!({
        "model_name": model,
        "progress": progress,
        "completed": completed,
        "status": status,
    })
    .to_string()
}

pub fn error_payload(message: &str) -> String {
    json!({ "error": message }).to_string()
}

#[derive(Default)]
struct StubState {
    models: Option<String>,
    start_replies: HashMap<String, Reply>,
    scripts: HashMap<String, VecDeque<Reply>>,
    last_status: HashMap<String, Reply>,
    simulated: HashMap<String, u32>,
    health: Option<Reply>,
    updates: Option<Reply>,
    apply: Option<Reply>,
    calls: Vec<Call>,
}

/// In-memory backend with scripted replies.
///
/// Status scripts are consumed one reply per call and the last reply repeats once a script
/// runs out. A model that was started but has no script simulates a download that advances
/// 20 points per status call.
#[derive(Default)]
pub struct StubTransport {
    state: Mutex<StubState>,
    latency: Duration,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload returned by list-models
    pub fn with_models(self, payload: impl Into<String>) -> Self {
        self.lock().models = Some(payload.into());
        self
    }

    pub fn with_start_reply(self, model: &str, reply: Reply) -> Self {
        self.lock().start_replies.insert(model.to_string(), reply);
        self
    }

    pub fn with_statuses<I>(self, model: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        self.lock()
            .scripts
            .insert(model.to_string(), replies.into_iter().collect());
        self
    }

    pub fn with_health(self, reply: Reply) -> Self {
        self.lock().health = Some(reply);
        self
    }

    pub fn with_updates(self, reply: Reply) -> Self {
        self.lock().updates = Some(reply);
        self
    }

    pub fn with_apply_reply(self, reply: Reply) -> Self {
        self.lock().apply = Some(reply);
        self
    }

    /// Delay applied to every call before it answers
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every call received so far, in arrival order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, capability: Capability, model: Option<&str>) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.capability() == capability && (model.is_none() || c.model() == model))
            .count()
    }

    pub fn status_calls(&self, model: &str) -> usize {
        self.call_count(Capability::GetDownloadStatus, Some(model))
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn answer(&self, call: &Call) -> Reply {
        let mut state = self.lock();
        match call {
            Call::ListModels => Ok(state.models.clone().unwrap_or_else(|| "[]".to_string())),
            Call::StartDownload(name) => {
                let reply = state.start_replies.get(name).cloned().unwrap_or_else(|| {
                    Ok(json!({ "status": "downloading", "model": name }).to_string())
                });
                if reply.is_ok() {
                    state.simulated.entry(name.clone()).or_insert(0);
                }
                reply
            }
            Call::GetDownloadStatus(name) => state.next_status(name),
            Call::RemoveModel(name) => {
                state.simulated.remove(name);
                Ok(json!({ "status": "removed", "model": name }).to_string())
            }
            Call::CheckForUpdates => state.updates.clone().unwrap_or_else(|| {
                Ok(json!({ "available": false, "current_version": "0.1.0" }).to_string())
            }),
            Call::ApplyUpdate => state
                .apply
                .clone()
                .unwrap_or_else(|| Ok(error_payload("No update available"))),
            Call::HealthCheck => state.health.clone().unwrap_or_else(|| {
                Ok(json!({ "status": "healthy", "version": "0.1.0" }).to_string())
            }),
        }
    }
}

impl StubState {
    fn next_status(&mut self, name: &str) -> Reply {
        if let Some(script) = self.scripts.get_mut(name) {
            if let Some(reply) = script.pop_front() {
                self.last_status.insert(name.to_string(), reply.clone());
                return reply;
            }
            if let Some(last) = self.last_status.get(name) {
                return last.clone();
            }
        }

        match self.simulated.get_mut(name) {
            Some(step) => {
                let progress = (*step * SIMULATED_STEP).min(100);
                *step += 1;
                Ok(status_payload(name, f64::from(progress), progress >= 100))
            }
            None => Ok(error_payload("Model not found or not being downloaded")),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::InMemory
    }

    fn location(&self) -> String {
        "memory://stub".to_string()
    }

    async fn call(&self, call: Call) -> Result<String, RequestError> {
        self.lock().calls.push(call.clone());
        if !self.latency.is_zero() {
            task::sleep(self.latency).await;
        }
        self.answer(&call)
    }
}
