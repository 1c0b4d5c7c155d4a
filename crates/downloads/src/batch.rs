use crate::poller::{DownloadPoller, PollerConfig, PollerHandle};
use async_std::task::{self, JoinHandle};
use futures::channel::mpsc;
use futures::stream::{BoxStream, SelectAll};
use futures::StreamExt;
use kcriff_client::ModelClient;
use kcriff_core::protocol::{
    BatchEvent, BatchReport, DownloadEvent, DownloadOutcome, FailureReason, MemberOutcome,
};
use kcriff_core::BatchError;
use std::sync::Arc;

/// Which models a batch downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSelection {
    Names(Vec<String>),
    /// The recommended models of a fresh listing, taken once when the batch is planned
    Recommended,
}

/// A planned batch with a fixed member set. Nothing has been requested yet.
pub struct BatchDownloadCoordinator {
    client: Arc<ModelClient>,
    members: Vec<String>,
    config: PollerConfig,
}

impl BatchDownloadCoordinator {
    pub async fn new(
        client: Arc<ModelClient>,
        selection: BatchSelection,
        config: PollerConfig,
    ) -> Result<Self, BatchError> {
        let names = match selection {
            BatchSelection::Names(names) => names,
            BatchSelection::Recommended => client
                .list_models()
                .await?
                .into_iter()
                .filter(|m| m.recommended)
                .map(|m| m.name)
                .collect(),
        };

        let mut members: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if !name.is_empty() && !members.iter().any(|m| m == name) {
                members.push(name.to_string());
            }
        }
        if members.is_empty() {
            return Err(BatchError::Empty);
        }

        Ok(Self {
            client,
            members,
            config,
        })
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Requests every member in order, then lets all of them poll concurrently.
    pub async fn start(self) -> ActiveBatch {
        let mut pollers: Vec<DownloadPoller> = self
            .members
            .iter()
            .map(|name| DownloadPoller::new(Arc::clone(&self.client), name.clone(), self.config))
            .collect();
        let handles: Vec<PollerHandle> = pollers.iter().map(DownloadPoller::handle).collect();

        for poller in pollers.iter_mut() {
            if let Err(reason) = poller.start().await {
                log::warn!("{} will not be downloaded: {}", poller.model(), reason);
            }
        }

        let mut merged: SelectAll<BoxStream<'static, (usize, DownloadEvent)>> = SelectAll::new();
        for (index, poller) in pollers.into_iter().enumerate() {
            let (tx, rx) = mpsc::unbounded();
            task::spawn(poller.run(tx));
            merged.push(rx.map(move |event| (index, event)).boxed());
        }

        log::info!("batch of {} download(s) started", self.members.len());
        let (tx, rx) = mpsc::unbounded();
        let driver = task::spawn(drive(
            self.members.clone(),
            handles.clone(),
            merged,
            tx,
        ));

        ActiveBatch {
            members: self.members,
            handles,
            events: rx,
            driver,
        }
    }
}

/// A running batch.
pub struct ActiveBatch {
    members: Vec<String>,
    handles: Vec<PollerHandle>,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    driver: JoinHandle<BatchReport>,
}

impl ActiveBatch {
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn handles(&self) -> &[PollerHandle] {
        &self.handles
    }

    /// Mean of every member's latest progress; members with no reading count as 0.
    pub fn overall_progress(&self) -> f64 {
        mean(self.handles.iter().map(PollerHandle::progress))
    }

    /// Stops every member that is still running.
    pub fn stop(&self) {
        for handle in self.handles.iter().filter(|h| !h.state().is_terminal()) {
            handle.stop();
        }
    }

    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.next().await
    }

    /// Waits until every member is terminal.
    pub async fn wait(self) -> BatchReport {
        self.driver.await
    }
}

async fn drive(
    members: Vec<String>,
    handles: Vec<PollerHandle>,
    mut merged: SelectAll<BoxStream<'static, (usize, DownloadEvent)>>,
    events: mpsc::UnboundedSender<BatchEvent>,
) -> BatchReport {
    let mut latest = vec![0.0; members.len()];
    let mut outcomes: Vec<Option<DownloadOutcome>> = vec![None; members.len()];
    let mut remaining = members.len();

    while remaining > 0 {
        let (index, event) = match merged.next().await {
            Some(next) => next,
            None => break,
        };

        match event {
            DownloadEvent::Progress { model, progress } => {
                latest[index] = progress;
                let overall = mean(latest.iter().copied());
                let _ = events.unbounded_send(BatchEvent::Progress {
                    model,
                    progress,
                    overall,
                });
            }
            DownloadEvent::Finished { model, outcome } => {
                // Completion may carry a reading the member never reported as progress.
                let last = handles[index].progress();
                if last != latest[index] {
                    latest[index] = last;
                    let _ = events.unbounded_send(BatchEvent::Progress {
                        model: model.clone(),
                        progress: last,
                        overall: mean(latest.iter().copied()),
                    });
                }

                log::info!("{}: {}", model, outcome);
                if outcomes[index].is_none() {
                    remaining -= 1;
                }
                outcomes[index] = Some(outcome.clone());
                let _ = events.unbounded_send(BatchEvent::MemberFinished { model, outcome });
            }
        }
    }

    let report = BatchReport {
        outcomes: members
            .into_iter()
            .zip(outcomes)
            .map(|(model, outcome)| MemberOutcome {
                model,
                outcome: outcome.unwrap_or_else(|| {
                    DownloadOutcome::Failed(FailureReason::Remote(
                        "download task ended without a result".to_string(),
                    ))
                }),
            })
            .collect(),
    };

    log::info!(
        "batch finished: {} succeeded, {} failed, {} cancelled",
        report.succeeded().len(),
        report.failed().len(),
        report.cancelled().len()
    );
    let _ = events.unbounded_send(BatchEvent::Finished(report.clone()));
    report
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
