//! # kcriff-downloads
//!
//! Drives model downloads to a terminal state.
//!
//! A [`DownloadPoller`] asks the backend to start one download and then polls its status on
//! a fixed interval, sending a [`DownloadEvent`](kcriff_core::protocol::DownloadEvent) for
//! every new progress value and a final `Finished` event. A poller ends `Completed`,
//! `Failed`, `TimedOut` or `Cancelled`; transient request and decode errors only cost
//! polling time.
//!
//! A [`BatchDownloadCoordinator`] runs one poller per model, merges their events and
//! reports the mean progress of the batch. One member failing never stops the others.
//!
//! ```no_run
//! use kcriff_client::ModelClient;
//! use kcriff_core::config::TransportConfig;
//! use kcriff_core::protocol::BatchEvent;
//! use kcriff_downloads::{BatchDownloadCoordinator, BatchSelection, PollerConfig};
//! use std::sync::Arc;
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(ModelClient::connect(TransportConfig::default()).await?);
//!     let batch = BatchDownloadCoordinator::new(
//!         client,
//!         BatchSelection::Recommended,
//!         PollerConfig::default(),
//!     )
//!     .await?;
//!
//!     let mut running = batch.start().await;
//!     while let Some(event) = running.next_event().await {
//!         if let BatchEvent::Progress { overall, .. } = event {
//!             print!("\r{:5.1}%", overall);
//!         }
//!     }
//!     let report = running.wait().await;
//!     println!("\nfailed: {:?}", report.failed());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod poller;
pub mod progress;

pub use batch::{ActiveBatch, BatchDownloadCoordinator, BatchSelection};
pub use poller::{DownloadPoller, DownloadSession, PollerConfig, PollerHandle, PollerState};
pub use progress::{PollGate, ProgressCell};
