//! # kcriff
//!
//! Manage KC-Riff model artifacts from Rust.
//!
//! [`ModelManager`] picks a backend once (the native binding if one is installed, the HTTP
//! service otherwise) and exposes listing, downloads, removal, updates and health checks.
//! When no backend can be reached the manager stays usable in degraded mode: it reports
//! itself unavailable and every backend action returns
//! [`RiffError::TransportUnavailable`].
//!
//! ```no_run
//! use kcriff::{DownloadEvent, ModelManager};
//!
//! #[async_std::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = ModelManager::load().await?;
//!     if !manager.initialize().await {
//!         eprintln!("backend is not healthy");
//!     }
//!
//!     let mut session = manager.download("mistral-7b")?;
//!     while let Some(event) = session.next_event().await {
//!         match event {
//!             DownloadEvent::Progress { progress, .. } => println!("{:.1}%", progress),
//!             DownloadEvent::Finished { outcome, .. } => println!("{}", outcome),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use anyhow::Context;
use kcriff_core::manifest::{Acknowledgement, HealthStatus, Model, UpdateInfo};
use std::sync::Arc;

pub use kcriff_client::ModelClient;
pub use kcriff_core::config::{DownloadConfig, RiffConfig, TransportConfig};
pub use kcriff_core::manifest;
pub use kcriff_core::protocol::{
    BatchEvent, BatchReport, DownloadEvent, DownloadOutcome, FailureReason, MemberOutcome,
};
pub use kcriff_core::{
    BatchError, ClientError, ConfigError, DecodeError, RequestError, RiffError,
    TransportUnavailable,
};
pub use kcriff_downloads::{
    ActiveBatch, BatchDownloadCoordinator, BatchSelection, DownloadPoller, DownloadSession,
    PollerConfig, PollerHandle, PollerState,
};
pub use kcriff_transport::{StubTransport, Transport, TransportKind, TransportSelector};

pub struct ModelManager {
    client: Option<Arc<ModelClient>>,
    unavailable: Option<TransportUnavailable>,
    config: RiffConfig,
}

impl ModelManager {
    /// Loads the configuration file and environment overrides, then connects.
    pub async fn load() -> anyhow::Result<Self> {
        let config = RiffConfig::load().context("failed to load KC-Riff configuration")?;
        Ok(Self::connect(config).await)
    }

    /// Resolves the transport. Never fails: without a backend the manager is degraded.
    pub async fn connect(config: RiffConfig) -> Self {
        match ModelClient::connect(config.transport.clone()).await {
            Ok(client) => {
                log::info!(
                    "connected to KC-Riff via {:?} at {}",
                    client.transport_kind(),
                    client.transport_location()
                );
                Self::with_client(Arc::new(client), config)
            }
            Err(unavailable) => {
                log::warn!("running without a backend: {}", unavailable);
                for attempt in &unavailable.attempts {
                    log::debug!("  {}: {}", attempt.candidate, attempt.reason);
                }
                Self {
                    client: None,
                    unavailable: Some(unavailable),
                    config,
                }
            }
        }
    }

    pub fn with_client(client: Arc<ModelClient>, config: RiffConfig) -> Self {
        Self {
            client: Some(client),
            unavailable: None,
            config,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    /// Why the manager is degraded, if it is.
    pub fn unavailable_reason(&self) -> Option<&TransportUnavailable> {
        self.unavailable.as_ref()
    }

    pub fn config(&self) -> &RiffConfig {
        &self.config
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::from(&self.config.downloads)
    }

    pub fn client(&self) -> Result<&Arc<ModelClient>, RiffError> {
        match (&self.client, &self.unavailable) {
            (Some(client), _) => Ok(client),
            (None, Some(unavailable)) => Err(unavailable.clone().into()),
            (None, None) => Err(RiffError::TransportUnavailable(TransportUnavailable {
                attempts: Vec::new(),
                endpoint: self.config.transport.endpoint.clone(),
                endpoint_reason: "not connected".to_string(),
            })),
        }
    }

    /// True when the backend answers its health check as healthy.
    pub async fn initialize(&self) -> bool {
        match self.health_check().await {
            Ok(health) if health.is_healthy() => true,
            Ok(health) => {
                log::warn!("backend reports {:?}", health.state);
                false
            }
            Err(e) => {
                log::warn!("health check failed: {}", e);
                false
            }
        }
    }

    pub async fn refresh_models(&self) -> Result<Vec<Model>, RiffError> {
        Ok(self.client()?.list_models().await?)
    }

    /// Recommended models from the last refresh. Empty when degraded.
    pub fn recommended_models(&self) -> Vec<Model> {
        self.client
            .as_ref()
            .map(|c| c.recommended_models())
            .unwrap_or_default()
    }

    pub fn downloaded_models(&self) -> Vec<Model> {
        self.client
            .as_ref()
            .map(|c| c.downloaded_models())
            .unwrap_or_default()
    }

    /// Starts downloading `name` on a background task.
    pub fn download(&self, name: &str) -> Result<DownloadSession, RiffError> {
        let client = Arc::clone(self.client()?);
        Ok(DownloadPoller::new(client, name, self.poller_config()).spawn())
    }

    pub async fn download_batch(&self, selection: BatchSelection) -> Result<ActiveBatch, RiffError> {
        let client = Arc::clone(self.client()?);
        let batch = BatchDownloadCoordinator::new(client, selection, self.poller_config()).await?;
        Ok(batch.start().await)
    }

    pub async fn remove_model(&self, name: &str) -> Result<Acknowledgement, RiffError> {
        Ok(self.client()?.remove_model(name).await?)
    }

    pub async fn check_for_updates(&self) -> Result<UpdateInfo, RiffError> {
        Ok(self.client()?.check_for_updates().await?)
    }

    pub async fn apply_update(&self) -> Result<Acknowledgement, RiffError> {
        Ok(self.client()?.apply_update().await?)
    }

    pub async fn health_check(&self) -> Result<HealthStatus, RiffError> {
        Ok(self.client()?.health_check().await?)
    }
}
