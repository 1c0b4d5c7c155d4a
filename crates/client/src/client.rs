use crate::claims::{ActiveDownloads, DownloadClaim};
use crate::payload;
use kcriff_core::config::TransportConfig;
use kcriff_core::manifest::{Acknowledgement, DownloadStatus, HealthStatus, Model, UpdateInfo};
use kcriff_core::{ClientError, TransportUnavailable};
use kcriff_transport::{Call, Transport, TransportKind, TransportSelector};
use std::sync::{Arc, RwLock};

/// Typed access to the seven backend operations over one transport.
///
/// The transport is fixed for the client's lifetime. The client also remembers the last
/// model listing for the derived views and keeps track of which models have a poller.
pub struct ModelClient {
    transport: Arc<dyn Transport>,
    snapshot: RwLock<Vec<Model>>,
    active: ActiveDownloads,
}

impl ModelClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            snapshot: RwLock::new(Vec::new()),
            active: ActiveDownloads::default(),
        }
    }

    /// Resolves a transport once and wraps it.
    pub async fn connect(config: TransportConfig) -> Result<Self, TransportUnavailable> {
        let transport = TransportSelector::new(config).resolve().await?;
        Ok(Self::new(transport))
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn transport_location(&self) -> String {
        self.transport.location()
    }

    /// Fetches the catalogue and replaces the cached snapshot.
    pub async fn list_models(&self) -> Result<Vec<Model>, ClientError> {
        let reply = self.request(Call::ListModels).await?;
        let models = payload::models(&reply)?;
        log::debug!("backend lists {} model(s)", models.len());

        match self.snapshot.write() {
            Ok(mut guard) => *guard = models.clone(),
            Err(poisoned) => *poisoned.into_inner() = models.clone(),
        }
        Ok(models)
    }

    pub async fn start_download(&self, name: &str) -> Result<Acknowledgement, ClientError> {
        let reply = self.request(Call::StartDownload(name.to_string())).await?;
        payload::acknowledgement("download acknowledgement", &reply)
    }

    pub async fn get_download_status(&self, name: &str) -> Result<DownloadStatus, ClientError> {
        let reply = self.request(Call::GetDownloadStatus(name.to_string())).await?;
        payload::download_status(name, &reply)
    }

    pub async fn remove_model(&self, name: &str) -> Result<Acknowledgement, ClientError> {
        let reply = self.request(Call::RemoveModel(name.to_string())).await?;
        payload::acknowledgement("remove acknowledgement", &reply)
    }

    pub async fn check_for_updates(&self) -> Result<UpdateInfo, ClientError> {
        let reply = self.request(Call::CheckForUpdates).await?;
        payload::update_info(&reply)
    }

    pub async fn apply_update(&self) -> Result<Acknowledgement, ClientError> {
        let reply = self.request(Call::ApplyUpdate).await?;
        payload::acknowledgement("update acknowledgement", &reply)
    }

    pub async fn health_check(&self) -> Result<HealthStatus, ClientError> {
        let reply = self.request(Call::HealthCheck).await?;
        payload::health(&reply)
    }

    /// The snapshot taken by the last successful [`list_models`](Self::list_models).
    pub fn cached_models(&self) -> Vec<Model> {
        self.filtered(|_| true)
    }

    pub fn recommended_models(&self) -> Vec<Model> {
        self.filtered(|m| m.recommended)
    }

    pub fn downloaded_models(&self) -> Vec<Model> {
        self.filtered(|m| m.downloaded)
    }

    /// Reserves `name` for a poller. `None` while another poller holds it.
    pub fn claim_download(&self, name: &str) -> Option<DownloadClaim> {
        self.active.claim(name)
    }

    pub fn is_downloading(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    pub fn active_downloads(&self) -> Vec<String> {
        self.active.names()
    }

    async fn request(&self, call: Call) -> Result<String, ClientError> {
        let capability = call.capability();
        match self.transport.call(call).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                log::debug!("{} failed: {}", capability, e);
                Err(e.into())
            }
        }
    }

    fn filtered(&self, keep: impl Fn(&Model) -> bool) -> Vec<Model> {
        let snapshot = match self.snapshot.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        snapshot.iter().filter(|m| keep(m)).cloned().collect()
    }
}
