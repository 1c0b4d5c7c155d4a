use async_trait::async_trait;
use kcriff_core::RequestError;
use std::fmt;

pub mod backend;
pub mod selector;

pub use backend::{BindingError, HttpTransport, InvalidEndpoint, NativeTransport, StubTransport};
pub use selector::TransportSelector;

/// One of the seven operations every backend must offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ListModels,
    StartDownload,
    GetDownloadStatus,
    RemoveModel,
    CheckForUpdates,
    ApplyUpdate,
    HealthCheck,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::ListModels,
        Capability::StartDownload,
        Capability::GetDownloadStatus,
        Capability::RemoveModel,
        Capability::CheckForUpdates,
        Capability::ApplyUpdate,
        Capability::HealthCheck,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::ListModels => "list-models",
            Capability::StartDownload => "start-download",
            Capability::GetDownloadStatus => "get-download-status",
            Capability::RemoveModel => "remove-model",
            Capability::CheckForUpdates => "check-for-updates",
            Capability::ApplyUpdate => "apply-update",
            Capability::HealthCheck => "health-check",
        }
    }

    /// Exported symbol names in the native binding, preferred spelling first. Builds of
    /// the binding differ on three of them.
    pub fn symbols(&self) -> &'static [&'static str] {
        match self {
            Capability::ListModels => &["GetModels"],
            Capability::StartDownload => &["StartModelDownload", "DownloadModel"],
            Capability::GetDownloadStatus => &["GetDownloadStatus"],
            Capability::RemoveModel => &["RemoveModel"],
            Capability::CheckForUpdates => &["CheckForUpdates", "CheckForUpdatesC"],
            Capability::ApplyUpdate => &["ApplyUpdate"],
            Capability::HealthCheck => &["HealthCheck", "GetHealthCheck"],
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.symbols()[0]
    }

    /// Route on the HTTP service, relative to the endpoint
    pub fn route(&self) -> &'static str {
        match self {
            Capability::ListModels => "api/models",
            Capability::StartDownload => "api/models/download",
            Capability::GetDownloadStatus => "api/models/status",
            Capability::RemoveModel => "api/models/remove",
            Capability::CheckForUpdates => "api/updates",
            Capability::ApplyUpdate => "api/updates/apply",
            Capability::HealthCheck => "api/health",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request for one capability, with its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListModels,
    StartDownload(String),
    GetDownloadStatus(String),
    RemoveModel(String),
    CheckForUpdates,
    ApplyUpdate,
    HealthCheck,
}

impl Call {
    pub fn capability(&self) -> Capability {
        match self {
            Call::ListModels => Capability::ListModels,
            Call::StartDownload(_) => Capability::StartDownload,
            Call::GetDownloadStatus(_) => Capability::GetDownloadStatus,
            Call::RemoveModel(_) => Capability::RemoveModel,
            Call::CheckForUpdates => Capability::CheckForUpdates,
            Call::ApplyUpdate => Capability::ApplyUpdate,
            Call::HealthCheck => Capability::HealthCheck,
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            Call::StartDownload(name) | Call::GetDownloadStatus(name) | Call::RemoveModel(name) => {
                Some(name)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Native,
    Http,
    InMemory,
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Library path or endpoint URL, for diagnostics
    fn location(&self) -> String;

    /// Perform a call and return the raw payload text. No decoding happens here.
    async fn call(&self, call: Call) -> Result<String, RequestError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table_is_complete() {
        let symbols: Vec<_> = Capability::ALL.iter().map(|c| c.symbol()).collect();
        assert_eq!(
            symbols,
            vec![
                "GetModels",
                "StartModelDownload",
                "GetDownloadStatus",
                "RemoveModel",
                "CheckForUpdates",
                "ApplyUpdate",
                "HealthCheck",
            ]
        );
        assert_eq!(
            Capability::StartDownload.symbols(),
            ["StartModelDownload", "DownloadModel"]
        );
        assert_eq!(Capability::HealthCheck.symbols()[1], "GetHealthCheck");
        assert_eq!(Capability::GetDownloadStatus.route(), "api/models/status");
    }

    #[test]
    fn call_carries_model_name() {
        let call = Call::RemoveModel("llava".into());
        assert_eq!(call.capability(), Capability::RemoveModel);
        assert_eq!(call.model(), Some("llava"));
        assert_eq!(Call::HealthCheck.model(), None);
    }
}
