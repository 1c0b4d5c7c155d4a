use serde::{Deserialize, Serialize};

/// A model the backend knows about. Snapshots are replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub description: String,
    pub size_bytes: u64,
    pub parameter_count: u64,
    pub downloaded: bool,
    pub recommended: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    Pending,
    Downloading,
    Completed,
    Failed,
    Timeout,
}

impl DownloadState {
    /// Maps the backend's status string, including the spellings older servers use.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "not_started" | "queued" => Some(Self::Pending),
            "downloading" | "in_progress" => Some(Self::Downloading),
            "completed" | "complete" | "done" => Some(Self::Completed),
            "failed" | "error" | "cancelled" => Some(Self::Failed),
            "timeout" | "timed_out" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

/// One status reading for a download. Valid for a single poll cycle only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadStatus {
    pub model_name: String,
    /// Percentage in `0..=100`. Backends do not promise monotonic values.
    pub progress: f64,
    pub completed: bool,
    pub state: DownloadState,
    /// Always `None` on a status decoded from a backend reply: a non-empty `error` field
    /// fails the decode with `ClientError::Remote` instead. Kept for statuses built by hand
    /// and for serialised snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub available: bool,
    pub current_version: Option<String>,
    pub new_version: Option<String>,
    pub release_notes: Option<String>,
    pub download_url: Option<String>,
}

/// Reply to the commands that only acknowledge receipt: start-download, remove-model
/// and apply-update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub status: Option<String>,
    pub message: Option<String>,
    pub model: Option<String>,
    pub from_version: Option<String>,
    pub to_version: Option<String>,
}
