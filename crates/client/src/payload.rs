//! Decoding of raw backend replies into domain types.
//!
//! Every decoder first checks the reply for an `error` field, which turns a well-formed
//! reply into [`ClientError::Remote`]. Shape problems become [`DecodeError`]s.

use kcriff_core::manifest::{
    Acknowledgement, DownloadState, DownloadStatus, HealthState, HealthStatus, Model, UpdateInfo,
};
use kcriff_core::{ClientError, DecodeError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct WireModel {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "size")]
    size_bytes: u64,
    #[serde(default, alias = "parameters")]
    parameter_count: u64,
    #[serde(default, alias = "is_downloaded")]
    downloaded: bool,
    #[serde(default, alias = "kc_recommended")]
    recommended: bool,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

impl From<WireModel> for Model {
    fn from(wire: WireModel) -> Self {
        Model {
            name: wire.name,
            description: wire.description,
            size_bytes: wire.size_bytes,
            parameter_count: wire.parameter_count,
            downloaded: wire.downloaded,
            recommended: wire.recommended,
            tags: wire.tags.unwrap_or_default(),
            category: non_empty(wire.category),
            version: non_empty(wire.version),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireModelList {
    Bare(Vec<WireModel>),
    Wrapped { models: Vec<WireModel> },
}

#[derive(Deserialize)]
struct WireStatus {
    #[serde(default, alias = "model")]
    model_name: Option<String>,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    downloaded_bytes: Option<u64>,
    #[serde(default)]
    total_bytes: Option<u64>,
}

#[derive(Deserialize)]
struct WireHealth {
    status: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct WireUpdate {
    #[serde(default)]
    available: bool,
    #[serde(default)]
    current_version: Option<String>,
    #[serde(default, alias = "latest_version")]
    new_version: Option<String>,
    #[serde(default)]
    release_notes: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

/// An empty reply means the backend has no models.
pub fn models(payload: &str) -> Result<Vec<Model>, ClientError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    let list = match decode::<WireModelList>("model list", payload)? {
        WireModelList::Bare(models) | WireModelList::Wrapped { models } => models,
    };
    Ok(list.into_iter().map(Model::from).collect())
}

/// `requested` fills in the model name when the reply leaves it out.
pub fn download_status(requested: &str, payload: &str) -> Result<DownloadStatus, ClientError> {
    let wire: WireStatus = decode("download status", payload)?;

    let state = match wire.status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => DownloadState::from_wire(s).ok_or_else(|| {
            DecodeError::new("download status", format!("unknown status {:?}", s))
        })?,
        _ if wire.completed => DownloadState::Completed,
        _ if wire.progress > 0.0 => DownloadState::Downloading,
        _ => DownloadState::Pending,
    };

    if !wire.progress.is_finite() {
        return Err(DecodeError::new("download status", "progress is not a number").into());
    }

    Ok(DownloadStatus {
        model_name: non_empty(wire.model_name).unwrap_or_else(|| requested.to_string()),
        progress: wire.progress.clamp(0.0, 100.0),
        completed: wire.completed,
        state,
        error: None,
        downloaded_bytes: wire.downloaded_bytes,
        total_bytes: wire.total_bytes,
    })
}

pub fn health(payload: &str) -> Result<HealthStatus, ClientError> {
    let wire: WireHealth = decode("health status", payload)?;
    let state = match wire.status.trim().to_ascii_lowercase().as_str() {
        "healthy" | "ok" | "up" => HealthState::Healthy,
        other => {
            log::debug!("treating health status {:?} as unhealthy", other);
            HealthState::Unhealthy
        }
    };
    Ok(HealthStatus {
        state,
        version: non_empty(wire.version),
        name: non_empty(wire.name),
    })
}

pub fn update_info(payload: &str) -> Result<UpdateInfo, ClientError> {
    let wire: WireUpdate = decode("update info", payload)?;
    Ok(UpdateInfo {
        available: wire.available,
        current_version: non_empty(wire.current_version),
        new_version: non_empty(wire.new_version),
        release_notes: non_empty(wire.release_notes),
        download_url: non_empty(wire.download_url),
    })
}

pub fn acknowledgement(
    entity: &'static str,
    payload: &str,
) -> Result<Acknowledgement, ClientError> {
    decode(entity, payload)
}

fn decode<T: DeserializeOwned>(entity: &'static str, payload: &str) -> Result<T, ClientError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::new(entity, "empty reply").into());
    }

    let value: Value =
        serde_json::from_str(payload).map_err(|e| DecodeError::new(entity, e.to_string()))?;
    if let Some(message) = remote_error(&value) {
        return Err(ClientError::Remote(message));
    }

    serde_json::from_value(value).map_err(|e| DecodeError::new(entity, e.to_string()).into())
}

fn remote_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
