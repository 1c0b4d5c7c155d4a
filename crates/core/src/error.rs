use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A single backend call failed below the payload level.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("native binding error: {0}")]
    Binding(String),
    #[error("no reply from {0}")]
    NoReply(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// The payload did not have the expected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not decode {entity}: {message}")]
pub struct DecodeError {
    pub entity: &'static str,
    pub message: String,
}

impl DecodeError {
    pub fn new(entity: &'static str, message: impl Into<String>) -> Self {
        Self {
            entity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A well-formed reply whose `error` field was set
    #[error("backend reported an error: {0}")]
    Remote(String),
}

impl ClientError {
    /// Glitches a poll loop may ride out. A remote error is the backend's final word.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ClientError::Remote(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub candidate: String,
    pub reason: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "no usable transport: {} native candidate(s) rejected, endpoint {endpoint} unusable ({endpoint_reason})",
    .attempts.len()
)]
pub struct TransportUnavailable {
    pub attempts: Vec<RejectedCandidate>,
    pub endpoint: String,
    pub endpoint_reason: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BatchError {
    #[error("no models selected for download")]
    Empty,
    #[error("could not list models for the batch: {0}")]
    Listing(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum RiffError {
    #[error(transparent)]
    TransportUnavailable(#[from] TransportUnavailable),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_remote_errors_are_final() {
        assert!(ClientError::Request(RequestError::Network("reset".into())).is_transient());
        assert!(ClientError::Decode(DecodeError::new("status", "eof")).is_transient());
        assert!(!ClientError::Remote("disk full".into()).is_transient());
    }

    #[test]
    fn unavailable_message_counts_candidates() {
        let err = TransportUnavailable {
            attempts: vec![RejectedCandidate {
                candidate: "/usr/lib/libkcriff.so".into(),
                reason: "not found".into(),
            }],
            endpoint: "http://localhost:5000".into(),
            endpoint_reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1 native candidate(s)"));
        assert!(msg.contains("connection refused"));
    }
}
