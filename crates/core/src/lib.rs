//! Shared vocabulary of the KC-Riff client: domain types, the events that download
//! tasks emit, the error taxonomy and the configuration file.

pub mod config;
pub mod error;
pub mod manifest;
pub mod protocol;

pub use config::RiffConfig;
pub use error::{
    BatchError, ClientError, ConfigError, DecodeError, RejectedCandidate, RequestError,
    RiffError, TransportUnavailable,
};
