//! # kcriff-client
//!
//! Typed access to a KC-Riff backend. [`ModelClient`] issues the seven capability calls
//! through whichever transport was selected and turns the raw replies into domain types.
//!
//! ```no_run
//! use kcriff_client::ModelClient;
//! use kcriff_core::config::TransportConfig;
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ModelClient::connect(TransportConfig::default()).await?;
//!
//!     client.list_models().await?;
//!     for model in client.recommended_models() {
//!         println!("{} ({} bytes)", model.name, model.size_bytes);
//!     }
//!     Ok(())
//! }
//! ```

mod claims;
mod client;
pub mod payload;

pub use claims::{ActiveDownloads, DownloadClaim};
pub use client::ModelClient;
