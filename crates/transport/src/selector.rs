use crate::backend::{library_file_name, HttpTransport, NativeTransport};
use crate::Transport;
use kcriff_core::config::TransportConfig;
use kcriff_core::{RejectedCandidate, TransportUnavailable};
use std::path::PathBuf;
use std::sync::Arc;

/// Picks the backend: the first native binding that exposes every entry point, otherwise
/// the configured HTTP endpoint.
pub struct TransportSelector {
    config: TransportConfig,
}

impl TransportSelector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Native library candidates in priority order: configured paths first, then the
    /// well-known install locations.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = self.config.library_paths.clone();
        if self.config.search_default_paths {
            candidates.extend(default_locations());
        }

        let mut seen = Vec::with_capacity(candidates.len());
        candidates.retain(|path| {
            if seen.contains(path) {
                false
            } else {
                seen.push(path.clone());
                true
            }
        });
        candidates
    }

    pub async fn resolve(&self) -> Result<Arc<dyn Transport>, TransportUnavailable> {
        let mut attempts = Vec::new();

        for path in self.candidates() {
            match NativeTransport::load(&path) {
                Ok(native) => {
                    log::info!("using native binding {}", path.display());
                    return Ok(Arc::new(native));
                }
                Err(err) => {
                    log::debug!("skipping {}: {}", path.display(), err);
                    attempts.push(RejectedCandidate {
                        candidate: path.display().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let endpoint = self.config.endpoint.clone();
        let unavailable = |attempts: Vec<RejectedCandidate>, reason: String| TransportUnavailable {
            attempts,
            endpoint: endpoint.clone(),
            endpoint_reason: reason,
        };

        let http = match HttpTransport::new(&endpoint, self.config.request_timeout()) {
            Ok(http) => http,
            Err(err) => return Err(unavailable(attempts, err.to_string())),
        };

        if self.config.probe_endpoint {
            if let Err(err) = http.probe().await {
                log::warn!("endpoint {} is not reachable: {}", endpoint, err);
                return Err(unavailable(attempts, err.to_string()));
            }
        }

        log::info!(
            "no native binding among {} candidate(s), using endpoint {}",
            attempts.len(),
            endpoint
        );
        Ok(Arc::new(http))
    }
}

fn default_locations() -> Vec<PathBuf> {
    let file = library_file_name();
    let mut locations = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        locations.push(cwd.join(file));
        locations.push(cwd.join("build").join(file));
    }
    if cfg!(unix) {
        locations.push(PathBuf::from("/usr/lib").join(file));
        locations.push(PathBuf::from("/usr/local/lib").join(file));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
    {
        locations.push(exe_dir.join("lib").join(file));
    }
    if cfg!(windows) {
        let root = std::env::var("SYSTEMROOT").unwrap_or_else(|_| "C:\\Windows".to_string());
        locations.push(PathBuf::from(root).join("System32").join(file));
    }

    locations
}
