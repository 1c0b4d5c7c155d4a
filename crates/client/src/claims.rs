use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Names of the models that currently have a poller.
#[derive(Clone, Default)]
pub struct ActiveDownloads {
    names: Arc<Mutex<HashSet<String>>>,
}

impl ActiveDownloads {
    /// Reserves `model`, or returns `None` when someone already holds it.
    pub fn claim(&self, model: &str) -> Option<DownloadClaim> {
        if !self.lock().insert(model.to_string()) {
            return None;
        }
        Some(DownloadClaim {
            model: model.to_string(),
            names: Arc::clone(&self.names),
        })
    }

    pub fn contains(&self, model: &str) -> bool {
        self.lock().contains(model)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().iter().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        lock(&self.names)
    }
}

fn lock(names: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    match names.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Exclusive right to poll one model. Released on drop.
#[derive(Debug)]
pub struct DownloadClaim {
    model: String,
    names: Arc<Mutex<HashSet<String>>>,
}

impl DownloadClaim {
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Drop for DownloadClaim {
    fn drop(&mut self) {
        lock(&self.names).remove(&self.model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_waits_for_release() {
        let active = ActiveDownloads::default();
        let claim = active.claim("llama3").unwrap();
        assert_eq!(claim.model(), "llama3");
        assert!(active.claim("llama3").is_none());
        assert!(active.claim("phi3").is_some());

        drop(claim);
        assert!(!active.contains("llama3"));
        assert!(active.claim("llama3").is_some());
    }
}
