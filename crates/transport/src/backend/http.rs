use crate::{Call, Transport, TransportKind};
use async_trait::async_trait;
use kcriff_core::RequestError;
use std::time::Duration;
use surf::Url;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid endpoint {endpoint:?}: {reason}")]
pub struct InvalidEndpoint {
    pub endpoint: String,
    pub reason: String,
}

/// Talks to the model service over HTTP.
pub struct HttpTransport {
    base: Url,
    client: surf::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, InvalidEndpoint> {
        let invalid = |reason: String| InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let mut base = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", base.scheme())));
        }
        // Routes are joined relative to the base, so it has to look like a directory.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            client: surf::Client::new(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Checks that something answers on the health route. Any HTTP response counts as
    /// reachable; only network failures and timeouts do not.
    pub async fn probe(&self) -> Result<(), RequestError> {
        match self.call(Call::HealthCheck).await {
            Ok(_) | Err(RequestError::Http { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn url_for(&self, call: &Call) -> Result<Url, RequestError> {
        let mut url = self
            .base
            .join(call.capability().route())
            .map_err(|e| RequestError::Network(e.to_string()))?;
        if let Some(model) = call.model() {
            url.query_pairs_mut().append_pair("name", model);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn location(&self) -> String {
        self.base.to_string()
    }

    async fn call(&self, call: Call) -> Result<String, RequestError> {
        let url = self.url_for(&call)?;
        log::debug!("GET {}", url);

        let request = async {
            let mut response = self
                .client
                .get(url.as_str())
                .await
                .map_err(|e| RequestError::Network(e.to_string()))?;

            let status = response.status();
            let body = response
                .body_string()
                .await
                .map_err(|e| RequestError::Network(e.to_string()))?;

            if status.is_success() {
                Ok(body)
            } else {
                Err(RequestError::Http {
                    status: u16::from(status),
                    body,
                })
            }
        };

        async_std::future::timeout(self.timeout, request)
            .await
            .map_err(|_| RequestError::Timeout(self.timeout))?
    }
}
