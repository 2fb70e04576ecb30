//! Outbound network used by the worker.

use std::time::Duration;

use async_trait::async_trait;
use nabras_common::{with_timeout, NabrasError};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::WorkerConfig;
use crate::request::{Request, Response, ResponseSource};

/// A fetch that produced no response at all. HTTP error statuses are
/// responses, not network errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Offline")]
    Offline,
}

/// The network capability handed to the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request` from the network.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// reqwest-backed network.
pub struct HttpNetwork {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpNetwork {
    /// Create a network from the worker config.
    pub fn new(config: &WorkerConfig) -> Result<Self, NabrasError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| NabrasError::network_with_source("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            timeout: config.network_timeout(),
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        debug!(url = %request.url, method = %request.method, "Network fetch");

        let builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        let outcome = with_timeout(self.timeout, || async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let url = response.url().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(Response {
                status,
                headers,
                body,
                url: Some(url),
                source: ResponseSource::Network,
            })
        })
        .await;

        match outcome {
            Ok(Ok(response)) => {
                trace!(
                    url = %request.url,
                    status = %response.status,
                    body_len = response.body.len(),
                    "Network response"
                );
                Ok(response)
            }
            Ok(Err(e)) => Err(NetworkError::RequestFailed(e.to_string())),
            Err(NabrasError::Timeout(limit)) => Err(NetworkError::Timeout(limit)),
            Err(other) => Err(NetworkError::RequestFailed(other.to_string())),
        }
    }
}
