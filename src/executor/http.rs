//! reqwest-backed [`RequestExecutor`]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{Endpoint, RequestExecutor};
use crate::config::{Config, EndpointConfig};
use crate::error::{ExecutorFailure, Result};

/// Executes stage requests as JSON `POST`s against the configured backend
///
/// Each request runs as its own task owned by an [`InFlightRequest`] handle. The handle
/// lives exactly as long as the `execute` call, and dropping it cancels the task, so a
/// request that missed its deadline is torn down instead of being left to finish in
/// the background.
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: Url,
    endpoints: EndpointConfig,
    in_flight: Arc<AtomicUsize>,
}

impl HttpExecutor {
    /// Build an executor from the backend section of `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.backend.user_agent.as_str())
            .build()?;
        Self::with_client(client, config)
    }

    /// Build an executor around an existing client
    pub fn with_client(client: reqwest::Client, config: &Config) -> Result<Self> {
        Ok(Self {
            client,
            base_url: config.base_url()?,
            endpoints: config.backend.endpoints.clone(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of requests currently owned by an `execute` call
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Absolute URL for an endpoint
    pub fn url_for(&self, endpoint: Endpoint) -> std::result::Result<Url, ExecutorFailure> {
        let path = match endpoint {
            Endpoint::GenerateQueries => &self.endpoints.generate_queries,
            Endpoint::GetChannels => &self.endpoints.get_channels,
            Endpoint::GetVideoData => &self.endpoints.get_video_data,
        };
        self.base_url.join(path).map_err(ExecutorFailure::transport)
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(
        &self,
        endpoint: Endpoint,
        payload: Value,
        timeout: Duration,
    ) -> std::result::Result<Value, ExecutorFailure> {
        let url = self.url_for(endpoint)?;
        tracing::debug!(
            endpoint = %endpoint,
            url = %url,
            timeout_ms = timeout.as_millis() as u64,
            "sending request"
        );

        let request = self.client.post(url).json(&payload);
        let mut in_flight = InFlightRequest::spawn(endpoint, send(request), &self.in_flight);

        match tokio::time::timeout(timeout, &mut in_flight.task).await {
            Ok(Ok(Some(outcome))) => outcome,
            Ok(Ok(None)) => Err(ExecutorFailure::transport("request cancelled")),
            Ok(Err(join_err)) => Err(ExecutorFailure::transport(join_err)),
            Err(_elapsed) => {
                tracing::warn!(
                    endpoint = %endpoint,
                    timeout_ms = timeout.as_millis() as u64,
                    "request deadline elapsed"
                );
                Err(ExecutorFailure::Timeout)
            }
        }
    }
}

async fn send(request: reqwest::RequestBuilder) -> std::result::Result<Value, ExecutorFailure> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExecutorFailure::HttpStatus {
            code: status.as_u16(),
        });
    }
    Ok(response.json::<Value>().await?)
}

/// Cancellation handle for one outstanding request
///
/// Acquired when the request is spawned and released on every exit path of
/// `execute`. Release cancels the request task if it has not finished.
struct InFlightRequest {
    endpoint: Endpoint,
    task: JoinHandle<Option<std::result::Result<Value, ExecutorFailure>>>,
    cancel_token: CancellationToken,
    gauge: Arc<AtomicUsize>,
}

impl InFlightRequest {
    fn spawn<F>(endpoint: Endpoint, request: F, gauge: &Arc<AtomicUsize>) -> Self
    where
        F: std::future::Future<Output = std::result::Result<Value, ExecutorFailure>>
            + Send
            + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                outcome = request => Some(outcome),
                _ = token.cancelled() => None,
            }
        });

        gauge.fetch_add(1, Ordering::SeqCst);
        Self {
            endpoint,
            task,
            cancel_token,
            gauge: Arc::clone(gauge),
        }
    }
}

impl Drop for InFlightRequest {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            tracing::debug!(endpoint = %self.endpoint, "cancelling in-flight request");
            self.cancel_token.cancel();
        }
        self.gauge.fetch_sub(1, Ordering::SeqCst);
    }
}
