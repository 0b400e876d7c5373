//! Timeout-bounded request execution
//!
//! A [`RequestExecutor`] performs exactly one request per call and races it against a
//! caller-supplied deadline. It never retries; that is left to callers (and the
//! pipeline performs none).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ExecutorFailure;
use crate::types::Stage;

mod http;

pub use http::HttpExecutor;

/// Logical remote operation a request is addressed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    /// `{message}` → `{queries}`
    GenerateQueries,
    /// `{queries}` → `{channels}`
    GetChannels,
    /// `{channels}` → `{channels}` enriched with metrics
    GetVideoData,
}

impl Endpoint {
    /// Operation name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::GenerateQueries => "generate-queries",
            Endpoint::GetChannels => "get-channels",
            Endpoint::GetVideoData => "get-video-data",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Stage> for Endpoint {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::QueryGeneration => Endpoint::GenerateQueries,
            Stage::ChannelFetch => Endpoint::GetChannels,
            Stage::VideoDataFetch => Endpoint::GetVideoData,
        }
    }
}

/// Trait for executing one timeout-bounded request
///
/// Implementations must:
/// - issue exactly one outbound request per call
/// - resolve with the decoded JSON body on a success status
/// - fail with [`ExecutorFailure::HttpStatus`] on any other status
/// - abort the in-flight request and fail with [`ExecutorFailure::Timeout`] when the
///   deadline elapses first
/// - fail with [`ExecutorFailure::Transport`] on network or decoding faults
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Send `payload` to `endpoint`, giving up after `timeout`
    async fn execute(
        &self,
        endpoint: Endpoint,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, ExecutorFailure>;
}
