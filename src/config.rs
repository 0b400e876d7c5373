//! Configuration types for channel-insights

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use url::Url;

use crate::error::{Error, Result};
use crate::types::Stage;

/// Remote backend location and endpoint paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the endpoint paths are resolved against (default: "http://127.0.0.1:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint paths for the three stages
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoints: EndpointConfig::default(),
            user_agent: default_user_agent(),
        }
    }
}

/// Paths of the three remote operations, relative to [`BackendConfig::base_url`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Stage 1 (default: "/api/generate-queries")
    #[serde(default = "default_generate_queries_path")]
    pub generate_queries: String,

    /// Stage 2 (default: "/api/get-channels")
    #[serde(default = "default_get_channels_path")]
    pub get_channels: String,

    /// Stage 3 (default: "/api/get-video-data")
    #[serde(default = "default_get_video_data_path")]
    pub get_video_data: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            generate_queries: default_generate_queries_path(),
            get_channels: default_get_channels_path(),
            get_video_data: default_get_video_data_path(),
        }
    }
}

/// Per-stage request deadlines
///
/// The budget grows with each stage's expected cost: a single LLM call, then a fan-out
/// of channel lookups, then per-channel metrics aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimeouts {
    /// Stage 1 deadline (default: 10 seconds)
    #[serde(
        rename = "query_generation_ms",
        default = "default_query_generation_timeout",
        with = "duration_ms_serde"
    )]
    pub query_generation: Duration,

    /// Stage 2 deadline (default: 15 seconds)
    #[serde(
        rename = "channel_fetch_ms",
        default = "default_channel_fetch_timeout",
        with = "duration_ms_serde"
    )]
    pub channel_fetch: Duration,

    /// Stage 3 deadline (default: 30 seconds)
    #[serde(
        rename = "video_data_fetch_ms",
        default = "default_video_data_fetch_timeout",
        with = "duration_ms_serde"
    )]
    pub video_data_fetch: Duration,
}

impl StageTimeouts {
    /// Deadline for the given stage
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::QueryGeneration => self.query_generation,
            Stage::ChannelFetch => self.channel_fetch,
            Stage::VideoDataFetch => self.video_data_fetch,
        }
    }

    /// The same deadline for every stage (mostly useful in tests)
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            query_generation: timeout,
            channel_fetch: timeout,
            video_data_fetch: timeout,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            query_generation: default_query_generation_timeout(),
            channel_fetch: default_channel_fetch_timeout(),
            video_data_fetch: default_video_data_fetch_timeout(),
        }
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration
///
/// Every field has a default, so `{}` is a valid configuration document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the three remote operations live
    #[serde(default)]
    pub backend: BackendConfig,

    /// Per-stage request deadlines
    #[serde(default)]
    pub timeouts: StageTimeouts,

    /// REST API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would otherwise only fail at request time
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        let timeouts = [
            ("timeouts.query_generation_ms", self.timeouts.query_generation),
            ("timeouts.channel_fetch_ms", self.timeouts.channel_fetch),
            ("timeouts.video_data_fetch_ms", self.timeouts.video_data_fetch),
        ];
        for (key, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(Error::config(key, "timeout must be greater than zero"));
            }
        }

        let paths = [
            ("backend.endpoints.generate_queries", &self.backend.endpoints.generate_queries),
            ("backend.endpoints.get_channels", &self.backend.endpoints.get_channels),
            ("backend.endpoints.get_video_data", &self.backend.endpoints.get_video_data),
        ];
        for (key, path) in paths {
            if path.trim().is_empty() {
                return Err(Error::config(key, "endpoint path must not be empty"));
            }
        }

        Ok(())
    }

    /// Parsed backend base URL
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.backend.base_url).map_err(|e| {
            Error::config(
                "backend.base_url",
                format!("invalid base URL '{}': {}", self.backend.base_url, e),
            )
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::config(
                "backend.base_url",
                format!("'{}' cannot be used as a base URL", self.backend.base_url),
            ));
        }
        Ok(url)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_user_agent() -> String {
    concat!("channel-insights/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_generate_queries_path() -> String {
    "/api/generate-queries".to_string()
}

fn default_get_channels_path() -> String {
    "/api/get-channels".to_string()
}

fn default_get_video_data_path() -> String {
    "/api/get-video-data".to_string()
}

fn default_query_generation_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_channel_fetch_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_video_data_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Durations travel as integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
