//! # channel-insights
//!
//! Client-side pipeline that turns a free-text market description into per-channel
//! video metrics by calling three backend operations in sequence: query generation,
//! channel discovery and video data collection.
//!
//! ## Design Philosophy
//!
//! - **One run at a time** - Submissions while a run is in flight are rejected
//! - **Bounded stages** - Every stage request has its own deadline and is cancelled
//!   when it expires
//! - **Fail fast** - The first failing stage ends the run with a stage-specific error
//! - **Event-driven** - Consumers subscribe to events or watch state, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use channel_insights::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::from_config(&Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let metrics = pipeline.submit("drone market").await?;
//!     for channel in metrics {
//!         println!("{}: {} views", channel.name(), channel.view_count);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Timeout-bounded request execution
pub mod executor;
/// Pipeline orchestrator and state machine
pub mod pipeline;
/// Core types
pub mod types;
/// Render-ready state projection
pub mod view;

pub use config::{ApiConfig, BackendConfig, Config, EndpointConfig, StageTimeouts};
pub use error::{ApiError, Error, ExecutorFailure, PipelineError, Result, ToHttpStatus};
pub use executor::{Endpoint, HttpExecutor, RequestExecutor};
pub use pipeline::{Pipeline, PipelineState, Run};
pub use types::{ChannelMetrics, ChannelRef, Event, Phase, PipelineRequest, QuerySet, Stage};
pub use view::PipelineView;

/// Serve the REST API for `pipeline` until SIGTERM or SIGINT (Ctrl+C)
///
/// # Example
///
/// ```no_run
/// use channel_insights::{Config, Pipeline, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let pipeline = Pipeline::from_config(&config)?;
///
///     run_with_shutdown(pipeline, config).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(pipeline: Pipeline, config: Config) -> Result<()> {
    api::start_api_server(pipeline, std::sync::Arc::new(config)).await
}
