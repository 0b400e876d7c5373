//! REST API server module
//!
//! Hosts a [`Pipeline`] behind a small OpenAPI-described REST surface so browser
//! front ends can submit a market description, poll or stream progress and read
//! the resulting chart data.

use crate::{Config, Error, Pipeline, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Prefix every route is mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Pipeline
/// - `GET /state` - Current state and its render-ready projection
/// - `POST /submit` - Start a run (202), rejected when blank (400) or busy (409)
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream
///
/// All routes are mounted under [`API_PREFIX`].
pub fn create_router(pipeline: Pipeline, config: Arc<Config>) -> Router {
    let state = AppState::new(pipeline, config.clone());

    let routes = Router::new()
        // Pipeline
        .route("/state", get(routes::get_state))
        .route("/submit", post(routes::submit))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .with_state(state);

    let router = Router::new()
        .nest(API_PREFIX, routes)
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// CORS for the configured origins
///
/// `"*"` or an empty list allows any origin. Entries that are not valid header
/// values are skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut allowed = Vec::with_capacity(origins.len());
        for origin in origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => tracing::warn!(origin = %origin, "ignoring unparsable CORS origin"),
            }
        }
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server on the configured bind address
///
/// Serves until Ctrl+C or SIGTERM is received, then stops accepting connections and
/// returns. A run still in flight keeps going on its own task until it settles.
///
/// # Example
///
/// ```no_run
/// use channel_insights::{Config, Pipeline};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let pipeline = Pipeline::from_config(&config)?;
///
/// // Blocks until a shutdown signal arrives
/// channel_insights::api::start_api_server(pipeline, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(pipeline: Pipeline, config: Arc<Config>) -> Result<()> {
    let listener = TcpListener::bind(config.api.bind_address)
        .await
        .map_err(Error::Io)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    serve(listener, pipeline, config, shutdown).await
}

/// Serve the API on an already bound listener until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    pipeline: Pipeline,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let address = listener.local_addr().map_err(Error::Io)?;
    tracing::info!(address = %address, "API server listening");

    axum::serve(listener, create_router(pipeline, config))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
///
/// A signal that cannot be registered is logged and never fires; the other one still
/// works. Returns early if `shutdown` is cancelled by someone else.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("Ctrl+C received, shutting down API server"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down API server"),
        _ = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}
