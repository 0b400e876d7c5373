//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the channel-insights REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the channel-insights REST API
///
/// Served at `/api/v1/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "channel-insights REST API",
        version = "0.1.0",
        description = "Submit a market description and follow the query generation, channel discovery and video data stages",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790/api/v1", description = "Local development server")
    ),
    paths(
        // Pipeline
        crate::api::routes::get_state,
        crate::api::routes::submit,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::Phase,
        crate::types::Stage,
        crate::types::ChannelRef,
        crate::types::ChannelMetrics,

        // Projection types from view.rs
        crate::view::PipelineView,
        crate::view::ErrorView,
        crate::view::Charts,
        crate::view::ChartSeries,
        crate::view::SeriesPoint,

        // API request/response types from routes
        crate::api::routes::SubmitRequest,
        crate::api::routes::StateResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "pipeline", description = "Pipeline - Submit a market description and read run state"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
