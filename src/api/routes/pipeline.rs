//! Pipeline handlers: submit and state.

use super::{StateResponse, SubmitRequest};
use crate::api::AppState;
use crate::error::Error;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /state - Current pipeline state
#[utoipa::path(
    get,
    path = "/api/v1/state",
    tag = "pipeline",
    responses(
        (status = 200, description = "Current state and its projection", body = StateResponse)
    )
)]
pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.pipeline.state();
    Json(StateResponse {
        view: (&snapshot).into(),
        state: snapshot,
    })
}

/// POST /submit - Start a run
///
/// Returns as soon as the run is accepted; progress is observable through
/// `GET /state` and `GET /events`.
#[utoipa::path(
    post,
    path = "/api/v1/submit",
    tag = "pipeline",
    request_body = SubmitRequest,
    responses(
        (status = 202, description = "Run started", body = crate::view::PipelineView),
        (status = 400, description = "Blank input", body = crate::error::ApiError),
        (status = 409, description = "A run is already in progress", body = crate::error::ApiError)
    )
)]
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, Error> {
    let run = state.pipeline.start(&request.message)?;
    let view = state.pipeline.view();

    // The outcome lands in the pipeline state and the event stream
    tokio::spawn(async move {
        if let Err(e) = run.finish().await {
            tracing::debug!(error = %e, "background run ended with an error");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(view)))
}
