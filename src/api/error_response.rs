//! HTTP error response handling for the API
//!
//! Converts domain errors to HTTP responses with a status code and a JSON error body.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutorFailure, PipelineError};
    use crate::types::{Phase, Stage};

    async fn body_of(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn busy_is_a_conflict() {
        let response = Error::Busy {
            phase: Phase::FetchingChannels,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "busy");
        assert_eq!(
            api_error.error.details.unwrap()["phase"],
            "fetchingChannels"
        );
    }

    #[tokio::test]
    async fn blank_input_is_a_bad_request() {
        let response = Error::BlankInput.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await.error.code, "blank_input");
    }

    #[tokio::test]
    async fn stage_timeout_is_a_gateway_timeout() {
        let error = Error::Pipeline(PipelineError::new(
            Stage::VideoDataFetch,
            ExecutorFailure::Timeout,
        ));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "stage_timeout");
        assert_eq!(api_error.error.message, "Video data fetch timed out");
    }

    #[tokio::test]
    async fn stage_status_failure_is_a_bad_gateway() {
        let error = Error::Pipeline(PipelineError::new(
            Stage::ChannelFetch,
            ExecutorFailure::HttpStatus { code: 500 },
        ));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "stage_http_status");
        assert_eq!(api_error.error.message, "Error fetching channels: Status 500");
    }
}
