//! Route handlers for the REST API
//!
//! - [`pipeline`]: submitting runs and reading state
//! - [`system`]: health, events, OpenAPI

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineState;
use crate::view::PipelineView;

mod pipeline;
mod system;

pub use pipeline::*;
pub use system::*;

/// Request body for POST /submit
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitRequest {
    /// Free-text market description, sent to query generation verbatim
    pub message: String,
}

/// Response for GET /state
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StateResponse {
    /// Render-ready projection
    pub view: PipelineView,
    /// Raw tagged state (`kind` discriminator)
    #[schema(value_type = Object)]
    pub state: PipelineState,
}
