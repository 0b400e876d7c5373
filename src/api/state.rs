//! Application state for the API server

use crate::{Config, Pipeline};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline every request talks to
    pub pipeline: Pipeline,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(pipeline: Pipeline, config: Arc<Config>) -> Self {
        Self { pipeline, config }
    }
}
