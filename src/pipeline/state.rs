//! Tagged-union pipeline state

use serde::Serialize;

use crate::error::PipelineError;
use crate::types::{ChannelMetrics, Phase, Stage};

/// Complete state of the pipeline
///
/// Phase, error and result are all derived from this one value, so a consumer can
/// never observe metrics next to an error, or an error outside of `Idle`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PipelineState {
    /// Nothing has run yet
    #[default]
    Idle,
    /// Stage 1 in flight
    Generating,
    /// Stage 2 in flight
    FetchingChannels,
    /// Stage 3 in flight
    FetchingVideoData,
    /// The last run failed; reported as [`Phase::Idle`]
    Failed {
        /// Why the last run stopped
        error: PipelineError,
    },
    /// The last run succeeded
    Done {
        /// Terminal artifact of the run
        metrics: Vec<ChannelMetrics>,
    },
}

impl PipelineState {
    /// State while `stage`'s request is outstanding
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::QueryGeneration => PipelineState::Generating,
            Stage::ChannelFetch => PipelineState::FetchingChannels,
            Stage::VideoDataFetch => PipelineState::FetchingVideoData,
        }
    }

    /// Consumer-visible phase
    pub fn phase(&self) -> Phase {
        match self {
            PipelineState::Idle | PipelineState::Failed { .. } => Phase::Idle,
            PipelineState::Generating => Phase::Generating,
            PipelineState::FetchingChannels => Phase::FetchingChannels,
            PipelineState::FetchingVideoData => Phase::FetchingVideoData,
            PipelineState::Done { .. } => Phase::Done,
        }
    }

    /// Error of the last run, if it failed
    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            PipelineState::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Metrics of the last run; empty unless the run reached `Done`
    pub fn result(&self) -> &[ChannelMetrics] {
        match self {
            PipelineState::Done { metrics } => metrics,
            _ => &[],
        }
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.phase().is_running()
    }
}
