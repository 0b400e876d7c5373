//! Render-ready projection of the pipeline state
//!
//! Front ends draw from a [`PipelineView`] instead of interpreting the state union
//! themselves: whether input is accepted, which progress label to show, the error
//! text, and the two chart series keyed by channel name.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pipeline::PipelineState;
use crate::types::{ChannelMetrics, Phase, Stage};

const SUBMIT_LABEL_READY: &str = "Send";
const SUBMIT_LABEL_BUSY: &str = "Loading…";

/// Snapshot of everything a consumer needs to render the pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineView {
    /// Current phase
    pub phase: Phase,
    /// Whether the input control should accept a submission
    pub input_enabled: bool,
    /// Submit button text
    pub submit_label: String,
    /// Progress text while a stage is in flight
    pub progress_label: Option<String>,
    /// Error of the last run, if it failed
    pub error: Option<ErrorView>,
    /// Metrics of the last successful run
    pub metrics: Vec<ChannelMetrics>,
    /// Chart series, present only when a run finished with at least one channel
    pub charts: Option<Charts>,
}

/// Error details for display
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorView {
    /// Stage that failed
    pub stage: Stage,
    /// Whether the stage ran out of time
    pub timed_out: bool,
    /// User-facing message
    pub message: String,
}

/// The two bar-chart series drawn after a successful run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Charts {
    /// Total views per channel
    pub views: ChartSeries,
    /// Video count per channel
    pub videos: ChartSeries,
}

/// One named series of values keyed by channel name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartSeries {
    /// Series legend
    pub name: String,
    /// Points in result order
    pub points: Vec<SeriesPoint>,
}

/// A single bar
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeriesPoint {
    /// Channel name
    pub label: String,
    /// Bar value
    pub value: u64,
}

/// Progress text shown while `phase` is active
pub fn progress_label(phase: Phase) -> Option<&'static str> {
    match phase {
        Phase::Generating => Some("Generating Queries…"),
        Phase::FetchingChannels => Some("Fetching Channels…"),
        Phase::FetchingVideoData => Some("Fetching Video Data…"),
        Phase::Idle | Phase::Done => None,
    }
}

impl Charts {
    /// Build both series, or nothing when there is nothing to draw
    pub fn from_metrics(metrics: &[ChannelMetrics]) -> Option<Self> {
        if metrics.is_empty() {
            return None;
        }
        Some(Self {
            views: ChartSeries::collect("Views", metrics, |m| m.view_count),
            videos: ChartSeries::collect("Videos", metrics, |m| m.video_count),
        })
    }
}

impl ChartSeries {
    fn collect(
        name: &str,
        metrics: &[ChannelMetrics],
        value: impl Fn(&ChannelMetrics) -> u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            points: metrics
                .iter()
                .map(|m| SeriesPoint {
                    label: m.name().to_string(),
                    value: value(m),
                })
                .collect(),
        }
    }
}

impl From<&PipelineState> for PipelineView {
    fn from(state: &PipelineState) -> Self {
        let phase = state.phase();
        let input_enabled = !phase.is_running();
        let metrics = state.result().to_vec();
        let charts = if phase == Phase::Done {
            Charts::from_metrics(&metrics)
        } else {
            None
        };
        let submit_label = if input_enabled {
            SUBMIT_LABEL_READY
        } else {
            SUBMIT_LABEL_BUSY
        };

        Self {
            phase,
            input_enabled,
            submit_label: submit_label.to_string(),
            progress_label: progress_label(phase).map(str::to_string),
            error: state.error().map(|e| ErrorView {
                stage: e.stage,
                timed_out: e.is_timeout(),
                message: e.message(),
            }),
            metrics,
            charts,
        }
    }
}
