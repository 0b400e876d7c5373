//! Core types for channel-insights

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, ExecutorFailure, Result};

/// Pipeline phase as seen by consumers
///
/// Exactly one phase is active at any instant. `Idle` is both the initial state and the
/// state a failed run falls back to; `Done` is reached only after all three stages succeed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Waiting for input (initial state, and after a failed run)
    #[default]
    Idle,
    /// Stage 1 in flight: turning the user message into search queries
    Generating,
    /// Stage 2 in flight: resolving queries into channels
    FetchingChannels,
    /// Stage 3 in flight: aggregating per-channel video metrics
    FetchingVideoData,
    /// All stages succeeded, metrics are available
    Done,
}

impl Phase {
    /// Whether a run is currently in flight in this phase
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Phase::Generating | Phase::FetchingChannels | Phase::FetchingVideoData
        )
    }

    /// Wire name, identical to the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Generating => "generating",
            Phase::FetchingChannels => "fetchingChannels",
            Phase::FetchingVideoData => "fetchingVideoData",
            Phase::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three remote stages of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// `generate-queries`: user message → search queries
    QueryGeneration,
    /// `get-channels`: search queries → channels
    ChannelFetch,
    /// `get-video-data`: channels → channel metrics
    VideoDataFetch,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 3] = [
        Stage::QueryGeneration,
        Stage::ChannelFetch,
        Stage::VideoDataFetch,
    ];

    /// Phase the pipeline is in while this stage's request is outstanding
    pub fn phase(&self) -> Phase {
        match self {
            Stage::QueryGeneration => Phase::Generating,
            Stage::ChannelFetch => Phase::FetchingChannels,
            Stage::VideoDataFetch => Phase::FetchingVideoData,
        }
    }

    /// Message shown when this stage's own deadline elapsed
    pub fn timeout_message(&self) -> &'static str {
        match self {
            Stage::QueryGeneration => "LLM request timed out",
            Stage::ChannelFetch => "Channel fetch timed out",
            Stage::VideoDataFetch => "Video data fetch timed out",
        }
    }

    /// Prefix for every non-timeout failure message of this stage
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            Stage::QueryGeneration => "Error generating queries",
            Stage::ChannelFetch => "Error fetching channels",
            Stage::VideoDataFetch => "Error fetching video data",
        }
    }

    /// Wire name, identical to the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::QueryGeneration => "queryGeneration",
            Stage::ChannelFetch => "channelFetch",
            Stage::VideoDataFetch => "videoDataFetch",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated free-text input for a single run
///
/// Blank or whitespace-only input never produces a request. The text itself is kept
/// verbatim (it is not trimmed) and is immutable for the lifetime of the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineRequest(String);

impl PipelineRequest {
    /// Validate user input, rejecting blank text
    pub fn new(input: impl Into<String>) -> Result<Self> {
        let input = input.into();
        if input.trim().is_empty() {
            return Err(Error::BlankInput);
        }
        Ok(Self(input))
    }

    /// The message exactly as submitted
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Search queries produced by stage 1 (may be empty)
pub type QuerySet = Vec<String>;

/// A channel discovered by stage 2
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    /// Remote channel identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Subscriber count at discovery time
    pub subscriber_count: u64,
}

/// A channel enriched with recent video metrics by stage 3
///
/// Serializes flat: the `ChannelRef` fields sit next to `viewCount` and `videoCount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetrics {
    /// The channel these metrics belong to
    #[serde(flatten)]
    pub channel: ChannelRef,
    /// Total views across the aggregated videos
    pub view_count: u64,
    /// Number of videos aggregated
    pub video_count: u64,
}

impl ChannelMetrics {
    /// Channel display name (chart key)
    pub fn name(&self) -> &str {
        &self.channel.name
    }
}

/// Event emitted during a pipeline run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    /// A submission was accepted and a run started
    RunStarted {
        /// The submitted message
        input: String,
    },

    /// The pipeline moved from one phase to another
    PhaseChanged {
        /// Phase before the transition
        from: Phase,
        /// Phase after the transition
        to: Phase,
    },

    /// A stage resolved successfully
    StageCompleted {
        /// Stage that completed
        stage: Stage,
        /// Number of items the stage produced (queries, channels or metrics)
        items: usize,
        /// Wall time spent on the stage's request
        elapsed_ms: u64,
    },

    /// A stage failed and the run stopped
    RunFailed {
        /// Stage that failed
        stage: Stage,
        /// Failure cause reported by the executor
        cause: ExecutorFailure,
        /// User-facing message
        message: String,
    },

    /// All stages succeeded
    RunCompleted {
        /// Number of channels with metrics
        channels: usize,
    },

    /// The future driving a run was dropped before the run finished
    RunAbandoned {
        /// Phase the run was in when it was dropped
        phase: Phase,
    },
}

impl Event {
    /// Event name used for SSE `event:` lines
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "runStarted",
            Event::PhaseChanged { .. } => "phaseChanged",
            Event::StageCompleted { .. } => "stageCompleted",
            Event::RunFailed { .. } => "runFailed",
            Event::RunCompleted { .. } => "runCompleted",
            Event::RunAbandoned { .. } => "runAbandoned",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drone_tube() -> ChannelRef {
        ChannelRef {
            id: "c1".into(),
            name: "DroneTube".into(),
            subscriber_count: 10_000,
        }
    }

    #[test]
    fn blank_input_is_rejected() {
        for input in ["", " ", "\t\n", "   \r\n  "] {
            assert!(matches!(PipelineRequest::new(input), Err(Error::BlankInput)));
        }
    }

    #[test]
    fn request_keeps_text_verbatim() {
        let request = PipelineRequest::new("  drone market ").unwrap();
        assert_eq!(request.message(), "  drone market ");
    }

    #[test]
    fn only_in_flight_phases_are_running() {
        assert!(!Phase::Idle.is_running());
        assert!(Phase::Generating.is_running());
        assert!(Phase::FetchingChannels.is_running());
        assert!(Phase::FetchingVideoData.is_running());
        assert!(!Phase::Done.is_running());
    }

    #[test]
    fn stages_map_to_their_phases_in_order() {
        let phases: Vec<Phase> = Stage::ALL.iter().map(Stage::phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Generating,
                Phase::FetchingChannels,
                Phase::FetchingVideoData
            ]
        );
    }

    #[test]
    fn channel_ref_uses_camel_case_on_the_wire() {
        let value = serde_json::to_value(drone_tube()).unwrap();
        assert_eq!(
            value,
            json!({"id": "c1", "name": "DroneTube", "subscriberCount": 10000})
        );
    }

    #[test]
    fn channel_metrics_serialize_flat() {
        let metrics = ChannelMetrics {
            channel: drone_tube(),
            view_count: 500_000,
            video_count: 42,
        };
        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "c1",
                "name": "DroneTube",
                "subscriberCount": 10000,
                "viewCount": 500000,
                "videoCount": 42
            })
        );

        let parsed: ChannelMetrics = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, metrics);
        assert_eq!(parsed.name(), "DroneTube");
    }

    #[test]
    fn negative_counts_are_not_accepted() {
        let result = serde_json::from_value::<ChannelRef>(
            json!({"id": "c1", "name": "x", "subscriberCount": -5}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::PhaseChanged {
            from: Phase::Idle,
            to: Phase::Generating,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "phaseChanged", "from": "idle", "to": "generating"})
        );
        assert_eq!(event.kind(), "phaseChanged");

        let failed = Event::RunFailed {
            stage: Stage::ChannelFetch,
            cause: ExecutorFailure::HttpStatus { code: 500 },
            message: "Error fetching channels: Status 500".into(),
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["stage"], "channelFetch");
        assert_eq!(value["cause"], json!({"kind": "httpStatus", "code": 500}));

        let completed = Event::StageCompleted {
            stage: Stage::VideoDataFetch,
            items: 3,
            elapsed_ms: 120,
        };
        let value = serde_json::to_value(&completed).unwrap();
        assert_eq!(
            value,
            json!({"type": "stageCompleted", "stage": "videoDataFetch", "items": 3, "elapsedMs": 120})
        );
        assert_eq!(value["type"], completed.kind());
    }

    #[test]
    fn display_names_match_wire_names() {
        let phases = [
            Phase::Idle,
            Phase::Generating,
            Phase::FetchingChannels,
            Phase::FetchingVideoData,
            Phase::Done,
        ];
        for phase in phases {
            assert_eq!(serde_json::to_value(phase).unwrap(), phase.as_str());
            assert_eq!(phase.to_string(), phase.as_str());
        }
        for stage in Stage::ALL {
            assert_eq!(serde_json::to_value(stage).unwrap(), stage.as_str());
            assert_eq!(stage.to_string(), stage.as_str());
        }
        assert_eq!(Phase::FetchingVideoData.as_str(), "fetchingVideoData");
        assert_eq!(Stage::QueryGeneration.as_str(), "queryGeneration");
    }
}
