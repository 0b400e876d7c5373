//! Pipeline orchestrator
//!
//! Sequences the three dependent stage requests and owns the state machine:
//!
//! ```text
//! Idle ─submit─▶ Generating ─▶ FetchingChannels ─▶ FetchingVideoData ─▶ Done
//!                    │                │                    │
//!                    └────────────────┴─── failure ────────┴──▶ Idle (+ error)
//! ```
//!
//! Only one run is in flight at a time and only one request is outstanding within a
//! run. A submission while a run is active is rejected without touching state.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, watch};

use crate::config::{Config, StageTimeouts};
use crate::error::{Error, ExecutorFailure, PipelineError, Result};
use crate::executor::{HttpExecutor, RequestExecutor};
use crate::types::{ChannelMetrics, Event, Phase, PipelineRequest, Stage};
use crate::view::PipelineView;

mod stages;
mod state;

pub use state::PipelineState;

use stages::{
    ChannelsRequest, ChannelsResponse, GenerateQueriesRequest, QueriesResponse, StageOutput,
    VideoDataRequest, VideoDataResponse,
};


/// Event buffer per subscriber; a full run emits well under a dozen events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The query → channels → metrics pipeline (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Pipeline {
    executor: Arc<dyn RequestExecutor>,
    timeouts: StageTimeouts,
    state_tx: Arc<watch::Sender<PipelineState>>,
    event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Create a pipeline around any executor
    pub fn new(executor: Arc<dyn RequestExecutor>, timeouts: StageTimeouts) -> Self {
        let (state_tx, _state_rx) = watch::channel(PipelineState::Idle);
        let (event_tx, _event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            executor,
            timeouts,
            state_tx: Arc::new(state_tx),
            event_tx,
        }
    }

    /// Create a pipeline that talks HTTP to the backend described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let executor = HttpExecutor::new(config)?;
        Ok(Self::new(Arc::new(executor), config.timeouts))
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Watch the latest state
    pub fn watch(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Copy of the current state
    pub fn state(&self) -> PipelineState {
        self.state_tx.borrow().clone()
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.state_tx.borrow().phase()
    }

    /// Error of the last run, if it failed
    pub fn error(&self) -> Option<PipelineError> {
        self.state_tx.borrow().error().cloned()
    }

    /// Metrics of the last run; empty unless it reached `Done`
    pub fn result(&self) -> Vec<ChannelMetrics> {
        self.state_tx.borrow().result().to_vec()
    }

    /// Render-ready projection of the current state
    pub fn view(&self) -> PipelineView {
        PipelineView::from(&*self.state_tx.borrow())
    }

    /// Per-stage deadlines in use
    pub fn timeouts(&self) -> StageTimeouts {
        self.timeouts
    }

    /// Run the whole pipeline for `input`
    ///
    /// Returns the metrics on success. Blank input and submissions during an active
    /// run are rejected with [`Error::BlankInput`] / [`Error::Busy`] and leave the
    /// state untouched; a stage failure returns [`Error::Pipeline`].
    pub async fn submit(&self, input: &str) -> Result<Vec<ChannelMetrics>> {
        self.start(input)?.finish().await
    }

    /// Accept a submission and enter `Generating` without issuing any request yet
    ///
    /// The previous run's error and result are gone once this returns. Drive the
    /// returned [`Run`] with [`Run::finish`].
    pub fn start(&self, input: &str) -> Result<Run> {
        let request = PipelineRequest::new(input)?;

        let mut busy = None;
        let mut from = Phase::Idle;
        self.state_tx.send_if_modified(|state| {
            if state.is_running() {
                busy = Some(state.phase());
                return false;
            }
            from = state.phase();
            *state = PipelineState::Generating;
            true
        });

        if let Some(phase) = busy {
            tracing::debug!(phase = %phase, "submission rejected, run in progress");
            return Err(Error::Busy { phase });
        }

        tracing::info!(input = %request.message(), "pipeline run started");
        self.emit(Event::RunStarted {
            input: request.message().to_string(),
        });
        self.emit(Event::PhaseChanged {
            from,
            to: Phase::Generating,
        });

        Ok(Run {
            pipeline: self.clone(),
            request,
            settled: false,
        })
    }

    async fn execute_stages(
        &self,
        request: &PipelineRequest,
    ) -> std::result::Result<Vec<ChannelMetrics>, PipelineError> {
        let QueriesResponse { queries } = self
            .call::<_, QueriesResponse>(
                Stage::QueryGeneration,
                &GenerateQueriesRequest {
                    message: request.message(),
                },
            )
            .await?;

        self.transition(PipelineState::running(Stage::ChannelFetch));
        let ChannelsResponse { channels } = self
            .call::<_, ChannelsResponse>(Stage::ChannelFetch, &ChannelsRequest { queries: &queries })
            .await?;

        self.transition(PipelineState::running(Stage::VideoDataFetch));
        let VideoDataResponse { channels: metrics } = self
            .call::<_, VideoDataResponse>(
                Stage::VideoDataFetch,
                &VideoDataRequest {
                    channels: &channels,
                },
            )
            .await?;

        Ok(metrics)
    }

    /// One stage: encode, execute under the stage deadline, decode
    async fn call<P, R>(&self, stage: Stage, payload: &P) -> std::result::Result<R, PipelineError>
    where
        P: Serialize + Sync,
        R: StageOutput,
    {
        let fail = move |cause: ExecutorFailure| PipelineError::new(stage, cause);
        let timeout = self.timeouts.for_stage(stage);

        let body = serde_json::to_value(payload)
            .map_err(|e| fail(ExecutorFailure::transport(e)))?;

        tracing::info!(
            stage = %stage,
            timeout_ms = timeout.as_millis() as u64,
            "stage started"
        );
        let started = Instant::now();

        let response = self
            .executor
            .execute(stage.into(), body, timeout)
            .await
            .map_err(fail)?;
        let output: R =
            serde_json::from_value(response).map_err(|e| fail(ExecutorFailure::transport(e)))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let items = output.item_count();
        tracing::info!(stage = %stage, items, elapsed_ms, "stage completed");
        self.emit(Event::StageCompleted {
            stage,
            items,
            elapsed_ms,
        });

        Ok(output)
    }

    fn transition(&self, next: PipelineState) {
        let to = next.phase();
        let previous = self.state_tx.send_replace(next);
        let from = previous.phase();
        if from != to {
            tracing::debug!(from = %from, to = %to, "phase changed");
            self.emit(Event::PhaseChanged { from, to });
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// An accepted submission
///
/// The pipeline stays in a running phase until [`Run::finish`] completes. If a run is
/// dropped before that (for example because the task driving it was aborted) the
/// state falls back to `Idle` without an error so new submissions are accepted again.
#[must_use = "a run issues no requests until `finish` is awaited"]
pub struct Run {
    pipeline: Pipeline,
    request: PipelineRequest,
    settled: bool,
}

impl Run {
    /// The accepted input
    pub fn request(&self) -> &PipelineRequest {
        &self.request
    }

    /// Drive all stages to `Done` or to the first failure
    pub async fn finish(mut self) -> Result<Vec<ChannelMetrics>> {
        let outcome = self.pipeline.execute_stages(&self.request).await;
        self.settled = true;

        match outcome {
            Ok(metrics) => {
                tracing::info!(channels = metrics.len(), "pipeline run completed");
                self.pipeline.transition(PipelineState::Done {
                    metrics: metrics.clone(),
                });
                self.pipeline.emit(Event::RunCompleted {
                    channels: metrics.len(),
                });
                Ok(metrics)
            }
            Err(error) => {
                tracing::warn!(stage = %error.stage, error = %error, "pipeline run failed");
                self.pipeline.transition(PipelineState::Failed {
                    error: error.clone(),
                });
                self.pipeline.emit(Event::RunFailed {
                    stage: error.stage,
                    cause: error.cause.clone(),
                    message: error.message(),
                });
                Err(Error::Pipeline(error))
            }
        }
    }
}

impl Drop for Run {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let phase = self.pipeline.phase();
        tracing::warn!(phase = %phase, "pipeline run abandoned before completion");
        self.pipeline.transition(PipelineState::Idle);
        self.pipeline.emit(Event::RunAbandoned { phase });
    }
}
