//! End-to-end pipeline runs over HTTP against a wiremock backend
//!
//! Covers the full run, stage failures, per-stage deadlines with cancellation of the
//! slow request, and rejection of submissions while a run is in flight.

mod common;

use channel_insights::{
    Config, Error, Event, ExecutorFailure, Phase, PipelineError, Stage, StageTimeouts,
};
use common::*;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::body_json;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn drone_market_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path(GENERATE_QUERIES))
        .and(body_json(json!({"message": "drone market"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(queries_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path(GET_CHANNELS))
        .and(body_json(json!({"queries": ["drone sales 2024"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(channels_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path(GET_VIDEO_DATA))
        .and(body_json(channels_body()))
        .respond_with(ResponseTemplate::new(200).set_body_json(video_data_body()))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server, StageTimeouts::default());
    let metrics = pipeline.submit("drone market").await.unwrap();

    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].name(), "DroneTube");
    assert_eq!(metrics[0].channel.subscriber_count, 10_000);
    assert_eq!(metrics[0].view_count, 500_000);
    assert_eq!(metrics[0].video_count, 42);
    assert_eq!(pipeline.phase(), Phase::Done);
    assert!(pipeline.error().is_none());

    assert_eq!(
        received_paths(&server).await,
        vec![GENERATE_QUERIES, GET_CHANNELS, GET_VIDEO_DATA]
    );
}

#[tokio::test]
async fn channel_fetch_500_stops_before_video_data() {
    let server = MockServer::start().await;
    mount_stage(
        &server,
        GENERATE_QUERIES,
        ResponseTemplate::new(200).set_body_json(queries_body()),
    )
    .await;
    mount_stage(&server, GET_CHANNELS, ResponseTemplate::new(500)).await;
    mount_stage(
        &server,
        GET_VIDEO_DATA,
        ResponseTemplate::new(200).set_body_json(video_data_body()),
    )
    .await;

    let pipeline = pipeline_for(&server, StageTimeouts::default());
    let err = pipeline.submit("drone market").await.unwrap_err();

    let Error::Pipeline(error) = err else {
        panic!("expected a stage failure");
    };
    assert_eq!(
        error,
        PipelineError::new(Stage::ChannelFetch, ExecutorFailure::HttpStatus { code: 500 })
    );
    assert_eq!(error.message(), "Error fetching channels: Status 500");
    assert_eq!(pipeline.phase(), Phase::Idle);
    assert!(pipeline.result().is_empty());
    assert_eq!(
        received_paths(&server).await,
        vec![GENERATE_QUERIES, GET_CHANNELS]
    );
}

#[tokio::test]
async fn slow_video_data_times_out_and_is_cancelled() {
    let server = MockServer::start().await;
    mount_stage(
        &server,
        GENERATE_QUERIES,
        ResponseTemplate::new(200).set_body_json(queries_body()),
    )
    .await;
    mount_stage(
        &server,
        GET_CHANNELS,
        ResponseTemplate::new(200).set_body_json(channels_body()),
    )
    .await;
    mount_stage(
        &server,
        GET_VIDEO_DATA,
        ResponseTemplate::new(200)
            .set_body_json(video_data_body())
            .set_delay(Duration::from_secs(10)),
    )
    .await;

    let timeouts = StageTimeouts {
        video_data_fetch: Duration::from_millis(200),
        ..StageTimeouts::default()
    };
    let pipeline = pipeline_for(&server, timeouts);
    let mut events = pipeline.subscribe();

    let started = Instant::now();
    let err = pipeline.submit("drone market").await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    let Error::Pipeline(error) = err else {
        panic!("expected a stage failure");
    };
    assert_eq!(error.stage, Stage::VideoDataFetch);
    assert_eq!(error.cause, ExecutorFailure::Timeout);
    assert_eq!(error.message(), "Video data fetch timed out");
    assert_eq!(pipeline.phase(), Phase::Idle);
    assert!(pipeline.result().is_empty());

    let events = collect_events_until(&mut events, Duration::from_secs(1), |e| {
        matches!(e, Event::RunFailed { .. })
    })
    .await;
    assert!(events.contains(&Event::RunFailed {
        stage: Stage::VideoDataFetch,
        cause: ExecutorFailure::Timeout,
        message: "Video data fetch timed out".into(),
    }));
}

#[tokio::test]
async fn video_data_deadline_closes_the_backend_connection() {
    let server = happy_backend().await;
    let (silent, closed) = silent_endpoint().await;

    let mut config = config_for(
        &server,
        StageTimeouts {
            video_data_fetch: Duration::from_millis(200),
            ..StageTimeouts::default()
        },
    );
    config.backend.endpoints.get_video_data = format!("{silent}{GET_VIDEO_DATA}");
    let pipeline = channel_insights::Pipeline::from_config(&config).unwrap();

    let err = pipeline.submit("drone market").await.unwrap_err();
    let timed_out_at = Instant::now();
    assert!(matches!(
        err,
        Error::Pipeline(PipelineError {
            stage: Stage::VideoDataFetch,
            cause: ExecutorFailure::Timeout,
        })
    ));

    // The pipeline still holds its client, so the socket closes only if the request
    // was actually cancelled
    let closed_at = tokio::time::timeout(Duration::from_secs(2), closed)
        .await
        .expect("video data connection still open after the deadline")
        .unwrap();
    assert!(closed_at.saturating_duration_since(timed_out_at) < Duration::from_secs(1));
    assert_eq!(pipeline.phase(), Phase::Idle);
    assert_eq!(
        received_paths(&server).await,
        vec![GENERATE_QUERIES, GET_CHANNELS]
    );
}

#[tokio::test]
async fn query_generation_timeout_uses_its_own_message() {
    let server = MockServer::start().await;
    mount_stage(
        &server,
        GENERATE_QUERIES,
        ResponseTemplate::new(200)
            .set_body_json(queries_body())
            .set_delay(Duration::from_secs(10)),
    )
    .await;

    let pipeline = pipeline_for(&server, StageTimeouts::uniform(Duration::from_millis(150)));
    pipeline.submit("drone market").await.unwrap_err();

    let error = pipeline.error().unwrap();
    assert_eq!(error.stage, Stage::QueryGeneration);
    assert_eq!(error.message(), "LLM request timed out");
    assert_eq!(received_paths(&server).await, vec![GENERATE_QUERIES]);
}

#[tokio::test]
async fn submission_during_slow_channel_fetch_is_rejected() {
    let server = MockServer::start().await;
    mount_stage(
        &server,
        GENERATE_QUERIES,
        ResponseTemplate::new(200).set_body_json(queries_body()),
    )
    .await;
    mount_stage(
        &server,
        GET_CHANNELS,
        ResponseTemplate::new(200)
            .set_body_json(channels_body())
            .set_delay(Duration::from_millis(500)),
    )
    .await;
    mount_stage(
        &server,
        GET_VIDEO_DATA,
        ResponseTemplate::new(200).set_body_json(video_data_body()),
    )
    .await;

    let pipeline = pipeline_for(&server, StageTimeouts::default());
    let run = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.submit("drone market").await }
    });

    let mut state = pipeline.watch();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| s.phase() == Phase::FetchingChannels),
    )
    .await
    .unwrap()
    .unwrap();

    let err = pipeline.submit("another market").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Busy {
            phase: Phase::FetchingChannels
        }
    ));

    let metrics = run.await.unwrap().unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(
        received_paths(&server).await,
        vec![GENERATE_QUERIES, GET_CHANNELS, GET_VIDEO_DATA]
    );
}

#[tokio::test]
async fn blank_input_sends_nothing() {
    let server = happy_backend().await;
    let pipeline = pipeline_for(&server, StageTimeouts::default());

    let err = pipeline.submit("   ").await.unwrap_err();

    assert!(matches!(err, Error::BlankInput));
    assert_eq!(pipeline.phase(), Phase::Idle);
    assert!(received_paths(&server).await.is_empty());
}

#[tokio::test]
async fn resubmission_after_failure_recovers() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path(GENERATE_QUERIES))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_stage(
        &server,
        GENERATE_QUERIES,
        ResponseTemplate::new(200).set_body_json(queries_body()),
    )
    .await;
    mount_stage(
        &server,
        GET_CHANNELS,
        ResponseTemplate::new(200).set_body_json(channels_body()),
    )
    .await;
    mount_stage(
        &server,
        GET_VIDEO_DATA,
        ResponseTemplate::new(200).set_body_json(video_data_body()),
    )
    .await;

    let pipeline = pipeline_for(&server, StageTimeouts::default());

    pipeline.submit("drone market").await.unwrap_err();
    assert_eq!(
        pipeline.error().unwrap().message(),
        "Error generating queries: Status 503"
    );

    let metrics = pipeline.submit("drone market").await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert!(pipeline.error().is_none());
}

#[tokio::test]
async fn pipeline_from_json_config_file() {
    let server = happy_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let document = json!({
        "backend": { "base_url": server.uri() },
        "timeouts": { "video_data_fetch_ms": 5000 }
    });
    tokio::fs::write(&config_path, document.to_string())
        .await
        .unwrap();

    let config = Config::from_json_file(&config_path).await.unwrap();
    assert_eq!(config.timeouts.video_data_fetch, Duration::from_secs(5));
    assert_eq!(config.timeouts.query_generation, Duration::from_secs(10));

    let pipeline = channel_insights::Pipeline::from_config(&config).unwrap();
    let metrics = pipeline.submit("drone market").await.unwrap();
    assert_eq!(metrics[0].video_count, 42);
}
