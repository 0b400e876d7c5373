//! Common test utilities for end-to-end pipeline tests against a mock backend

#![allow(dead_code)]

use channel_insights::{Config, Event, Pipeline, StageTimeouts};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GENERATE_QUERIES: &str = "/api/generate-queries";
pub const GET_CHANNELS: &str = "/api/get-channels";
pub const GET_VIDEO_DATA: &str = "/api/get-video-data";

pub fn queries_body() -> Value {
    json!({"queries": ["drone sales 2024"]})
}

pub fn channels_body() -> Value {
    json!({"channels": [{"id": "c1", "name": "DroneTube", "subscriberCount": 10000}]})
}

pub fn video_data_body() -> Value {
    json!({"channels": [{
        "id": "c1",
        "name": "DroneTube",
        "subscriberCount": 10000,
        "viewCount": 500000,
        "videoCount": 42
    }]})
}

/// Mount a POST handler for one stage endpoint
pub async fn mount_stage(server: &MockServer, endpoint: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A backend where every stage answers with the drone-market fixtures
pub async fn happy_backend() -> MockServer {
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
        ResponseTemplate::new(200).set_body_json(video_data_body()),
    )
    .await;
    server
}

/// A raw TCP endpoint that accepts one connection, reads the request and never answers
///
/// Returns the endpoint's base URL and a task resolving to the instant the client
/// closed the connection.
pub async fn silent_endpoint() -> (String, JoinHandle<Instant>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let closed = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return Instant::now(),
                Ok(_) => continue,
            }
        }
    });
    (format!("http://{addr}"), closed)
}

/// Config pointing at `server`
pub fn config_for(server: &MockServer, timeouts: StageTimeouts) -> Config {
    let mut config = Config::default();
    config.backend.base_url = server.uri();
    config.timeouts = timeouts;
    config
}

/// HTTP-backed pipeline pointing at `server`
pub fn pipeline_for(server: &MockServer, timeouts: StageTimeouts) -> Pipeline {
    Pipeline::from_config(&config_for(server, timeouts)).unwrap()
}

/// Paths of all requests the backend received, in order
pub async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

/// Collect events until `stop` matches one or `timeout` elapses
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    stop: F,
) -> Vec<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let done = stop(&event);
            collected.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    collected
}
