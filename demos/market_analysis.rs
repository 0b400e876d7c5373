//! Market analysis example
//!
//! Runs the pipeline once against a backend and prints the per-channel metrics,
//! or hosts the REST API when started with `--serve`.
//!
//! ```text
//! cargo run --example market_analysis -- "drone market"
//! cargo run --example market_analysis -- --serve
//! ```
//!
//! Set `CHANNEL_INSIGHTS_CONFIG` to a JSON config file to override the defaults
//! (backend at http://127.0.0.1:8000, API on 127.0.0.1:6790).

use channel_insights::{Config, Event, Pipeline, PipelineView, run_with_shutdown};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channel_insights=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::var("CHANNEL_INSIGHTS_CONFIG") {
        Ok(path) => Config::from_json_file(path).await?,
        Err(_) => Config::default(),
    };
    let pipeline = Pipeline::from_config(&config)?;

    let input: Vec<String> = std::env::args().skip(1).collect();
    if input.first().map(String::as_str) == Some("--serve") {
        let base = format!("http://{}/api/v1", config.api.bind_address);
        println!("📡 API Base: {base}");
        println!("🔄 Events stream: {base}/events");
        println!();
        println!("  curl -X POST {base}/submit \\");
        println!("    -H 'Content-Type: application/json' \\");
        println!("    -d '{{\"message\": \"drone market\"}}'");
        println!("  curl {base}/state");
        println!();
        run_with_shutdown(pipeline, config).await?;
        return Ok(());
    }

    let message = if input.is_empty() {
        "drone market".to_string()
    } else {
        input.join(" ")
    };

    let mut events = pipeline.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::PhaseChanged { to, .. } => {
                    if let Some(label) = channel_insights::view::progress_label(to) {
                        println!("⏳ {label}");
                    }
                }
                Event::StageCompleted {
                    stage,
                    items,
                    elapsed_ms,
                } => {
                    println!("✓ {stage}: {items} item(s) in {elapsed_ms} ms");
                }
                Event::RunFailed { message, .. } => {
                    println!("✗ {message}");
                }
                _ => {}
            }
        }
    });

    let view = run_once(&pipeline, &message).await?;
    print_results(&view);
    Ok(())
}

/// Run one submission, returning the final view or the run's error
async fn run_once(pipeline: &Pipeline, message: &str) -> channel_insights::Result<PipelineView> {
    pipeline.submit(message).await?;
    Ok(pipeline.view())
}

fn print_results(view: &PipelineView) {
    if view.metrics.is_empty() {
        println!("No channels found.");
        return;
    }

    println!();
    println!("{:<32} {:>14} {:>14} {:>8}", "Channel", "Subscribers", "Views", "Videos");
    for m in &view.metrics {
        println!(
            "{:<32} {:>14} {:>14} {:>8}",
            m.name(),
            m.channel.subscriber_count,
            m.view_count,
            m.video_count
        );
    }
}
