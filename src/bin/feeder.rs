//! Audio Feeder Application
//!
//! Reads raw s16le mono PCM from stdin and streams spectrum packets to
//! WLED controllers over UDP.
//!
//! ```text
//! parec --format=s16le --channels=1 --rate=44100 | feeder [config.toml]
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wled_audio_feeder::{config::AppConfig, pipeline::StreamLoop};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting WLED Audio Feeder");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load_or_default(config_path.as_deref())
        .context("failed to load configuration")?;

    tracing::info!(
        "Audio: {} Hz, {} byte chunks, {} block window",
        config.audio.sample_rate,
        config.audio.chunk_size,
        config.audio.ring_capacity()
    );

    let running = Arc::new(AtomicBool::new(true));

    // First Ctrl+C stops after the current cycle, a second one exits at once
    let signal_flag = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, shutting down");
            signal_flag.store(false, Ordering::SeqCst);
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Second Ctrl+C, exiting immediately");
            std::process::exit(130);
        }
    });

    let loop_flag = running.clone();
    let summary = tokio::task::spawn_blocking(move || {
        let mut stream = StreamLoop::from_config(&config, std::io::stdin())?;
        stream.run(&loop_flag)
    })
    .await
    .context("stream loop panicked")??;

    tracing::info!(
        "Audio streaming closed: {} packets sent, {} cycles skipped",
        summary.packets,
        summary.skipped
    );

    Ok(())
}
