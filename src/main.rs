// src/main.rs

use anyhow::{Context, Result};
use sign_recognizer::inference::OrtBackend;
use sign_recognizer::model_package::{HttpFetcher, LocalStore, ModelPackageLoader};
use sign_recognizer::recognizer::{PredictTicket, StreamingRecognizer};
use sign_recognizer::replay::{self, ReplayDetector};
use sign_recognizer::types::Config;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("🤟 Sign Recognizer Starting");
    info!("✓ Configuration loaded from {}", config_path);

    let models = Arc::new(
        ModelPackageLoader::new(
            Arc::new(OrtBackend::new(config.inference.num_threads)),
            Arc::new(LocalStore),
            Arc::new(HttpFetcher::new()),
        )
        .with_model_extension(config.model.extension.clone()),
    );
    models
        .load(&config.model.source())
        .await
        .context("Failed to load model package")?;

    let input_dir = Path::new(&config.replay.input_dir);
    let detector = ReplayDetector::from_jsonl(&input_dir.join(&config.replay.landmarks_file))?;
    let frames = replay::find_frame_files(input_dir)?;
    if frames.is_empty() {
        error!("No frame images found in {}", input_dir.display());
        return Ok(());
    }

    let recognizer = Arc::new(StreamingRecognizer::new(
        Arc::new(detector),
        models,
        config.recognizer.clone(),
    ));

    let framerate = if config.replay.framerate > 0.0 {
        config.replay.framerate
    } else {
        30.0
    };
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / framerate));
    let mut current_label = String::new();
    let mut pending: Option<PredictTicket> = None;

    info!("Replaying {} frames at {:.1} FPS", frames.len(), framerate);

    for (idx, path) in frames.iter().enumerate() {
        interval.tick().await;

        let timestamp_ms = idx as f64 * 1000.0 / framerate;
        let frame = match replay::load_frame(path, idx as u64, timestamp_ms) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                continue;
            }
        };

        let ticket = recognizer.predict(frame, config.recognizer.lazy);
        if ticket.latest.sign_label != current_label {
            info!(
                "[{:>8.1}ms] sign {} '{}'",
                timestamp_ms, ticket.latest.sign_id, ticket.latest.sign_label
            );
            current_label = ticket.latest.sign_label.clone();
        }
        if ticket.started() {
            pending = Some(ticket);
        }
    }

    if let Some(ticket) = pending {
        let last = ticket.wait().await;
        info!("Final prediction: {} '{}'", last.sign_id, last.sign_label);
    }

    info!(
        "Measured inference rate: {:.1} Hz",
        recognizer.real_clock_speed().await
    );
    let summary = recognizer.metrics().summary();
    info!("✓ Replay complete\n{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
