// src/replay.rs
//
// Offline replay of a recorded session: a directory of frame images plus a
// landmarks.jsonl file holding the detector output captured for each frame.
// The recorded output stands in for a live hand detector.

use crate::detection::{DetectorResult, Frame, HandDetector};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One line of landmarks.jsonl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedDetection {
    pub frame_id: u64,
    #[serde(flatten)]
    pub result: DetectorResult,
}

pub struct ReplayDetector {
    results: HashMap<u64, DetectorResult>,
}

impl ReplayDetector {
    pub fn from_jsonl(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let detector = Self::parse_jsonl(&contents)?;
        info!(
            "✓ Loaded {} recorded detections from {}",
            detector.results.len(),
            path.display()
        );
        Ok(detector)
    }

    pub fn parse_jsonl(contents: &str) -> Result<Self> {
        let mut results = HashMap::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let recorded: RecordedDetection = serde_json::from_str(line)
                .with_context(|| format!("Invalid detection on line {}", line_no + 1))?;
            if results.insert(recorded.frame_id, recorded.result).is_some() {
                warn!("Duplicate detection for frame {}, keeping last", recorded.frame_id);
            }
        }
        Ok(Self { results })
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[async_trait]
impl HandDetector for ReplayDetector {
    async fn detect(&self, frame: &Frame) -> Result<DetectorResult> {
        match self.results.get(&frame.frame_id) {
            Some(result) => Ok(result.clone()),
            None => {
                debug!("No recorded detection for frame {}", frame.frame_id);
                Ok(DetectorResult::default())
            }
        }
    }
}

/// Frame images under `dir`, sorted by path.
pub fn find_frame_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_frame {
            frames.push(path.to_path_buf());
        }
    }

    frames.sort();
    info!("Found {} frame images in {}", frames.len(), dir.display());
    Ok(frames)
}

pub fn load_frame(path: &Path, frame_id: u64, timestamp_ms: f64) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(
        frame_id,
        image.into_raw(),
        width as usize,
        height as usize,
        timestamp_ms,
    ))
}
