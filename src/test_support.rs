// src/test_support.rs
//
// In-memory stand-ins for the external engines, shared by unit tests.

use crate::detection::{DetectorResult, Frame, HandDetection, HandDetector, Handedness, Landmark};
use crate::inference::{InferenceBackend, InferenceSession};
use crate::model_package::{ModelConfig, PackageFetcher, PackageStore};
use crate::sequence::FlatTensor;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MODEL_BYTES: &[u8] = b"fake-onnx-graph";

pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, bytes) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn metadata_json(name: &str, labels: &[&str]) -> String {
    serde_json::json!({
        "labels": labels,
        "label_explicit": labels,
        "memory_frame": 4,
        "active_gestures": { "r_hand_position": true, "r_wrist": false },
        "label_map": {},
        "one_side": false,
        "name": name,
        "d_model": 32,
        "num_heads": 2,
        "num_layers": 1,
        "ff_dim": 64
    })
    .to_string()
}

pub fn package(name: &str, labels: &[&str]) -> Vec<u8> {
    let meta = metadata_json(name, labels);
    zip_of(&[("model.onnx", MODEL_BYTES), ("metadata.json", meta.as_bytes())])
}

// ============================================================================
// INFERENCE
// ============================================================================

pub struct FakeBackend {
    scores: Arc<Mutex<Vec<f32>>>,
    inputs: Arc<Mutex<Vec<FlatTensor>>>,
    initialized: Mutex<Vec<Vec<u8>>>,
    fail_next: AtomicBool,
}

impl FakeBackend {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores: Arc::new(Mutex::new(scores)),
            inputs: Arc::new(Mutex::new(Vec::new())),
            initialized: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn set_scores(&self, scores: Vec<f32>) {
        *self.scores.lock().unwrap() = scores;
    }

    pub fn initialized(&self) -> Vec<Vec<u8>> {
        self.initialized.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<FlatTensor> {
        self.inputs.lock().unwrap().clone()
    }
}

impl InferenceBackend for FakeBackend {
    fn initialize(&self, model: &[u8], _config: &ModelConfig) -> Result<Box<dyn InferenceSession>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("engine rejected model"));
        }
        self.initialized.lock().unwrap().push(model.to_vec());
        Ok(Box::new(FakeSession {
            scores: self.scores.clone(),
            inputs: self.inputs.clone(),
        }))
    }
}

struct FakeSession {
    scores: Arc<Mutex<Vec<f32>>>,
    inputs: Arc<Mutex<Vec<FlatTensor>>>,
}

#[async_trait]
impl InferenceSession for FakeSession {
    async fn run(&mut self, input: &FlatTensor) -> Result<Vec<f32>> {
        self.inputs.lock().unwrap().push(input.clone());
        Ok(self.scores.lock().unwrap().clone())
    }
}

// ============================================================================
// PACKAGE SOURCES
// ============================================================================

/// `None` content means the file exists but cannot be read.
#[derive(Default)]
pub struct MemoryStore {
    files: HashMap<PathBuf, Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn with(path: &str, bytes: Vec<u8>) -> Self {
        let mut store = Self::default();
        store.files.insert(path.into(), Some(bytes));
        store
    }

    pub fn unreadable(path: &str) -> Self {
        let mut store = Self::default();
        store.files.insert(path.into(), None);
        store
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        match self.files.get(path) {
            Some(Some(bytes)) => Ok(bytes.clone()),
            Some(None) => Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "unreadable",
            )),
            None => Err(std::io::ErrorKind::NotFound.into()),
        }
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<String, Vec<u8>>,
}

impl FakeFetcher {
    pub fn with(url: &str, bytes: Vec<u8>) -> Self {
        let mut fetcher = Self::default();
        fetcher.insert(url, bytes);
        fetcher
    }

    pub fn insert(&mut self, url: &str, bytes: Vec<u8>) {
        self.responses.insert(url.to_string(), bytes);
    }
}

#[async_trait]
impl PackageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404 for {}", url))
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

/// Pops queued results; repeats the default once the queue is empty.
pub struct FakeDetector {
    queue: Mutex<VecDeque<Result<DetectorResult>>>,
    default: DetectorResult,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeDetector {
    pub fn new(default: DetectorResult) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, result: Result<DetectorResult>) {
        self.queue.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HandDetector for FakeDetector {
    async fn detect(&self, _frame: &Frame) -> Result<DetectorResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.queue.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(self.default.clone()))
    }
}

pub fn right_hand_at(x: f32, y: f32) -> DetectorResult {
    DetectorResult {
        hands: vec![HandDetection {
            handedness: Handedness::Right,
            world_landmarks: [Landmark::new(0.01, 0.02, 0.03); 21],
            wrist: Landmark::new(x, y, 0.0),
        }],
    }
}

pub fn frame(id: u64, fill: u8) -> Frame {
    Frame::new(id, vec![fill; 64 * 48 * 4], 64, 48, id as f64 * 33.3)
}
