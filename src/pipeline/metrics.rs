// src/pipeline/metrics.rs
//
// Recognizer counters. Cheap to clone, shared between the recognizer and
// whoever reports on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct RecognizerMetrics {
    pub predict_calls: Arc<AtomicU64>,
    pub empty_frames: Arc<AtomicU64>,
    pub busy_skips: Arc<AtomicU64>,
    pub static_skips: Arc<AtomicU64>,
    pub frames_with_hands: Arc<AtomicU64>,
    pub frames_without_hands: Arc<AtomicU64>,
    pub detector_failures: Arc<AtomicU64>,
    pub not_ready: Arc<AtomicU64>,
    pub inferences: Arc<AtomicU64>,
    pub inference_failures: Arc<AtomicU64>,
    pub inference_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl RecognizerMetrics {
    pub fn new() -> Self {
        Self {
            predict_calls: Arc::new(AtomicU64::new(0)),
            empty_frames: Arc::new(AtomicU64::new(0)),
            busy_skips: Arc::new(AtomicU64::new(0)),
            static_skips: Arc::new(AtomicU64::new(0)),
            frames_with_hands: Arc::new(AtomicU64::new(0)),
            frames_without_hands: Arc::new(AtomicU64::new(0)),
            detector_failures: Arc::new(AtomicU64::new(0)),
            not_ready: Arc::new(AtomicU64::new(0)),
            inferences: Arc::new(AtomicU64::new(0)),
            inference_failures: Arc::new(AtomicU64::new(0)),
            inference_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn calls_per_second(&self) -> f64 {
        let calls = self.predict_calls.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            calls as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            predict_calls: self.predict_calls.load(Ordering::Relaxed),
            calls_per_second: self.calls_per_second(),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
            busy_skips: self.busy_skips.load(Ordering::Relaxed),
            static_skips: self.static_skips.load(Ordering::Relaxed),
            frames_with_hands: self.frames_with_hands.load(Ordering::Relaxed),
            frames_without_hands: self.frames_without_hands.load(Ordering::Relaxed),
            detector_failures: self.detector_failures.load(Ordering::Relaxed),
            not_ready: self.not_ready.load(Ordering::Relaxed),
            inferences: self.inferences.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            last_inference_us: self.inference_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for RecognizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub predict_calls: u64,
    pub calls_per_second: f64,
    pub empty_frames: u64,
    pub busy_skips: u64,
    pub static_skips: u64,
    pub frames_with_hands: u64,
    pub frames_without_hands: u64,
    pub detector_failures: u64,
    pub not_ready: u64,
    pub inferences: u64,
    pub inference_failures: u64,
    pub last_inference_us: u64,
    pub elapsed_secs: f64,
}
