// src/recognizer/streaming.rs
//
// Live sign recognition over a frame stream.
//
// Per call: empty/busy check → optional static-frame skip → hand detection
// → push to window → (clock tick due) inference → cached prediction.
//
// Only one prediction runs per recognizer at a time. A call that finds one
// in flight returns the cached prediction instead of waiting. Per-frame
// failures (no model yet, detector error, engine error) are logged and
// leave the cached prediction as it was.

use crate::detection::{Frame, HandDetector};
use crate::gestures::GestureRecord;
use crate::inference::{argmax, softmax};
use crate::model_package::{LoadedModel, ModelPackageLoader};
use crate::pipeline::metrics::RecognizerMetrics;
use crate::recognizer::clock::Clock;
use crate::recognizer::frame_diff::FrameSampler;
use crate::sequence::GestureSequence;
use crate::types::RecognizerConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const NO_SIGN_ID: i32 = -1;
pub const NO_SIGN_LABEL: &str = "Null";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub sign_id: i32,
    pub sign_label: String,
    /// Features extracted from the most recent detection with hands.
    pub landmarks: Option<GestureRecord>,
}

impl Prediction {
    pub fn none() -> Self {
        Self {
            sign_id: NO_SIGN_ID,
            sign_label: NO_SIGN_LABEL.to_string(),
            landmarks: None,
        }
    }

    pub fn is_sign(&self) -> bool {
        self.sign_id >= 0
    }
}

impl Default for Prediction {
    fn default() -> Self {
        Self::none()
    }
}

/// Result of a fire-and-forget `predict`: the cached prediction at call
/// time, plus the spawned task when a new prediction was started.
pub struct PredictTicket {
    pub latest: Prediction,
    pub task: Option<JoinHandle<Prediction>>,
}

impl PredictTicket {
    pub fn started(&self) -> bool {
        self.task.is_some()
    }

    /// Outcome of the spawned prediction, or `latest` if none was started.
    pub async fn wait(self) -> Prediction {
        match self.task {
            Some(task) => match task.await {
                Ok(prediction) => prediction,
                Err(e) => {
                    error!("Prediction task failed: {}", e);
                    self.latest
                }
            },
            None => self.latest,
        }
    }
}

struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct RecognizerState {
    window: GestureSequence,
    clock: Clock,
    sampler: FrameSampler,
}

pub struct StreamingRecognizer {
    detector: Arc<dyn HandDetector>,
    models: Arc<ModelPackageLoader>,
    config: RecognizerConfig,
    state: tokio::sync::Mutex<RecognizerState>,
    last_prediction: Mutex<Prediction>,
    busy: Arc<AtomicBool>,
    metrics: RecognizerMetrics,
}

impl StreamingRecognizer {
    pub fn new(
        detector: Arc<dyn HandDetector>,
        models: Arc<ModelPackageLoader>,
        config: RecognizerConfig,
    ) -> Self {
        info!(
            "Recognizer: {:.1} Hz inference, lazy canvas {}x{}, history {}",
            config.clock_speed_hz,
            config.lazy_canvas_width,
            config.lazy_canvas_height,
            config.max_history_frames
        );

        let state = RecognizerState {
            window: GestureSequence::new("live", Vec::new()),
            clock: Clock::new(config.clock_speed_hz),
            sampler: FrameSampler::new(config.lazy_canvas_width, config.lazy_canvas_height),
        };

        Self {
            detector,
            models,
            config,
            state: tokio::sync::Mutex::new(state),
            last_prediction: Mutex::new(Prediction::none()),
            busy: Arc::new(AtomicBool::new(false)),
            metrics: RecognizerMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &RecognizerMetrics {
        &self.metrics
    }

    pub fn last_prediction(&self) -> Prediction {
        self.last_prediction
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn window_len(&self) -> usize {
        self.state.lock().await.window.len()
    }

    pub async fn set_clock_speed(&self, clock_speed_hz: f64) {
        self.state.lock().await.clock.set_clock_speed(clock_speed_hz);
    }

    pub async fn real_clock_speed(&self) -> f64 {
        self.state.lock().await.clock.real_clock_speed()
    }

    /// Drop the window and the cached prediction.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.window.clear();
        state.clock.reset();
        state.sampler.reset();
        self.store(Prediction::none());
    }

    /// Start a prediction in the background unless one is already running.
    pub fn predict(self: &Arc<Self>, frame: Frame, lazy: bool) -> PredictTicket {
        let latest = self.last_prediction();
        self.metrics.inc(&self.metrics.predict_calls);

        if frame.is_empty() {
            self.metrics.inc(&self.metrics.empty_frames);
            return PredictTicket { latest, task: None };
        }
        let Some(guard) = BusyGuard::acquire(&self.busy) else {
            self.metrics.inc(&self.metrics.busy_skips);
            return PredictTicket { latest, task: None };
        };

        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.run(&frame, lazy, guard).await });
        PredictTicket {
            latest,
            task: Some(task),
        }
    }

    /// Run one prediction to completion, or return the cached one if a
    /// prediction is already in flight.
    pub async fn predict_async(&self, frame: &Frame, lazy: bool) -> Prediction {
        self.metrics.inc(&self.metrics.predict_calls);

        if frame.is_empty() {
            self.metrics.inc(&self.metrics.empty_frames);
            return self.last_prediction();
        }
        let Some(guard) = BusyGuard::acquire(&self.busy) else {
            self.metrics.inc(&self.metrics.busy_skips);
            return self.last_prediction();
        };

        self.run(frame, lazy, guard).await
    }

    async fn run(&self, frame: &Frame, lazy: bool, _guard: BusyGuard) -> Prediction {
        let mut state = self.state.lock().await;

        if lazy && state.sampler.is_static(frame) {
            self.metrics.inc(&self.metrics.static_skips);
            debug!("Frame {} unchanged, reusing prediction", frame.frame_id);
            return self.last_prediction();
        }

        let detection = match self.detector.detect(frame).await {
            Ok(detection) => detection,
            Err(e) => {
                self.metrics.inc(&self.metrics.detector_failures);
                warn!("Hand detection failed on frame {}: {:#}", frame.frame_id, e);
                return self.last_prediction();
            }
        };

        if detection.is_empty() {
            self.metrics.inc(&self.metrics.frames_without_hands);
            let prediction = Prediction::none();
            self.store(prediction.clone());
            return prediction;
        }
        self.metrics.inc(&self.metrics.frames_with_hands);

        let model = self.models.current();
        let record = GestureRecord::from_detector_result(&detection, None);
        let history = model
            .as_ref()
            .map_or(0, |m| m.config.memory_frame)
            .max(self.config.max_history_frames);

        state.window.insert_at_head(record.clone());
        state.window.trim_to(history);
        self.update_landmarks(record);

        if !state.clock.is_time_to_run() {
            return self.last_prediction();
        }

        let Some(model) = model else {
            self.metrics.inc(&self.metrics.not_ready);
            error!("Sign recognizer model is not loaded yet");
            return self.last_prediction();
        };

        state.window.trim_to(model.config.memory_frame);
        match self.recognize(&state.window, &model).await {
            Some((sign_id, sign_label)) => {
                let mut cached = self.last_prediction.lock().unwrap_or_else(|e| e.into_inner());
                cached.sign_id = sign_id;
                cached.sign_label = sign_label;
                cached.clone()
            }
            None => self.last_prediction(),
        }
    }

    async fn recognize(
        &self,
        window: &GestureSequence,
        model: &LoadedModel,
    ) -> Option<(i32, String)> {
        let folded;
        let input = if model.config.one_side {
            let mut copy = window.clone();
            copy.move_to_one_side(true);
            folded = copy;
            &folded
        } else {
            window
        };

        let tensor = input.to_flat_tensor(model.config.memory_frame, &model.active_slots);

        let started = Instant::now();
        let scores = match model.infer(&tensor).await {
            Ok(scores) => scores,
            Err(e) => {
                self.metrics.inc(&self.metrics.inference_failures);
                error!("Inference failed: {:#}", e);
                return None;
            }
        };
        self.metrics.inc(&self.metrics.inferences);
        self.metrics
            .set_timing(&self.metrics.inference_time_us, started.elapsed().as_micros() as u64);

        let probabilities = softmax(&scores);
        let Some(index) = argmax(&probabilities) else {
            self.metrics.inc(&self.metrics.inference_failures);
            error!("Model '{}' returned no scores", model.config.name);
            return None;
        };

        match model.config.label(index) {
            Some(label) => {
                debug!("Sign {} '{}' ({:.3})", index, label, probabilities[index]);
                Some((index as i32, label.to_string()))
            }
            None => {
                warn!(
                    "Label index {} out of range for model '{}' ({} labels)",
                    index,
                    model.config.name,
                    model.config.labels.len()
                );
                Some((NO_SIGN_ID, NO_SIGN_LABEL.to_string()))
            }
        }
    }

    fn store(&self, prediction: Prediction) {
        *self.last_prediction.lock().unwrap_or_else(|e| e.into_inner()) = prediction;
    }

    fn update_landmarks(&self, record: GestureRecord) {
        self.last_prediction
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .landmarks = Some(record);
    }
}
