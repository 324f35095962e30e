// src/inference.rs
//
// Inference engine contract plus the ONNX Runtime implementation.
//
// A backend turns model bytes + parsed metadata into a session; a session
// takes a `[memory_frame, active_slots * 3]` tensor and returns raw
// per-label scores.

use crate::model_package::ModelConfig;
use crate::sequence::FlatTensor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

pub trait InferenceBackend: Send + Sync {
    fn initialize(&self, model: &[u8], config: &ModelConfig) -> Result<Box<dyn InferenceSession>>;
}

#[async_trait]
pub trait InferenceSession: Send {
    async fn run(&mut self, input: &FlatTensor) -> Result<Vec<f32>>;
}

// ============================================================================
// ONNX RUNTIME
// ============================================================================

pub struct OrtBackend {
    num_threads: usize,
}

impl OrtBackend {
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }
}

impl InferenceBackend for OrtBackend {
    fn initialize(&self, model: &[u8], config: &ModelConfig) -> Result<Box<dyn InferenceSession>> {
        info!("Building ONNX Runtime session for '{}'", config.name);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.num_threads)?
            .with_inter_threads(1)?
            .commit_from_memory(model)
            .context("Failed to load model")?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("Model declares no inputs")?;

        info!("✓ Session ready (input '{}')", input_name);

        Ok(Box::new(OrtSession {
            session,
            input_name,
        }))
    }
}

struct OrtSession {
    session: Session,
    input_name: String,
}

#[async_trait]
impl InferenceSession for OrtSession {
    async fn run(&mut self, input: &FlatTensor) -> Result<Vec<f32>> {
        let shape = [1, input.shape[0], input.shape[1]];

        let input_value = ort::value::Value::from_array((
            shape.as_slice(),
            input.data.clone().into_boxed_slice(),
        ))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])?;

        let (output_shape, scores) = outputs[0].try_extract_tensor::<f32>()?;
        debug!("Model output shape: {:?}", output_shape);

        Ok(scores.to_vec())
    }
}

// ============================================================================
// SCORE HELPERS
// ============================================================================

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

/// Index of the largest value; first wins on ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if *v <= b => best,
            _ => Some((i, *v)),
        })
        .map(|(i, _)| i)
}
