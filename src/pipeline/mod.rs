// src/pipeline/mod.rs

pub mod metrics;

pub use metrics::{MetricsSummary, RecognizerMetrics};
