// src/lib.rs
//
// Streaming sign language recognition: hand landmarks in, sign labels out.

pub mod config;
pub mod detection;
pub mod error;
pub mod gestures;
pub mod inference;
pub mod model_package;
pub mod pipeline;
pub mod recognizer;
pub mod replay;
pub mod sequence;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{GestureError, LoadError};
pub use model_package::{ModelConfig, ModelPackageLoader, PackageSource};
pub use recognizer::{Prediction, StreamingRecognizer};
pub use sequence::GestureSequence;
