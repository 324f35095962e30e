// src/recognizer/mod.rs

pub mod clock;
pub mod frame_diff;
pub mod streaming;

pub use clock::Clock;
pub use frame_diff::FrameSampler;
pub use streaming::{Prediction, PredictTicket, StreamingRecognizer, NO_SIGN_ID, NO_SIGN_LABEL};
