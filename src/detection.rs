// src/detection.rs
//
// Boundary with the external hand landmark detector.
//
// The detector itself is not part of this crate. Given a frame it returns
// zero or more hands, each with a handedness label, 21 world-space joint
// keypoints (detector order, wrist first) and the image-space wrist
// position used as whole-hand placement.

use crate::gestures::schema::{Side, JOINTS_PER_HAND};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw video frame, RGBA8 row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_id: u64,
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(
        frame_id: u64,
        data: Vec<u8>,
        width: usize,
        height: usize,
        timestamp_ms: f64,
    ) -> Self {
        Self {
            frame_id,
            data,
            width,
            height,
            timestamp_ms,
        }
    }

    /// A frame with no pixels yet (camera still warming up).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn side(self) -> Side {
        match self {
            Handedness::Left => Side::Left,
            Handedness::Right => Side::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandDetection {
    pub handedness: Handedness,
    /// World-space joints in meters, wrist first.
    pub world_landmarks: [Landmark; JOINTS_PER_HAND],
    /// Normalized image-space wrist position.
    pub wrist: Landmark,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult {
    #[serde(default)]
    pub hands: Vec<HandDetection>,
}

impl DetectorResult {
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

#[async_trait]
pub trait HandDetector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> anyhow::Result<DetectorResult>;
}
