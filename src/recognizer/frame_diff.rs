// src/recognizer/frame_diff.rs
//
// Lazy-mode static frame check. Each frame is shrunk onto a small scratch
// canvas, then about 1% of its pixels are compared (RGB, alpha ignored)
// against the last frame that was not static.

use crate::detection::Frame;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::debug;

const SAMPLE_FRACTION: usize = 100;

pub struct FrameSampler {
    canvas_width: u32,
    canvas_height: u32,
    previous: Option<Vec<u8>>,
}

impl FrameSampler {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            previous: None,
        }
    }

    /// True when the sampled difference against the previous kept frame
    /// is exactly zero. A non-static frame becomes the new reference.
    pub fn is_static(&mut self, frame: &Frame) -> bool {
        let Some(current) = self.downsample(frame) else {
            debug!("Frame {} has an invalid pixel buffer", frame.frame_id);
            self.previous = None;
            return false;
        };

        if let Some(previous) = &self.previous {
            if previous.len() == current.len() && sampled_difference(previous, &current) == 0 {
                return true;
            }
        }
        self.previous = Some(current);
        false
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    fn downsample(&self, frame: &Frame) -> Option<Vec<u8>> {
        let width = u32::try_from(frame.width).ok()?;
        let height = u32::try_from(frame.height).ok()?;
        let image = RgbaImage::from_raw(width, height, frame.data.clone())?;

        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Some(image.into_raw());
        }
        let small = imageops::resize(
            &image,
            self.canvas_width,
            self.canvas_height,
            FilterType::Nearest,
        );
        Some(small.into_raw())
    }
}

/// Sum of absolute RGB differences over every `pixels / 100`-th pixel.
pub fn sampled_difference(previous: &[u8], current: &[u8]) -> u64 {
    let pixels = previous.len().min(current.len()) / 4;
    let stride = (pixels / SAMPLE_FRACTION).max(1);

    (0..pixels)
        .step_by(stride)
        .map(|p| {
            let i = p * 4;
            (0..3)
                .map(|c| previous[i + c].abs_diff(current[i + c]) as u64)
                .sum::<u64>()
        })
        .sum()
}
