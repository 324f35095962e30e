// src/sequence.rs
//
// Rolling temporal window of gesture records, newest at index 0.
//
// Hand velocity is derived, never stored independently: after any change
// to the frame list, velocity[i] = position[i] - position[i + 1] for each
// side where both positions exist, and null otherwise. The oldest frame
// therefore always has null velocity.

use crate::error::GestureError;
use crate::gestures::{GestureRecord, Point3, Side, Slot, FEATURE_DIMENSION};
use ndarray::{ArrayView2, ShapeError};
use rand::Rng;

pub const DEFAULT_FRAMERATE: u32 = 30;

/// Row-major f32 buffer with logical shape `[frames, slots * 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTensor {
    pub data: Vec<f32>,
    pub shape: [usize; 2],
}

impl FlatTensor {
    pub fn view(&self) -> Result<ArrayView2<'_, f32>, ShapeError> {
        ArrayView2::from_shape((self.shape[0], self.shape[1]), &self.data)
    }

    /// Row for one frame.
    pub fn row(&self, frame: usize) -> &[f32] {
        let width = self.shape[1];
        &self.data[frame * width..(frame + 1) * width]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureSequence {
    pub label: String,
    pub framerate: u32,
    pub mirrorable: bool,
    frames: Vec<GestureRecord>,
}

impl GestureSequence {
    pub fn new(label: impl Into<String>, frames: Vec<GestureRecord>) -> Self {
        Self::with_options(label, frames, DEFAULT_FRAMERATE, true)
    }

    pub fn with_options(
        label: impl Into<String>,
        frames: Vec<GestureRecord>,
        framerate: u32,
        mirrorable: bool,
    ) -> Self {
        let mut seq = Self {
            label: label.into(),
            framerate,
            mirrorable,
            frames,
        };
        seq.compute_hand_velocity();
        seq
    }

    /// Rebuild from stored flat data, `slots.len() * 3` values per frame.
    pub fn from_flat(
        label: impl Into<String>,
        raw: &[f32],
        slots: Option<&[Slot]>,
    ) -> Result<Self, GestureError> {
        let width = slots.map_or(Slot::ALL.len(), |s| s.len()) * FEATURE_DIMENSION;
        if width == 0 || raw.len() % width != 0 {
            return Err(GestureError::ShapeMismatch {
                expected: width,
                actual: raw.len(),
            });
        }

        let frames = raw
            .chunks_exact(width)
            .map(|chunk| GestureRecord::unflatten(chunk, slots))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(label, frames))
    }

    pub fn frames(&self) -> &[GestureRecord] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn newest(&self) -> Option<&GestureRecord> {
        self.frames.first()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn insert_at_head(&mut self, record: GestureRecord) -> &mut Self {
        self.insert_at(0, record)
    }

    /// Insert at `position` (clamped to the current length).
    pub fn insert_at(&mut self, position: usize, record: GestureRecord) -> &mut Self {
        let position = position.min(self.frames.len());
        self.frames.insert(position, record);
        self.compute_hand_velocity();
        self
    }

    /// Drop the oldest frames until at most `max_length` remain.
    pub fn trim_to(&mut self, max_length: usize) -> &mut Self {
        if self.frames.len() > max_length {
            self.frames.truncate(max_length);
            self.compute_hand_velocity();
        }
        self
    }

    pub fn compute_hand_velocity(&mut self) -> &mut Self {
        let n = self.frames.len();
        for i in 0..n {
            for side in [Side::Left, Side::Right] {
                let pos = Slot::hand_position(side);
                let velocity = if i + 1 < n {
                    match (self.frames[i].get(pos), self.frames[i + 1].get(pos)) {
                        (Some(a), Some(b)) => Some([a[0] - b[0], a[1] - b[1], a[2] - b[2]]),
                        _ => None,
                    }
                } else {
                    None
                };
                self.frames[i].set(Slot::hand_velocity(side), velocity);
            }
        }
        self
    }

    /// Linearly resample to exactly `target_frames` evenly spaced frames.
    pub fn resample(&mut self, target_frames: usize) -> Result<&mut Self, GestureError> {
        if target_frames <= 1 {
            return Err(GestureError::InvalidFrameCount(target_frames));
        }
        if self.frames.is_empty() {
            return Err(GestureError::EmptySequence);
        }

        let last = (self.frames.len() - 1) as f32;
        let mut resampled = Vec::with_capacity(target_frames);

        for i in 0..target_frames {
            let progression = i as f32 / (target_frames - 1) as f32;
            let scaled = (progression * last).min(last);
            let start = scaled.floor() as usize;
            let end = scaled.ceil() as usize;
            let t = scaled - start as f32;

            let mut frame = GestureRecord::new();
            for slot in Slot::ALL {
                let value = lerp(self.frames[start].get(slot), self.frames[end].get(slot), t);
                frame.set(slot, value);
            }
            resampled.push(frame);
        }

        self.frames = resampled;
        self.compute_hand_velocity();
        Ok(self)
    }

    /// Apply a record transform to every frame, in temporal order.
    pub fn apply_to_all<F>(&mut self, mut transform: F) -> &mut Self
    where
        F: FnMut(&mut GestureRecord),
    {
        for frame in &mut self.frames {
            transform(frame);
        }
        self
    }

    pub fn mirror(&mut self, x: bool, y: bool, z: bool) -> &mut Self {
        self.apply_to_all(|f| {
            f.mirror(x, y, z);
        })
    }

    pub fn rotate(&mut self, x: f32, y: f32, z: f32, slots: Option<&[Slot]>) -> &mut Self {
        self.apply_to_all(|f| {
            f.rotate(x, y, z, slots);
        })
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32, slots: Option<&[Slot]>) -> &mut Self {
        self.apply_to_all(|f| {
            f.scale(x, y, z, slots);
        })
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32, slots: Option<&[Slot]>) -> &mut Self {
        self.apply_to_all(|f| {
            f.translate(x, y, z, slots);
        })
    }

    pub fn add_noise<R: Rng>(
        &mut self,
        range: f32,
        slots: Option<&[Slot]>,
        rng: &mut R,
    ) -> &mut Self {
        self.apply_to_all(|f| {
            f.add_noise(range, slots, rng);
        })
    }

    pub fn swap_hands(&mut self) -> &mut Self {
        self.apply_to_all(|f| {
            f.swap_hands();
        })
    }

    pub fn move_to_one_side(&mut self, to_right: bool) -> &mut Self {
        self.apply_to_all(|f| {
            f.move_to_one_side(to_right);
        })
    }

    pub fn fill_absent_randomly_zero_or_random<R: Rng>(
        &mut self,
        zero_probability: f64,
        rng: &mut R,
    ) -> &mut Self {
        self.apply_to_all(|f| {
            f.fill_absent_randomly_zero_or_random(zero_probability, rng);
        })
    }

    /// Overwrite one slot on every frame.
    pub fn set_slot_all(&mut self, slot: Slot, value: Option<Point3>) -> &mut Self {
        self.apply_to_all(|f| f.set(slot, value))
    }

    pub fn flatten(&self, slots: Option<&[Slot]>) -> Vec<f32> {
        self.frames.iter().flat_map(|f| f.flatten(slots)).collect()
    }

    /// Fixed-size inference input: `sequence_length` rows starting from the
    /// newest frame; rows past the end of the window stay zero.
    pub fn to_flat_tensor(&self, sequence_length: usize, slots: &[Slot]) -> FlatTensor {
        let width = slots.len() * FEATURE_DIMENSION;
        let mut data = Vec::with_capacity(sequence_length * width);

        for frame in self.frames.iter().take(sequence_length) {
            frame.flatten_into(slots, &mut data);
        }
        data.resize(sequence_length * width, 0.0);

        FlatTensor {
            data,
            shape: [sequence_length, width],
        }
    }
}

fn lerp(a: Option<&Point3>, b: Option<&Point3>, t: f32) -> Option<Point3> {
    let (a, b) = (a?, b?);
    Some([
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ])
}
