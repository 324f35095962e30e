// src/gestures/record.rs
//
// One frame's worth of features keyed by `Slot`.
//
// `Gestures<T>` is the generic slot table (3D points for records, booleans
// for masks). Absent slots are `None`. Transform methods only touch
// populated slots and return `&mut Self` so augmentation can be chained.

use super::active::ActiveFieldMask;
use super::rotation::rotate_xyz;
use super::schema::{Joint, Side, Slot, FEATURE_DIMENSION, SLOT_COUNT};
use crate::detection::DetectorResult;
use crate::error::GestureError;
use rand::Rng;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

pub type Point3 = [f32; 3];

/// A record of 3D points, one per slot.
pub type GestureRecord = Gestures<Point3>;

/// Random amplitude for whole-hand position slots (image space).
const POSITION_RANDOM_RANGE: f32 = 1.0;
/// Random amplitude for joint and velocity slots (world space, meters).
const JOINT_RANDOM_RANGE: f32 = 0.15;

// ============================================================================
// GENERIC SLOT TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Gestures<T> {
    values: [Option<T>; SLOT_COUNT],
}

impl<T> Gestures<T> {
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|_| None),
        }
    }

    /// Build from `(slot name, value)` pairs. Unknown names are rejected.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, GestureError>
    where
        I: IntoIterator<Item = (&'a str, Option<T>)>,
    {
        let mut out = Self::new();
        for (name, value) in pairs {
            let slot = Slot::from_name(name)?;
            out.values[slot.index()] = value;
        }
        Ok(out)
    }

    #[inline]
    pub fn get(&self, slot: Slot) -> Option<&T> {
        self.values[slot.index()].as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut T> {
        self.values[slot.index()].as_mut()
    }

    #[inline]
    pub fn set(&mut self, slot: Slot, value: Option<T>) {
        self.values[slot.index()] = value;
    }

    pub fn take(&mut self, slot: Slot) -> Option<T> {
        self.values[slot.index()].take()
    }

    pub fn is_set(&self, slot: Slot) -> bool {
        self.values[slot.index()].is_some()
    }

    /// Every slot in canonical order with its value.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, Option<&T>)> + '_ {
        Slot::ALL
            .iter()
            .map(move |slot| (*slot, self.values[slot.index()].as_ref()))
    }

    /// Number of populated slots.
    pub fn populated(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Exchange every `l_*` value with its `r_*` counterpart.
    pub fn swap_hands(&mut self) -> &mut Self {
        for slot in Slot::ALL.iter().filter(|s| s.side() == Side::Left) {
            self.values.swap(slot.index(), slot.opposite().index());
        }
        self
    }
}

impl<T> Default for Gestures<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> Serialize for Gestures<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SLOT_COUNT))?;
        for (slot, value) in self.iter() {
            map.serialize_entry(slot.name(), &value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Gestures<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GesturesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for GesturesVisitor<T> {
            type Value = Gestures<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object keyed by feature slot name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Gestures::new();
                while let Some(key) = access.next_key::<String>()? {
                    let slot = Slot::from_name(&key).map_err(<A::Error as de::Error>::custom)?;
                    let value: Option<T> = access.next_value()?;
                    out.set(slot, value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(GesturesVisitor(PhantomData))
    }
}

fn selected(slots: Option<&[Slot]>) -> &[Slot] {
    slots.unwrap_or(&Slot::ALL)
}

fn rand_fix_interval<R: Rng>(rng: &mut R, limit: f32) -> f32 {
    rng.gen::<f32>() * 2.0 * limit - limit
}

// ============================================================================
// POINT RECORD
// ============================================================================

impl Gestures<Point3> {
    /// Map a detector result onto `l_*` / `r_*` slots.
    ///
    /// Joint vectors have x and z negated; the image-space hand position is
    /// stored as reported. When `mask` is given only its active slots are written.
    pub fn from_detector_result(result: &DetectorResult, mask: Option<&ActiveFieldMask>) -> Self {
        let mut record = Self::new();
        record.insert_from_detector_result(result, mask);
        record
    }

    pub fn insert_from_detector_result(
        &mut self,
        result: &DetectorResult,
        mask: Option<&ActiveFieldMask>,
    ) -> &mut Self {
        let wanted = |slot: Slot| mask.map_or(true, |m| m.is_active(slot));

        for hand in &result.hands {
            let side = hand.handedness.side();

            let position = Slot::hand_position(side);
            if wanted(position) {
                self.set(position, Some([hand.wrist.x, hand.wrist.y, hand.wrist.z]));
            }

            for (joint, lm) in Joint::ALL.iter().zip(hand.world_landmarks.iter()) {
                let slot = Slot::joint(side, *joint);
                if wanted(slot) {
                    self.set(slot, Some([-lm.x, lm.y, -lm.z]));
                }
            }
        }
        self
    }

    /// Inverse of [`flatten`](Self::flatten). Consumes 3 values per slot.
    pub fn unflatten(flat: &[f32], slots: Option<&[Slot]>) -> Result<Self, GestureError> {
        let slots = selected(slots);
        let expected = slots.len() * FEATURE_DIMENSION;
        if flat.len() != expected {
            return Err(GestureError::ShapeMismatch {
                expected,
                actual: flat.len(),
            });
        }

        let mut record = Self::new();
        for (slot, chunk) in slots.iter().zip(flat.chunks_exact(FEATURE_DIMENSION)) {
            record.set(*slot, Some([chunk[0], chunk[1], chunk[2]]));
        }
        Ok(record)
    }

    /// Concatenate each selected slot's components in canonical order.
    /// Absent slots contribute `[0, 0, 0]`.
    pub fn flatten(&self, slots: Option<&[Slot]>) -> Vec<f32> {
        let slots = selected(slots);
        let mut out = Vec::with_capacity(slots.len() * FEATURE_DIMENSION);
        self.flatten_into(slots, &mut out);
        out
    }

    pub(crate) fn flatten_into(&self, slots: &[Slot], out: &mut Vec<f32>) {
        for slot in slots {
            out.extend_from_slice(self.get(*slot).unwrap_or(&[0.0; 3]));
        }
    }

    pub fn set_slot(&mut self, slot: Slot, x: f32, y: f32, z: f32) -> &mut Self {
        self.set(slot, Some([x, y, z]));
        self
    }

    pub fn zero_slot(&mut self, slot: Slot) -> &mut Self {
        self.set_slot(slot, 0.0, 0.0, 0.0)
    }

    pub fn random_slot<R: Rng>(&mut self, slot: Slot, rng: &mut R) -> &mut Self {
        let range = if slot.is_hand_position() {
            POSITION_RANDOM_RANGE
        } else {
            JOINT_RANDOM_RANGE
        };
        let x = rand_fix_interval(rng, range);
        let y = rand_fix_interval(rng, range);
        let z = rand_fix_interval(rng, range);
        self.set_slot(slot, x, y, z)
    }

    pub fn fill_all_with_zero(&mut self) -> &mut Self {
        for slot in Slot::ALL {
            self.zero_slot(slot);
        }
        self
    }

    pub fn fill_all_with_random<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        for slot in Slot::ALL {
            self.random_slot(slot, rng);
        }
        self
    }

    pub fn fill_absent_with_zero(&mut self) -> &mut Self {
        for slot in Slot::ALL {
            if !self.is_set(slot) {
                self.zero_slot(slot);
            }
        }
        self
    }

    pub fn fill_absent_with_random<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        for slot in Slot::ALL {
            if !self.is_set(slot) {
                self.random_slot(slot, rng);
            }
        }
        self
    }

    /// Each absent slot becomes zero with probability `zero_probability`,
    /// random otherwise.
    pub fn fill_absent_randomly_zero_or_random<R: Rng>(
        &mut self,
        zero_probability: f64,
        rng: &mut R,
    ) -> &mut Self {
        for slot in Slot::ALL {
            if self.is_set(slot) {
                continue;
            }
            if rng.gen::<f64>() < zero_probability {
                self.zero_slot(slot);
            } else {
                self.random_slot(slot, rng);
            }
        }
        self
    }

    pub fn add_noise<R: Rng>(
        &mut self,
        range: f32,
        slots: Option<&[Slot]>,
        rng: &mut R,
    ) -> &mut Self {
        for slot in selected(slots) {
            if let Some(p) = self.get_mut(*slot) {
                for v in p.iter_mut() {
                    *v += rand_fix_interval(rng, range);
                }
            }
        }
        self
    }

    /// Negate the selected axes on every populated slot. An odd number of
    /// flipped axes inverts chirality, so the hands are swapped as well.
    pub fn mirror(&mut self, x: bool, y: bool, z: bool) -> &mut Self {
        for value in self.values.iter_mut().flatten() {
            if x {
                value[0] = -value[0];
            }
            if y {
                value[1] = -value[1];
            }
            if z {
                value[2] = -value[2];
            }
        }

        let flipped = [x, y, z].iter().filter(|f| **f).count();
        if flipped % 2 == 1 {
            self.swap_hands();
        }
        self
    }

    pub fn rotate(&mut self, x: f32, y: f32, z: f32, slots: Option<&[Slot]>) -> &mut Self {
        for slot in selected(slots) {
            if let Some(p) = self.get_mut(*slot) {
                *p = rotate_xyz(*p, x, y, z);
            }
        }
        self
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32, slots: Option<&[Slot]>) -> &mut Self {
        for slot in selected(slots) {
            if let Some(p) = self.get_mut(*slot) {
                p[0] *= x;
                p[1] *= y;
                p[2] *= z;
            }
        }
        self
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32, slots: Option<&[Slot]>) -> &mut Self {
        for slot in selected(slots) {
            if let Some(p) = self.get_mut(*slot) {
                p[0] += x;
                p[1] += y;
                p[2] += z;
            }
        }
        self
    }

    /// Fold the other hand onto `to_right` (or left) by mirroring it across
    /// the body midline. Destination slots that already hold data are kept
    /// and the matching source slot is left in place.
    pub fn move_to_one_side(&mut self, to_right: bool) -> &mut Self {
        let src_side = if to_right { Side::Left } else { Side::Right };

        for src in Slot::ALL.iter().filter(|s| s.side() == src_side) {
            let dst = src.opposite();
            if self.is_set(dst) {
                continue;
            }
            if let Some(mut p) = self.take(*src) {
                p[0] = -p[0];
                p[2] = -p[2];
                self.set(dst, Some(p));
            }
        }
        self
    }
}
