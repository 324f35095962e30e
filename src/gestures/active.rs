// src/gestures/active.rs
//
// Boolean projection over the slot table: which slots a model consumes.
// `active_slots()` order is the canonical key for flatten/unflatten and
// for the inference tensor layout.

use super::record::Gestures;
use super::schema::Slot;
use crate::error::GestureError;
use serde::{Deserialize, Serialize};

/// `Some(true)` = active, `Some(false)` = explicitly inactive,
/// `None` = unset (inactive, and a no-op when used as a preset).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveFieldMask {
    fields: Gestures<bool>,
}

impl ActiveFieldMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, GestureError>
    where
        I: IntoIterator<Item = (&'a str, Option<bool>)>,
    {
        Ok(Self {
            fields: Gestures::from_pairs(pairs)?,
        })
    }

    /// Mark every listed slot with `value`.
    pub fn with_slots(slots: &[Slot], value: bool) -> Self {
        let mut mask = Self::new();
        mask.set_slots(Some(value), slots);
        mask
    }

    /// Union of several presets, applied in order.
    pub fn from_presets(presets: &[&ActiveFieldMask]) -> Self {
        let mut mask = Self::new();
        mask.union_presets(presets);
        mask
    }

    /// Clear, then overlay each preset. Explicit `true`/`false` values
    /// overwrite; unset slots in a preset leave the current value alone.
    pub fn union_presets(&mut self, presets: &[&ActiveFieldMask]) -> &mut Self {
        self.reset();
        for preset in presets {
            for (slot, value) in preset.fields.iter() {
                if let Some(v) = value {
                    self.fields.set(slot, Some(*v));
                }
            }
        }
        self
    }

    pub fn reset(&mut self) {
        self.set_slots(None, &Slot::ALL);
    }

    pub fn activate_all(&mut self) {
        self.set_slots(Some(true), &Slot::ALL);
    }

    pub fn deactivate_all(&mut self) {
        self.set_slots(Some(false), &Slot::ALL);
    }

    pub fn set_slots(&mut self, value: Option<bool>, slots: &[Slot]) {
        for slot in slots {
            self.fields.set(*slot, value);
        }
    }

    pub fn set(&mut self, slot: Slot, value: Option<bool>) {
        self.fields.set(slot, value);
    }

    pub fn is_active(&self, slot: Slot) -> bool {
        matches!(self.fields.get(slot), Some(true))
    }

    /// Active slots in canonical order.
    pub fn active_slots(&self) -> Vec<Slot> {
        Slot::ALL
            .iter()
            .copied()
            .filter(|s| self.is_active(*s))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        Slot::ALL.iter().filter(|s| self.is_active(**s)).count()
    }

    pub fn fields(&self) -> &Gestures<bool> {
        &self.fields
    }
}
