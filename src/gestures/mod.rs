// src/gestures/mod.rs
//
// Per-frame feature model:
//   schema   → fixed slot order (tensor layout contract)
//   record   → slot table + geometric transforms
//   active   → per-model slot masks
//   presets  → named masks
//   rotation → axis rotations used by `rotate`

pub mod active;
pub mod presets;
pub mod record;
pub mod rotation;
pub mod schema;

pub use active::ActiveFieldMask;
pub use presets::Preset;
pub use record::{GestureRecord, Gestures, Point3};
pub use schema::{Joint, Side, Slot, FEATURE_DIMENSION, HAND_CONNECTIONS, SLOT_COUNT};
