// src/gestures/presets.rs

use super::active::ActiveFieldMask;
use super::schema::{Joint, Side, Slot};

/// Named slot groups used to describe which features a model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    LeftHandPoints,
    LeftHandPosition,
    LeftHandVelocity,
    LeftHandFull,
    RightHandPoints,
    RightHandPosition,
    RightHandVelocity,
    RightHandFull,
    HandsPoints,
    HandsPosition,
    HandsVelocity,
    HandsFull,
    AllGestures,
}

impl Preset {
    pub fn mask(self) -> ActiveFieldMask {
        ActiveFieldMask::with_slots(&self.slots(), true)
    }

    pub fn slots(self) -> Vec<Slot> {
        match self {
            Preset::LeftHandPoints => hand_points(Side::Left),
            Preset::LeftHandPosition => vec![Slot::LHandPosition],
            Preset::LeftHandVelocity => vec![Slot::LHandVelocity],
            Preset::LeftHandFull => hand_full(Side::Left),
            Preset::RightHandPoints => hand_points(Side::Right),
            Preset::RightHandPosition => vec![Slot::RHandPosition],
            Preset::RightHandVelocity => vec![Slot::RHandVelocity],
            Preset::RightHandFull => hand_full(Side::Right),
            Preset::HandsPoints => [hand_points(Side::Left), hand_points(Side::Right)].concat(),
            Preset::HandsPosition => vec![Slot::LHandPosition, Slot::RHandPosition],
            Preset::HandsVelocity => vec![Slot::LHandVelocity, Slot::RHandVelocity],
            Preset::HandsFull => [hand_full(Side::Left), hand_full(Side::Right)].concat(),
            Preset::AllGestures => Slot::ALL.to_vec(),
        }
    }
}

fn hand_points(side: Side) -> Vec<Slot> {
    Joint::ALL.iter().map(|j| Slot::joint(side, *j)).collect()
}

fn hand_full(side: Side) -> Vec<Slot> {
    let mut slots = hand_points(side);
    slots.push(Slot::hand_position(side));
    slots.push(Slot::hand_velocity(side));
    slots
}
