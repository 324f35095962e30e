// src/gestures/schema.rs
//
// Fixed feature layout shared by every component that flattens or
// unflattens records. The order of `Slot::ALL` is the tensor layout the
// classifier was trained on, so it must never be reordered.

use crate::error::GestureError;
use std::fmt;
use std::str::FromStr;

/// Number of components stored per slot (x, y, z).
pub const FEATURE_DIMENSION: usize = 3;

/// Total number of named slots (23 per side).
pub const SLOT_COUNT: usize = 46;

/// Number of joint keypoints reported per hand by the detector.
pub const JOINTS_PER_HAND: usize = 21;

// ============================================================================
// SIDE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Side::Left => "l_",
            Side::Right => "r_",
        }
    }
}

// ============================================================================
// JOINTS (detector keypoint order)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl Joint {
    /// Joints in detector keypoint order (index 0 = wrist).
    pub const ALL: [Joint; JOINTS_PER_HAND] = [
        Joint::Wrist,
        Joint::ThumbCmc,
        Joint::ThumbMcp,
        Joint::ThumbIp,
        Joint::ThumbTip,
        Joint::IndexMcp,
        Joint::IndexPip,
        Joint::IndexDip,
        Joint::IndexTip,
        Joint::MiddleMcp,
        Joint::MiddlePip,
        Joint::MiddleDip,
        Joint::MiddleTip,
        Joint::RingMcp,
        Joint::RingPip,
        Joint::RingDip,
        Joint::RingTip,
        Joint::PinkyMcp,
        Joint::PinkyPip,
        Joint::PinkyDip,
        Joint::PinkyTip,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// SLOTS
// ============================================================================

/// One named feature position. Discriminants are the canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum Slot {
    LHandPosition,
    LWrist,
    LThumbCmc,
    LThumbMcp,
    LThumbIp,
    LThumbTip,
    LIndexMcp,
    LIndexPip,
    LIndexDip,
    LIndexTip,
    LMiddleMcp,
    LMiddlePip,
    LMiddleDip,
    LMiddleTip,
    LRingMcp,
    LRingPip,
    LRingDip,
    LRingTip,
    LPinkyMcp,
    LPinkyPip,
    LPinkyDip,
    LPinkyTip,
    RHandPosition,
    RWrist,
    RThumbCmc,
    RThumbMcp,
    RThumbIp,
    RThumbTip,
    RIndexMcp,
    RIndexPip,
    RIndexDip,
    RIndexTip,
    RMiddleMcp,
    RMiddlePip,
    RMiddleDip,
    RMiddleTip,
    RRingMcp,
    RRingPip,
    RRingDip,
    RRingTip,
    RPinkyMcp,
    RPinkyPip,
    RPinkyDip,
    RPinkyTip,
    LHandVelocity,
    RHandVelocity,
}

const SLOT_NAMES: [&str; SLOT_COUNT] = [
    "l_hand_position",
    "l_wrist",
    "l_thumb_cmc",
    "l_thumb_mcp",
    "l_thumb_ip",
    "l_thumb_tip",
    "l_index_mcp",
    "l_index_pip",
    "l_index_dip",
    "l_index_tip",
    "l_middle_mcp",
    "l_middle_pip",
    "l_middle_dip",
    "l_middle_tip",
    "l_ring_mcp",
    "l_ring_pip",
    "l_ring_dip",
    "l_ring_tip",
    "l_pinky_mcp",
    "l_pinky_pip",
    "l_pinky_dip",
    "l_pinky_tip",
    "r_hand_position",
    "r_wrist",
    "r_thumb_cmc",
    "r_thumb_mcp",
    "r_thumb_ip",
    "r_thumb_tip",
    "r_index_mcp",
    "r_index_pip",
    "r_index_dip",
    "r_index_tip",
    "r_middle_mcp",
    "r_middle_pip",
    "r_middle_dip",
    "r_middle_tip",
    "r_ring_mcp",
    "r_ring_pip",
    "r_ring_dip",
    "r_ring_tip",
    "r_pinky_mcp",
    "r_pinky_pip",
    "r_pinky_dip",
    "r_pinky_tip",
    "l_hand_velocity",
    "r_hand_velocity",
];

// Offsets of the first joint slot per side.
const LEFT_JOINT_BASE: usize = 1;
const RIGHT_JOINT_BASE: usize = 23;

impl Slot {
    pub const ALL: [Slot; SLOT_COUNT] = [
        Slot::LHandPosition,
        Slot::LWrist,
        Slot::LThumbCmc,
        Slot::LThumbMcp,
        Slot::LThumbIp,
        Slot::LThumbTip,
        Slot::LIndexMcp,
        Slot::LIndexPip,
        Slot::LIndexDip,
        Slot::LIndexTip,
        Slot::LMiddleMcp,
        Slot::LMiddlePip,
        Slot::LMiddleDip,
        Slot::LMiddleTip,
        Slot::LRingMcp,
        Slot::LRingPip,
        Slot::LRingDip,
        Slot::LRingTip,
        Slot::LPinkyMcp,
        Slot::LPinkyPip,
        Slot::LPinkyDip,
        Slot::LPinkyTip,
        Slot::RHandPosition,
        Slot::RWrist,
        Slot::RThumbCmc,
        Slot::RThumbMcp,
        Slot::RThumbIp,
        Slot::RThumbTip,
        Slot::RIndexMcp,
        Slot::RIndexPip,
        Slot::RIndexDip,
        Slot::RIndexTip,
        Slot::RMiddleMcp,
        Slot::RMiddlePip,
        Slot::RMiddleDip,
        Slot::RMiddleTip,
        Slot::RRingMcp,
        Slot::RRingPip,
        Slot::RRingDip,
        Slot::RRingTip,
        Slot::RPinkyMcp,
        Slot::RPinkyPip,
        Slot::RPinkyDip,
        Slot::RPinkyTip,
        Slot::LHandVelocity,
        Slot::RHandVelocity,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Wire name, e.g. `"l_thumb_tip"`.
    pub fn name(self) -> &'static str {
        SLOT_NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Result<Self, GestureError> {
        SLOT_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
            .ok_or_else(|| GestureError::UnknownSlot(name.to_string()))
    }

    pub fn side(self) -> Side {
        match self {
            Slot::LHandVelocity => Side::Left,
            Slot::RHandVelocity => Side::Right,
            s if s.index() < RIGHT_JOINT_BASE - 1 => Side::Left,
            _ => Side::Right,
        }
    }

    /// The same anatomical slot on the other hand.
    pub fn opposite(self) -> Self {
        let i = self.index();
        let j = match self {
            Slot::LHandVelocity => Slot::RHandVelocity.index(),
            Slot::RHandVelocity => Slot::LHandVelocity.index(),
            _ if i < RIGHT_JOINT_BASE - 1 => i + (RIGHT_JOINT_BASE - LEFT_JOINT_BASE),
            _ => i - (RIGHT_JOINT_BASE - LEFT_JOINT_BASE),
        };
        Self::ALL[j]
    }

    pub fn hand_position(side: Side) -> Self {
        match side {
            Side::Left => Slot::LHandPosition,
            Side::Right => Slot::RHandPosition,
        }
    }

    pub fn hand_velocity(side: Side) -> Self {
        match side {
            Side::Left => Slot::LHandVelocity,
            Side::Right => Slot::RHandVelocity,
        }
    }

    pub fn joint(side: Side, joint: Joint) -> Self {
        let base = match side {
            Side::Left => LEFT_JOINT_BASE,
            Side::Right => RIGHT_JOINT_BASE,
        };
        Self::ALL[base + joint.index()]
    }

    pub fn is_hand_position(self) -> bool {
        matches!(self, Slot::LHandPosition | Slot::RHandPosition)
    }

    pub fn is_velocity(self) -> bool {
        matches!(self, Slot::LHandVelocity | Slot::RHandVelocity)
    }

    /// True for the 21 per-joint keypoint slots of either hand.
    pub fn is_joint(self) -> bool {
        !self.is_hand_position() && !self.is_velocity()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Slot {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::from_name(s)
    }
}

/// Skeleton edges per hand (parent -> child), for overlay drawing.
pub const HAND_CONNECTIONS: [(Slot, Slot); 40] = [
    (Slot::LWrist, Slot::LThumbCmc),
    (Slot::LThumbCmc, Slot::LThumbMcp),
    (Slot::LThumbMcp, Slot::LThumbIp),
    (Slot::LThumbIp, Slot::LThumbTip),
    (Slot::LWrist, Slot::LIndexMcp),
    (Slot::LIndexMcp, Slot::LIndexPip),
    (Slot::LIndexPip, Slot::LIndexDip),
    (Slot::LIndexDip, Slot::LIndexTip),
    (Slot::LWrist, Slot::LMiddleMcp),
    (Slot::LMiddleMcp, Slot::LMiddlePip),
    (Slot::LMiddlePip, Slot::LMiddleDip),
    (Slot::LMiddleDip, Slot::LMiddleTip),
    (Slot::LWrist, Slot::LRingMcp),
    (Slot::LRingMcp, Slot::LRingPip),
    (Slot::LRingPip, Slot::LRingDip),
    (Slot::LRingDip, Slot::LRingTip),
    (Slot::LWrist, Slot::LPinkyMcp),
    (Slot::LPinkyMcp, Slot::LPinkyPip),
    (Slot::LPinkyPip, Slot::LPinkyDip),
    (Slot::LPinkyDip, Slot::LPinkyTip),
    (Slot::RWrist, Slot::RThumbCmc),
    (Slot::RThumbCmc, Slot::RThumbMcp),
    (Slot::RThumbMcp, Slot::RThumbIp),
    (Slot::RThumbIp, Slot::RThumbTip),
    (Slot::RWrist, Slot::RIndexMcp),
    (Slot::RIndexMcp, Slot::RIndexPip),
    (Slot::RIndexPip, Slot::RIndexDip),
    (Slot::RIndexDip, Slot::RIndexTip),
    (Slot::RWrist, Slot::RMiddleMcp),
    (Slot::RMiddleMcp, Slot::RMiddlePip),
    (Slot::RMiddlePip, Slot::RMiddleDip),
    (Slot::RMiddleDip, Slot::RMiddleTip),
    (Slot::RWrist, Slot::RRingMcp),
    (Slot::RRingMcp, Slot::RRingPip),
    (Slot::RRingPip, Slot::RRingDip),
    (Slot::RRingDip, Slot::RRingTip),
    (Slot::RWrist, Slot::RPinkyMcp),
    (Slot::RPinkyMcp, Slot::RPinkyPip),
    (Slot::RPinkyPip, Slot::RPinkyDip),
    (Slot::RPinkyDip, Slot::RPinkyTip),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_names() {
        for (i, slot) in Slot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
            assert_eq!(Slot::from_name(slot.name()).unwrap(), *slot);
        }
        assert_eq!(Slot::ALL[0].name(), "l_hand_position");
        assert_eq!(Slot::ALL[22].name(), "r_hand_position");
        assert_eq!(Slot::ALL[45].name(), "r_hand_velocity");
    }

    #[test]
    fn test_unknown_name_is_schema_error() {
        let err = Slot::from_name("l_elbow").unwrap_err();
        assert!(matches!(err, GestureError::UnknownSlot(ref n) if n == "l_elbow"));
        assert!("r_toe".parse::<Slot>().is_err());
    }

    #[test]
    fn test_opposite_is_involution_and_changes_side() {
        for slot in Slot::ALL {
            let other = slot.opposite();
            assert_ne!(slot.side(), other.side(), "{}", slot);
            assert_eq!(other.opposite(), slot);
            assert_eq!(&slot.name()[2..], &other.name()[2..]);
        }
    }

    #[test]
    fn test_joint_lookup() {
        assert_eq!(Slot::joint(Side::Left, Joint::Wrist), Slot::LWrist);
        assert_eq!(Slot::joint(Side::Right, Joint::PinkyTip), Slot::RPinkyTip);
        assert_eq!(Slot::joint(Side::Right, Joint::IndexDip).name(), "r_index_dip");
        assert_eq!(Slot::ALL.iter().filter(|s| s.is_joint()).count(), 42);
    }
}
