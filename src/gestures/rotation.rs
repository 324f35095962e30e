// src/gestures/rotation.rs
//
// Right-handed rotations of a single point about the coordinate axes.
// Angles are in radians.

use super::record::Point3;

pub fn rotate_x(p: Point3, angle: f32) -> Point3 {
    let (s, c) = angle.sin_cos();
    [p[0], p[1] * c - p[2] * s, p[1] * s + p[2] * c]
}

pub fn rotate_y(p: Point3, angle: f32) -> Point3 {
    let (s, c) = angle.sin_cos();
    [p[0] * c + p[2] * s, p[1], -p[0] * s + p[2] * c]
}

pub fn rotate_z(p: Point3, angle: f32) -> Point3 {
    let (s, c) = angle.sin_cos();
    [p[0] * c - p[1] * s, p[0] * s + p[1] * c, p[2]]
}

/// X first, then Y, then Z.
pub fn rotate_xyz(p: Point3, x: f32, y: f32, z: f32) -> Point3 {
    rotate_z(rotate_y(rotate_x(p, x), y), z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: Point3, b: Point3) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_quarter_turns() {
        assert!(close(rotate_x([0.0, 1.0, 0.0], FRAC_PI_2), [0.0, 0.0, 1.0]));
        assert!(close(rotate_y([0.0, 0.0, 1.0], FRAC_PI_2), [1.0, 0.0, 0.0]));
        assert!(close(rotate_z([1.0, 0.0, 0.0], FRAC_PI_2), [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_rotation_order() {
        // X then Z: (0,1,0) -> (0,0,1) -> unchanged by Z
        let p = rotate_xyz([0.0, 1.0, 0.0], FRAC_PI_2, 0.0, FRAC_PI_2);
        assert!(close(p, [0.0, 0.0, 1.0]), "got {:?}", p);
    }
}
