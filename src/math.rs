//! Small vector helpers for planar (XZ) locomotion.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

/// Dot products this close to ±1 are treated as parallel.
const PARALLEL_THRESHOLD: f32 = 0.0005;

/// Unsigned angle between two directions.
///
/// Near-parallel directions return 0. Near-opposite directions return a quarter
/// turn so a spring driven by this angle always has a defined way to start
/// turning. Zero-length inputs return 0.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let (Some(a), Some(b)) = (a.try_normalize(), b.try_normalize()) else {
        return 0.0;
    };

    let dot = a.dot(b);
    if dot > 1.0 - PARALLEL_THRESHOLD {
        0.0
    } else if dot < -1.0 + PARALLEL_THRESHOLD {
        FRAC_PI_2
    } else {
        dot.clamp(-1.0, 1.0).acos()
    }
}

/// Angle from `from` to `to` around the world up axis.
///
/// Positive when `to` lies counter-clockwise of `from` seen from above, which is
/// the direction a positive rotation about `+Y` turns.
pub fn signed_angle_between(from: Vec3, to: Vec3) -> f32 {
    let angle = angle_between(from, to);
    if from.cross(to).dot(Vec3::Y) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Rotate the local XZ vector `local` into the frame whose forward axis is `forward`.
///
/// Local `+Z` maps onto `forward`; `y` passes through unchanged.
pub fn apply_vector_matrix_xz(forward: Vec3, local: Vec3) -> Vec3 {
    Vec3::new(
        forward.x * local.z + forward.z * local.x,
        local.y,
        forward.z * local.z - forward.x * local.x,
    )
}

/// Project onto the ground plane and normalize. `None` for vertical or zero input.
pub fn flat_direction(v: Vec3) -> Option<Vec3> {
    Vec3::new(v.x, 0.0, v.z).try_normalize()
}

/// Per-axis linear interpolation.
pub fn lerp_per_axis(from: Vec3, to: Vec3, t: Vec3) -> Vec3 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn parallel_vectors_have_no_angle() {
        assert_eq!(angle_between(Vec3::Z, Vec3::Z * 3.0), 0.0);
    }

    #[test]
    fn opposite_vectors_start_a_quarter_turn() {
        assert_eq!(angle_between(Vec3::Z, Vec3::NEG_Z), FRAC_PI_2);
    }

    #[test]
    fn zero_vectors_are_guarded() {
        assert_eq!(angle_between(Vec3::ZERO, Vec3::X), 0.0);
        assert_eq!(signed_angle_between(Vec3::Z, Vec3::ZERO), 0.0);
    }

    #[test]
    fn signed_angle_follows_rotation_about_up() {
        let angle = signed_angle_between(Vec3::Z, Vec3::X);
        assert!((angle - FRAC_PI_2).abs() < 1e-5);

        // Rotating by the signed angle lands on the target.
        let rotated = Quat::from_rotation_y(angle) * Vec3::Z;
        assert!((rotated - Vec3::X).length() < 1e-5);

        let angle = signed_angle_between(Vec3::Z, Vec3::NEG_X);
        assert!((angle + FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn signed_angle_three_quarters() {
        let to = Quat::from_rotation_y(0.75 * PI) * Vec3::Z;
        let angle = signed_angle_between(Vec3::Z, to);
        assert!((angle - 0.75 * PI).abs() < 1e-4);
    }

    #[test]
    fn matrix_xz_maps_forward() {
        let forward = Vec3::X;
        assert!((apply_vector_matrix_xz(forward, Vec3::Z) - Vec3::X).length() < 1e-6);

        let identity = apply_vector_matrix_xz(Vec3::Z, Vec3::new(0.3, 2.0, 0.7));
        assert!((identity - Vec3::new(0.3, 2.0, 0.7)).length() < 1e-6);
    }

    #[test]
    fn flat_direction_drops_height() {
        let dir = flat_direction(Vec3::new(3.0, 5.0, 4.0)).unwrap();
        assert!((dir - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-6);
        assert!(flat_direction(Vec3::Y).is_none());
    }

    #[test]
    fn lerp_per_axis_blends_independently() {
        let blended = lerp_per_axis(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.2, -9.0, 0.1),
            Vec3::new(0.98, 1.0, 0.98),
        );
        assert!((blended.x - 0.216).abs() < 1e-5);
        assert!((blended.y + 9.0).abs() < 1e-5);
        assert!((blended.z - 0.098).abs() < 1e-5);
    }
}
