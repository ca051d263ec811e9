//! Yaw-pitch-roll angles, aka. intrinsic Tait-Bryan angles following the
//! z-y'-x'' convention.
//!
//! With `q = (q0, q1, q2, q3)` normalized and `q0` the scalar part:
//!
//! ```text
//! yaw   = atan2(2(q0 q3 + q1 q2), 1 - 2(q2² + q3²))
//! pitch = asin (2(q0 q2 - q3 q1))
//! roll  = atan2(2(q0 q1 + q2 q3), 1 - 2(q1² + q2²))
//! ```
//!
//! The signs of the cross terms are fixed to the ones above. Older tooling
//! around Motive used the opposite signs for yaw and roll; which one matches
//! a given rig depends on how the tracking frame is set up, so verify against
//! the rig before changing them.

use crate::quaternion::Quaternion;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Orientation as yaw, pitch, and roll, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YawPitchRoll {
    /// Rotation around the z axis, in `[-π, π]`
    pub yaw: f64,
    /// Rotation around the y' axis, in `[-π/2, π/2]`
    pub pitch: f64,
    /// Rotation around the x'' axis, in `[-π, π]`
    pub roll: f64,
}

impl From<Quaternion> for YawPitchRoll {
    fn from(q: Quaternion) -> Self {
        yaw_pitch_roll(&q)
    }
}

/// Converts a quaternion of any non-zero norm to yaw, pitch, and roll.
///
/// The quaternion is normalized first. Near gimbal lock the `asin` argument
/// can overshoot `±1` by a rounding error, so it is clamped.
pub fn yaw_pitch_roll(q: &Quaternion) -> YawPitchRoll {
    let Quaternion {
        w: q0,
        x: q1,
        y: q2,
        z: q3,
    } = q.normalize();

    let yaw = f64::atan2(
        2.0 * (q0 * q3 + q1 * q2),
        1.0 - 2.0 * (q2 * q2 + q3 * q3),
    );
    let pitch = (2.0 * (q0 * q2 - q3 * q1)).clamp(-1.0, 1.0).asin();
    let roll = f64::atan2(
        2.0 * (q0 * q1 + q2 * q3),
        1.0 - 2.0 * (q1 * q1 + q2 * q2),
    );

    YawPitchRoll { yaw, pitch, roll }
}

impl YawPitchRoll {
    /// The same angles in degrees, as `(yaw, pitch, roll)`.
    pub fn to_degrees(&self) -> (f64, f64, f64) {
        (
            self.yaw.to_degrees(),
            self.pitch.to_degrees(),
            self.roll.to_degrees(),
        )
    }
}

impl Display for YawPitchRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (yaw, pitch, roll) = self.to_degrees();
        write!(f, "yaw {yaw:.1}°, pitch {pitch:.1}°, roll {roll:.1}°")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    #[test]
    fn identity_has_no_rotation() {
        let ypr = yaw_pitch_roll(&Quaternion::identity());
        assert_eq!(ypr, YawPitchRoll::default());
    }

    #[test]
    fn quarter_turn_about_each_axis() {
        let about_z = yaw_pitch_roll(&Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2));
        assert!((about_z.yaw - FRAC_PI_2).abs() < EPS);
        assert!(about_z.pitch.abs() < EPS);
        assert!(about_z.roll.abs() < EPS);

        let about_x = yaw_pitch_roll(&Quaternion::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2, 0.0, 0.0));
        assert!(about_x.yaw.abs() < EPS);
        assert!((about_x.roll - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn gimbal_lock_does_not_produce_nan() {
        // Slightly more than a unit pitch argument once rounded.
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2 + 1e-16, 0.0);
        let ypr = yaw_pitch_roll(&q);
        assert!(!ypr.pitch.is_nan());
        assert!((ypr.pitch - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn zero_quaternion_is_treated_as_identity() {
        let ypr = yaw_pitch_roll(&Quaternion::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(ypr, YawPitchRoll::default());
    }

    fn non_zero_quaternion() -> impl Strategy<Value = Quaternion> {
        (-1.0..1.0f64, -1.0..1.0f64, -1.0..1.0f64, -1.0..1.0f64)
            .prop_map(|(w, x, y, z)| Quaternion::new(w, x, y, z))
            .prop_filter("needs a direction", |q| q.norm() > 1e-3)
    }

    proptest! {
        #[test]
        fn angles_stay_in_range(q in non_zero_quaternion()) {
            let ypr = yaw_pitch_roll(&q);
            prop_assert!((-PI..=PI).contains(&ypr.yaw));
            prop_assert!((-FRAC_PI_2..=FRAC_PI_2).contains(&ypr.pitch));
            prop_assert!((-PI..=PI).contains(&ypr.roll));
        }

        #[test]
        fn scaling_does_not_change_angles(q in non_zero_quaternion(), k in 0.01..100.0f64) {
            let a = yaw_pitch_roll(&q);
            let b = yaw_pitch_roll(&q.scale(k));
            prop_assert!((a.yaw - b.yaw).abs() < 1e-6);
            prop_assert!((a.pitch - b.pitch).abs() < 1e-6);
            prop_assert!((a.roll - b.roll).abs() < 1e-6);
        }
    }
}
