//! Runtime re-anchoring of the tracking coordinate system.
//!
//! Calibrating captures a pose as the new zero. Every pose applied
//! afterwards is expressed relative to it:
//!
//! ```text
//! position'    = position - origin
//! orientation' = conjugate(reference) * orientation
//! ```
//!
//! The product order matters, the reference rotation is undone first.

use crate::pose::{Pose, Position};
use crate::quaternion::Quaternion;
use log::info;
use std::sync::{Arc, Mutex};

/// The origin and reference orientation of the world coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    origin: Position,
    reference: Quaternion,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            origin: Position::default(),
            reference: Quaternion::identity(),
        }
    }
}

impl Calibration {
    /// The identity calibration; apply leaves poses untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `pose` as the origin and reference orientation from now on.
    pub fn calibrate(&mut self, pose: &Pose) {
        self.origin = pose.position;
        self.reference = pose.orientation.normalize();
    }

    /// Back to the identity calibration.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Expresses `raw` relative to the calibrated origin and orientation.
    pub fn apply(&self, raw: &Pose) -> Pose {
        Pose {
            position: raw.position - self.origin,
            orientation: self.reference.conjugate() * raw.orientation,
            time: raw.time,
        }
    }

    #[allow(missing_docs)]
    pub fn origin(&self) -> Position {
        self.origin
    }

    #[allow(missing_docs)]
    pub fn reference(&self) -> Quaternion {
        self.reference
    }
}

/// A [`Calibration`] that the caller's thread can re-anchor while a bridge
/// thread keeps applying it. Both halves of the calibration are read and
/// written under the same lock.
#[derive(Debug, Clone, Default)]
pub struct SharedCalibration {
    inner: Arc<Mutex<Calibration>>,
}

impl SharedCalibration {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`Calibration::calibrate`].
    pub fn calibrate(&self, pose: &Pose) {
        self.inner.lock().unwrap().calibrate(pose);
        info!("Calibrated to {}", pose);
    }

    /// See [`Calibration::reset`].
    pub fn reset(&self) {
        self.inner.lock().unwrap().reset();
        info!("Calibration reset");
    }

    /// See [`Calibration::apply`].
    pub fn apply(&self, raw: &Pose) -> Pose {
        self.inner.lock().unwrap().apply(raw)
    }

    /// A copy of the current calibration.
    pub fn get(&self) -> Calibration {
        *self.inner.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euler::yaw_pitch_roll;
    use crate::pose::TimeData;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    #[test]
    fn uncalibrated_apply_is_identity() {
        let raw = Pose::new(
            Position::new(1.0, 2.0, 3.0),
            Quaternion::new(0.5, 0.5, 0.5, 0.5),
        );
        assert_eq!(Calibration::new().apply(&raw), raw);
    }

    #[test]
    fn apply_keeps_time_data() {
        let time = TimeData {
            timestamp: 12.5,
            timecode: 7,
            latency: 0.004,
        };
        let raw = Pose::new(Position::new(1.0, 0.0, 0.0), Quaternion::identity()).with_time(time);
        let mut cal = Calibration::new();
        cal.calibrate(&Pose::new(Position::new(1.0, 1.0, 1.0), Quaternion::identity()));
        assert_eq!(cal.apply(&raw).time, time);
    }

    #[test]
    fn rotation_is_relative_to_the_reference() {
        // Reference is a quarter turn about z, the pose a half turn about z.
        let quarter = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let half = Quaternion::new(0.0, 0.0, 0.0, 1.0);
        let mut cal = Calibration::new();
        cal.calibrate(&Pose::new(Position::default(), quarter));
        let relative = cal.apply(&Pose::new(Position::default(), half));
        assert!((yaw_pitch_roll(&relative.orientation).yaw - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn reference_is_stored_normalized() {
        let mut cal = Calibration::new();
        cal.calibrate(&Pose::new(
            Position::default(),
            Quaternion::new(0.0, 0.0, 3.0, 0.0),
        ));
        assert!((cal.reference().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn recalibrating_re_anchors() {
        let mut cal = Calibration::new();
        let first = Pose::new(Position::new(1.0, 0.0, 0.0), Quaternion::identity());
        let second = Pose::new(Position::new(0.0, 5.0, 0.0), Quaternion::identity());
        cal.calibrate(&first);
        cal.calibrate(&second);
        assert_eq!(cal.apply(&second).position, Position::default());
        cal.reset();
        assert_eq!(cal, Calibration::default());
    }

    #[test]
    fn shared_calibration_is_seen_by_clones() {
        let shared = SharedCalibration::new();
        let clone = shared.clone();
        let anchor = Pose::new(Position::new(2.0, 2.0, 2.0), Quaternion::identity());
        shared.calibrate(&anchor);
        assert_eq!(clone.apply(&anchor).position, Position::default());
    }

    proptest! {
        #[test]
        fn calibrate_then_apply_is_zero(
            p in prop::array::uniform3(-10.0..10.0f64),
            q in prop::array::uniform4(-1.0..1.0f64),
        ) {
            let orientation = Quaternion::new(q[0], q[1], q[2], q[3]);
            prop_assume!(orientation.norm() > 1e-3);
            let pose = Pose::new(Position::from(p), orientation.normalize());
            let mut cal = Calibration::new();
            cal.calibrate(&pose);
            let zeroed = cal.apply(&pose);
            prop_assert!(zeroed.position.length() < 1e-9);
            prop_assert!(zeroed.orientation.approx_eq(&Quaternion::identity(), 1e-9));
        }
    }
}
