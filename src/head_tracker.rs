//! Uses a tracked rigid body as a head tracker for binaural synthesis: the
//! head's rotation drives the renderer's reference orientation.

use crate::bridge::Bridge;
use crate::calibration::SharedCalibration;
use crate::error::{SendError, TrackingError};
use crate::euler::{yaw_pitch_roll, YawPitchRoll};
use crate::history::HistoryBuffer;
use crate::pose::Pose;
use crate::renderer::RendererConnection;
use crate::ssr_message::{Degrees, SsrRequest};
use crate::tracking_source::TrackingSource;
use std::f64::consts::PI;
use std::fmt;

/// What the head tracker stores for every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadSample {
    /// The pose as the tracking system reported it
    pub raw: Pose,
    /// The pose relative to the calibration at the time
    pub calibrated: Pose,
    /// Angles of the calibrated orientation
    pub angles: YawPitchRoll,
}

impl fmt::Display for HeadSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, azimuth {:.2}°",
            self.angles,
            reference_azimuth(&self.angles)
        )
    }
}

/// The renderer azimuth for a head orientation: roll in degrees plus 90°.
///
/// The rig is mounted with its roll axis vertical, and a head at rest faces
/// the renderer's +y.
pub fn reference_azimuth(angles: &YawPitchRoll) -> Degrees {
    angles.roll * 180.0 / PI + 90.0
}

/// A [`Bridge`] sending one reference orientation per tracking frame.
pub struct HeadTracker<T: TrackingSource, R: RendererConnection> {
    optitrack: T,
    ssr: R,
    rb_id: usize,
    calibration: SharedCalibration,
}

impl<T: TrackingSource, R: RendererConnection> HeadTracker<T, R> {
    /// Tracks the rigid body at index `rb_id`, starting uncalibrated.
    pub fn new(optitrack: T, ssr: R, rb_id: usize) -> Self {
        Self {
            optitrack,
            ssr,
            rb_id,
            calibration: SharedCalibration::new(),
        }
    }

    /// A handle to this tracker's calibration. Calibrating through it takes
    /// effect from the next frame on, even while the bridge is running.
    pub fn calibration(&self) -> SharedCalibration {
        self.calibration.clone()
    }
}

impl<T: TrackingSource, R: RendererConnection> fmt::Display for HeadTracker<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeadTracker(rb {})", self.rb_id)
    }
}

impl<T, R> Bridge for HeadTracker<T, R>
where
    T: TrackingSource + 'static,
    R: RendererConnection + 'static,
{
    type Sample = HeadSample;

    fn receive(&mut self) -> Result<HeadSample, TrackingError> {
        let raw = self.optitrack.get_rigid_body(self.rb_id)?;
        let calibrated = self.calibration.apply(&raw);
        Ok(HeadSample {
            raw,
            calibrated,
            angles: yaw_pitch_roll(&calibrated.orientation),
        })
    }

    fn send(&mut self, sample: &HeadSample) -> Result<(), SendError> {
        let azimuth = reference_azimuth(&sample.angles);
        self.ssr
            .send_request(&SsrRequest::ReferenceOrientation { azimuth })?;
        Ok(())
    }
}

/// Calibrates to the newest raw pose in a head tracker's history. Returns
/// that pose, or `None` if nothing has been received yet.
pub fn calibrate_to_latest(
    history: &HistoryBuffer<HeadSample>,
    calibration: &SharedCalibration,
) -> Option<Pose> {
    let latest = history.latest()?;
    calibration.calibrate(&latest.raw);
    Some(latest.raw)
}
