//! The upstream side of a bridge: where poses come from.

use crate::config;
use crate::error::TrackingError;
use crate::pose::Pose;
use crate::pose_decoder::{NatNetVersion, TrackingPacket};
use log::{info, warn};
use std::{io, time::Duration};

/// [`config::frame_interval`] for sources, which can only fail with a
/// [`TrackingError`].
pub fn pacing(rate: f64) -> Result<Duration, TrackingError> {
    config::frame_interval(rate)
        .map_err(|e| TrackingError::Io(io::Error::new(io::ErrorKind::InvalidInput, e.to_string())))
}

/// A blocking source of rigid body poses.
///
/// `get_rigid_body` waits for the next frame and returns the pose of the
/// rigid body at `rb_id` in it. Implementations should bound the wait, and
/// report [`TrackingError::Unavailable`] when nothing arrived in time, so
/// that a bridge can notice a stop request.
pub trait TrackingSource: Send {
    /// Receives the next pose of the rigid body at index `rb_id`.
    fn get_rigid_body(&mut self, rb_id: usize) -> Result<Pose, TrackingError>;
}

impl<T: TrackingSource + ?Sized> TrackingSource for Box<T> {
    fn get_rigid_body(&mut self, rb_id: usize) -> Result<Pose, TrackingError> {
        (**self).get_rigid_body(rb_id)
    }
}

/// Keeps track of the protocol version announced by a stream and turns
/// packets into poses.
#[derive(Debug, Default)]
pub struct PacketFilter {
    version: Option<NatNetVersion>,
}

impl PacketFilter {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently announced protocol version.
    pub fn version(&self) -> Option<NatNetVersion> {
        self.version
    }

    /// Version packets are logged the first time they are seen and yield no
    /// pose; versions outside the supported range are fatal. Frames yield
    /// the pose of rigid body `rb_id`.
    pub fn handle(
        &mut self,
        packet: TrackingPacket,
        rb_id: usize,
    ) -> Result<Option<Pose>, TrackingError> {
        match packet {
            TrackingPacket::Version(version) => {
                if self.version != Some(version) {
                    info!("NatNet version received: {}", version);
                    if self.version.is_some() {
                        warn!("NatNet version changed mid-stream");
                    }
                    self.version = Some(version);
                }
                if !version.is_supported() {
                    return Err(TrackingError::UnsupportedVersion(version));
                }
                Ok(None)
            }
            TrackingPacket::Frame(frame) => frame.rigid_body(rb_id).map(Some),
        }
    }
}
