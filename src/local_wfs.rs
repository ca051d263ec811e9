//! Listener tracking for local sound field synthesis.
//!
//! Two renderers are involved. The first one drives the real loudspeakers
//! and renders a circular array of virtual point sources, which follows the
//! listener around. The second one renders the actual scene for that
//! virtual array, so its reference has to follow the listener as well.

use crate::bridge::Bridge;
use crate::error::{RendererError, SendError, TrackingError};
use crate::geometry::{circular_array, planar};
use crate::pose::Pose;
use crate::renderer::RendererConnection;
use crate::ssr_message::{SourceId, SsrRequest};
use crate::tracking_source::TrackingSource;
use log::info;
use std::fmt;

/// A [`Bridge`] moving a circular source array, and a second renderer's
/// reference, to wherever the tracked rigid body is.
pub struct LocalWfs<T, R1, R2>
where
    T: TrackingSource,
    R1: RendererConnection,
    R2: RendererConnection,
{
    optitrack: T,
    ssr: R1,
    ssr2: R2,
    num_sources: usize,
    radius: f64,
    rb_id: usize,
}

impl<T, R1, R2> LocalWfs<T, R1, R2>
where
    T: TrackingSource,
    R1: RendererConnection,
    R2: RendererConnection,
{
    /// Creates sources `1..=num_sources` on `ssr`, once. Those ids are reused
    /// for every position update and never recreated.
    pub fn new(
        optitrack: T,
        mut ssr: R1,
        ssr2: R2,
        num_sources: usize,
        radius: f64,
        rb_id: usize,
    ) -> Result<Self, RendererError> {
        for id in 1..=num_sources {
            ssr.send_request(&SsrRequest::CreateSource {
                id: id as SourceId,
            })?;
        }
        info!("Created {} virtual sources", num_sources);

        Ok(Self {
            optitrack,
            ssr,
            ssr2,
            num_sources,
            radius,
            rb_id,
        })
    }
}

impl<T, R1, R2> fmt::Display for LocalWfs<T, R1, R2>
where
    T: TrackingSource,
    R1: RendererConnection,
    R2: RendererConnection,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LocalWfs(rb {}, {} sources, r = {} m)",
            self.rb_id, self.num_sources, self.radius
        )
    }
}

impl<T, R1, R2> Bridge for LocalWfs<T, R1, R2>
where
    T: TrackingSource + 'static,
    R1: RendererConnection + 'static,
    R2: RendererConnection + 'static,
{
    type Sample = Pose;

    // Only the position is used, the orientation is carried along untouched.
    fn receive(&mut self) -> Result<Pose, TrackingError> {
        self.optitrack.get_rigid_body(self.rb_id)
    }

    fn send(&mut self, center: &Pose) -> Result<(), SendError> {
        let center = planar(&center.position);
        let mut failures = Vec::new();

        // Once a write to a connection fails, the rest of this frame's
        // updates for that connection are skipped.
        for (i, p) in circular_array(center, self.num_sources, self.radius)
            .iter()
            .enumerate()
        {
            let request = SsrRequest::SourcePosition {
                id: (i + 1) as SourceId,
                x: p.x,
                y: p.y,
            };
            if let Err(e) = self.ssr.send_request(&request) {
                failures.push(e);
                break;
            }
        }

        if let Err(e) = self.ssr2.send_request(&SsrRequest::ReferencePosition {
            x: center.x,
            y: center.y,
        }) {
            failures.push(e);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SendError { failures })
        }
    }
}
