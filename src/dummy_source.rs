use crate::error::TrackingError;
use crate::pose::{Pose, Position, TimeData};
use crate::quaternion::Quaternion;
use crate::tracking_source::{pacing, TrackingSource};
use rand::prelude::*;
use std::f64::consts::PI;
use std::time::{Duration, Instant};

/// A fake tracking system with a single rigid body that walks in a circle
/// around the origin while slowly turning, so that both bridges have
/// something to do without any hardware around.
pub struct DummySource {
    interval: Duration,
    orbit: f64,
    period: f64,
    noise: f64,
    dropout: f64,
    frame: u32,
    start: Instant,
    next_due: Option<Instant>,
}

/// Builds a [`DummySource`]. Everything has a sensible default.
#[derive(Debug, Clone)]
pub struct DummySourceBuilder {
    rate: f64,
    orbit: f64,
    period: f64,
    noise: f64,
    dropout: f64,
}

impl Default for DummySourceBuilder {
    fn default() -> Self {
        Self {
            rate: 120.0,
            orbit: 1.0,
            period: 10.0,
            noise: 0.0,
            dropout: 0.0,
        }
    }
}

impl DummySourceBuilder {
    /// Frames per second. Motive defaults to 120.
    pub fn rate(self, rate: f64) -> Self {
        Self { rate, ..self }
    }

    /// Radius of the walked circle, in meters.
    pub fn orbit(self, orbit: f64) -> Self {
        Self { orbit, ..self }
    }

    /// Seconds per lap and per full turn.
    pub fn period(self, period: f64) -> Self {
        Self { period, ..self }
    }

    /// Uniform noise added to every coordinate, in meters.
    pub fn noise(self, noise: f64) -> Self {
        Self { noise, ..self }
    }

    /// Chance of a receive reporting that nothing arrived.
    pub fn dropout(self, dropout: f64) -> Self {
        Self {
            dropout: dropout.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Fails if the rate is negative or too low to pace.
    pub fn build(self) -> Result<DummySource, TrackingError> {
        Ok(DummySource {
            interval: pacing(self.rate)?,
            orbit: self.orbit,
            period: if self.period > 0.0 { self.period } else { 1.0 },
            noise: self.noise.abs(),
            dropout: self.dropout,
            frame: 0,
            start: Instant::now(),
            next_due: None,
        })
    }
}

impl DummySource {
    #[allow(missing_docs)]
    pub fn builder() -> DummySourceBuilder {
        DummySourceBuilder::default()
    }

    // x and z span the floor, y is up, as in Motive.
    fn pose_at(&self, t: f64, rng: &mut impl Rng) -> Pose {
        let angle = 2.0 * PI * t / self.period;
        let mut jitter = || {
            if self.noise > 0.0 {
                rng.gen_range(-self.noise..self.noise)
            } else {
                0.0
            }
        };
        let position = Position::new(
            self.orbit * angle.cos() + jitter(),
            1.7 + jitter(),
            self.orbit * angle.sin() + jitter(),
        );
        // Turning about the tracker's x axis, which is what the head tracker
        // reads as its azimuth.
        let half = angle / 2.0;
        let orientation = Quaternion::new(half.cos(), half.sin(), 0.0, 0.0);

        Pose {
            position,
            orientation,
            time: TimeData {
                timestamp: t,
                timecode: self.frame,
                latency: 0.0,
            },
        }
    }
}

impl TrackingSource for DummySource {
    // There is only one rigid body, so `rb_id` is ignored.
    fn get_rigid_body(&mut self, _rb_id: usize) -> Result<Pose, TrackingError> {
        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                spin_sleep::sleep(due - now);
            }
        }
        self.next_due = Some(Instant::now() + self.interval);

        let mut rng = thread_rng();
        if self.dropout > 0.0 && rng.gen_bool(self.dropout) {
            return Err(TrackingError::Unavailable);
        }

        self.frame = self.frame.wrapping_add(1);
        let t = self.start.elapsed().as_secs_f64();
        Ok(self.pose_at(t, &mut rng))
    }
}
