//! Rigid body poses as reported by the tracking system.

use crate::quaternion::Quaternion;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Sub;

/// A point in the tracking system's coordinate frame, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
    #[allow(missing_docs)]
    pub z: f64,
}

impl Position {
    #[allow(missing_docs)]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance to the origin.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl From<[f64; 3]> for Position {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Timing metadata attached to a tracking frame. None of it is interpreted
/// here, it is only passed along.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeData {
    /// Seconds since the tracking software started streaming
    pub timestamp: f64,
    /// SMPTE timecode packed into an integer
    pub timecode: u32,
    /// Latency reported by the tracking software
    pub latency: f64,
}

/// Position and orientation of one rigid body at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    #[allow(missing_docs)]
    pub position: Position,
    #[allow(missing_docs)]
    pub orientation: Quaternion,
    #[allow(missing_docs)]
    pub time: TimeData,
}

impl Pose {
    /// A pose with no timing information.
    pub fn new(position: Position, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
            time: TimeData::default(),
        }
    }

    /// Returns the same pose stamped with `time`.
    pub fn with_time(self, time: TimeData) -> Self {
        Self { time, ..self }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pos {} ori {} @ {:.3}s",
            self.position, self.orientation, self.time.timestamp
        )
    }
}
