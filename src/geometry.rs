//! Layouts of virtual sources in the renderer's horizontal plane.

use crate::pose::Position;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Display;

/// A point in the renderer's plane, in meters.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    /// Renderer x, the tracker's x
    pub x: f64,
    /// Renderer y, the tracker's z
    pub y: f64,
}

impl Point {
    #[allow(missing_docs)]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn abs_dist(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Projects a tracked position onto the renderer's plane.
///
/// Motive streams a Y-up frame, so the floor is spanned by x and z. The
/// tracker's x becomes the renderer's x and the tracker's z becomes the
/// renderer's y; the height is dropped.
pub fn planar(position: &Position) -> Point {
    Point::new(position.x, position.z)
}

/// `num_points` points evenly spaced on a circle of `radius` around
/// `center`. The first point sits at angle 0, i.e. at `center + (radius, 0)`,
/// and the angle grows counterclockwise in steps of `2π / num_points`.
pub fn circular_array(center: Point, num_points: usize, radius: f64) -> Vec<Point> {
    if num_points == 0 {
        return Vec::new();
    }
    (0..num_points)
        .map(|k| (k as f64 / num_points as f64) * 2.0 * PI)
        .map(|angle| Point {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        })
        .collect()
}
