//! The small amount of quaternion arithmetic the bridges need: norms,
//! conjugates, and the Hamilton product.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Mul;

/// A quaternion `w + xi + yj + zk`, with `w` as the scalar part.
///
/// Orientations reported by the tracking system are unit quaternions, but
/// nothing here assumes that; the operations that need a unit quaternion
/// normalize first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// Scalar part
    pub w: f64,
    /// i component
    pub x: f64,
    /// j component
    pub y: f64,
    /// k component
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Builds a quaternion from its scalar part followed by the vector part.
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The rotation that does nothing, `(1, 0, 0, 0)`.
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Euclidean norm over all four components.
    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns this quaternion scaled to unit norm. A zero quaternion has no
    /// direction, so it normalizes to the identity.
    pub fn normalize(&self) -> Self {
        let n = self.norm();
        if n == 0.0 || !n.is_finite() {
            return Self::identity();
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// The conjugate `w - xi - yj - zk`. For a unit quaternion this is also
    /// the inverse rotation.
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Multiplies every component by `k`.
    pub fn scale(&self, k: f64) -> Self {
        Self::new(self.w * k, self.x * k, self.y * k, self.z * k)
    }

    /// Component-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.w - other.w).abs() <= tolerance
            && (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

// Hamilton product. `a * b` applies `b` first, then `a`.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}

impl Display for Quaternion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, {:.3})",
            self.w, self.x, self.y, self.z
        )
    }
}
