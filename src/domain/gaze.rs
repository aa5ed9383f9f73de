// ============================================================
// Layer 3 — Gaze Geometry
// ============================================================
// GazeDirection: the unit vector from a head to its gaze target,
// in normalised image coordinates. It is the training label and
// the network's output, and angle_between is the reported error.

use serde::{Deserialize, Serialize};

/// A 2D unit vector in normalised image coordinates
/// (x to the right, y downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeDirection {
    pub x: f32,
    pub y: f32,
}

impl GazeDirection {
    /// Normalise `(x, y)`. Returns `None` for a zero-length vector.
    pub fn from_vector(x: f32, y: f32) -> Option<Self> {
        let norm = (x * x + y * y).sqrt();
        if norm <= f32::EPSILON || !norm.is_finite() {
            return None;
        }
        Some(Self { x: x / norm, y: y / norm })
    }

    /// Direction pointing from `from` to `to`.
    pub fn between(from: [f32; 2], to: [f32; 2]) -> Option<Self> {
        Self::from_vector(to[0] - from[0], to[1] - from[1])
    }

    pub fn dot(&self, other: &GazeDirection) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unsigned angle to `other` in degrees, in [0, 180].
    pub fn angle_between(&self, other: &GazeDirection) -> f32 {
        self.dot(other).clamp(-1.0, 1.0).acos().to_degrees()
    }

    pub fn as_array(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_vector_has_no_direction() {
        assert!(GazeDirection::from_vector(0.0, 0.0).is_none());
        assert!(GazeDirection::between([0.5, 0.5], [0.5, 0.5]).is_none());
    }

    #[test]
    fn test_angle_between() {
        let right = GazeDirection::from_vector(1.0, 0.0).unwrap();
        let down  = GazeDirection::from_vector(0.0, 3.0).unwrap();
        let left  = GazeDirection::from_vector(-2.0, 0.0).unwrap();
        assert!((right.angle_between(&down) - 90.0).abs() < 1e-3);
        assert!((right.angle_between(&left) - 180.0).abs() < 1e-3);
        assert!(right.angle_between(&right).abs() < 1e-3);
    }
}
