use serde::{Deserialize, Serialize};

use super::quaternion::Quaternion;
use super::vector::{self, Vector3};

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub const fn identity() -> Self {
        Self {
            translation: [0.0, 0.0, 0.0],
            rotation: Quaternion::identity(),
        }
    }

    /// Builds a pose with a normalized rotation. Returns `None` when the
    /// translation is not finite or the quaternion cannot be normalized.
    pub fn new(translation: Vector3, rotation: Quaternion) -> Option<Self> {
        if !vector::is_finite(translation) {
            return None;
        }
        Some(Self {
            translation,
            rotation: rotation.normalized()?,
        })
    }

    pub fn from_translation(translation: Vector3) -> Self {
        Self {
            translation,
            rotation: Quaternion::identity(),
        }
    }

    pub fn transform_point(&self, point: Vector3) -> Vector3 {
        vector::add(self.rotation.rotate_vector(point), self.translation)
    }

    pub fn is_finite(&self) -> bool {
        vector::is_finite(self.translation) && self.rotation.is_finite()
    }
}
