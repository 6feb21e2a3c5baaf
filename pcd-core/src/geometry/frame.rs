use super::error::GeometryError;
use super::pose::Pose;
use super::quaternion::Quaternion;
use super::vector::{self, Vector3};

pub const WORLD_UP: Vector3 = [0.0, 0.0, 1.0];

// Below this |z x up| the look direction is treated as vertical.
const PARALLEL_EPSILON: f64 = 1e-6;

/// Viewing frame of the sensor: z forward, x to the right, y down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Vector3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub z_axis: Vector3,
}

impl Frame {
    /// Row-major matrix whose columns are the frame axes.
    pub fn rotation_matrix(&self) -> [[f64; 3]; 3] {
        let (x, y, z) = (self.x_axis, self.y_axis, self.z_axis);
        [
            [x[0], y[0], z[0]],
            [x[1], y[1], z[1]],
            [x[2], y[2], z[2]],
        ]
    }

    pub fn to_pose(&self) -> Pose {
        Pose {
            translation: self.origin,
            rotation: Quaternion::from_rotation_matrix(&self.rotation_matrix()),
        }
    }
}

/// Builds a right-handed orthonormal frame looking along `look_direction`.
///
/// `look_direction` does not need to be normalized. A zero-length direction or
/// one parallel to [`WORLD_UP`] has no defined x axis and is rejected.
pub fn build_frame(origin: Vector3, look_direction: Vector3) -> Result<Frame, GeometryError> {
    let degenerate = || GeometryError::DegenerateFrame { look_direction };

    let z_axis = vector::normalize(look_direction).ok_or_else(degenerate)?;
    let side = vector::cross(z_axis, WORLD_UP);
    if vector::norm(side) < PARALLEL_EPSILON {
        return Err(degenerate());
    }
    let x_axis = vector::normalize(side).ok_or_else(degenerate)?;
    let y_axis = vector::cross(z_axis, x_axis);

    Ok(Frame {
        origin,
        x_axis,
        y_axis,
        z_axis,
    })
}
