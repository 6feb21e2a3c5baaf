//! Rigid-body geometry used to turn a robot pose into a sensor viewpoint.
//!
//! Vectors are plain `[f64; 3]` arrays; rotations are unit quaternions in
//! `(w, x, y, z)` order.

mod error;
pub mod frame;
pub mod orientation;
pub mod pose;
pub mod quaternion;
pub mod vector;

pub use error::GeometryError;
pub use frame::{build_frame, Frame, WORLD_UP};
pub use orientation::{look_direction, sensor_look_direction, EulerAngles};
pub use pose::Pose;
pub use quaternion::Quaternion;
