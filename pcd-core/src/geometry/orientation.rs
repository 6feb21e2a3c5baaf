use serde::{Deserialize, Serialize};

use super::pose::Pose;
use super::quaternion::Quaternion;
use super::vector::Vector3;

/// Roll, pitch and yaw in radians (aerospace / ZYX convention).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn from_quaternion(q: &Quaternion) -> Self {
        let Quaternion { w, x, y, z } = *q;

        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        // Rounding can push the sine slightly past +-1 at the poles.
        let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

        Self { roll, pitch, yaw }
    }

    pub fn to_quaternion(&self) -> Quaternion {
        let (sr, cr) = (self.roll / 2.0).sin_cos();
        let (sp, cp) = (self.pitch / 2.0).sin_cos();
        let (sy, cy) = (self.yaw / 2.0).sin_cos();

        Quaternion::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }
}

/// Forward direction for the given attitude. Roll is ignored and pitch is
/// negated before use, so a nose-down pitch yields a negative z component.
///
/// The result is not renormalized; the trigonometric form keeps it unit length.
pub fn look_direction(angles: &EulerAngles) -> Vector3 {
    let yaw = angles.yaw;
    let pitch = -angles.pitch;
    [
        yaw.cos() * pitch.cos(),
        yaw.sin() * pitch.cos(),
        pitch.sin(),
    ]
}

/// Sensor look direction derived from a robot pose's rotation.
pub fn sensor_look_direction(pose: &Pose) -> Vector3 {
    look_direction(&EulerAngles::from_quaternion(&pose.rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vector;

    #[test]
    fn identity_looks_along_x() {
        let angles = EulerAngles::from_quaternion(&Quaternion::identity());
        assert_eq!(angles, EulerAngles::default());
        assert_eq!(look_direction(&angles), [1.0, 0.0, 0.0]);
        assert_eq!(sensor_look_direction(&Pose::identity()), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn decomposition_round_trips() {
        let axes = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [1.0, -2.0, 3.0],
            [-0.3, 0.5, 0.8],
        ];
        let angles = [-3.0, -1.5, -0.4, 0.0, 0.7, 1.9, 3.1];

        for axis in axes {
            for angle in angles {
                let q = Quaternion::from_axis_angle(axis, angle).unwrap();
                let rebuilt = EulerAngles::from_quaternion(&q).to_quaternion();
                assert!(
                    q.same_rotation(&rebuilt, 1e-9),
                    "axis {:?} angle {}: {:?} vs {:?}",
                    axis,
                    angle,
                    q,
                    rebuilt
                );
            }
        }
    }

    #[test]
    fn pole_does_not_produce_nan() {
        // Slightly denormalized quarter turn about y puts the asin argument above 1.
        let q = Quaternion::new(0.7071068, 0.0, 0.7071068, 0.0);
        let angles = EulerAngles::from_quaternion(&q);
        assert!(angles.pitch.is_finite());
        assert!((angles.pitch - std::f64::consts::FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn nose_down_pitch_looks_down() {
        let q = Quaternion::from_axis_angle([0.0, 1.0, 0.0], 0.3).unwrap();
        let dir = sensor_look_direction(&Pose::new([1.0, 2.0, 3.0], q).unwrap());

        assert!((dir[0] - 0.3f64.cos()).abs() < 1e-12);
        assert!(dir[1].abs() < 1e-12);
        assert!((dir[2] + 0.3f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn yaw_turns_direction_and_keeps_unit_length() {
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], std::f64::consts::FRAC_PI_2).unwrap();
        let dir = sensor_look_direction(&Pose::new([0.0; 3], q).unwrap());

        assert!(dir[0].abs() < 1e-12);
        assert!((dir[1] - 1.0).abs() < 1e-12);
        assert!(dir[2].abs() < 1e-12);

        let tilted = EulerAngles {
            roll: 0.4,
            pitch: -0.8,
            yaw: 2.2,
        };
        assert!(vector::norm(look_direction(&tilted)) <= 1.0 + 1e-12);
    }
}
