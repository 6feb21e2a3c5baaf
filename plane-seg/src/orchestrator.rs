use std::{sync::Arc, time::Instant};

use pcd_core::{
    geometry::{sensor_look_direction, vector, vector::Vector3, Pose},
    pointcloud::point::LabeledCloud,
};

use crate::{
    error::SegmentationError,
    params::SegmentationParams,
    segmenter::{SegmentationRequest, SegmentationResult, Segmenter},
};

/// Everything one successful cycle produced.
#[derive(Debug, Clone)]
pub struct Cycle {
    /// Zero-based count of cycles committed before this one.
    pub index: u64,
    pub origin: Vector3,
    pub look_direction: Vector3,
    pub cloud: Arc<LabeledCloud>,
    pub result: Arc<SegmentationResult>,
}

/// Owns the robot pose and the latest segmentation result, and runs one
/// engine call per incoming cloud.
pub struct Orchestrator {
    segmenter: Box<dyn Segmenter>,
    params: SegmentationParams,
    current_pose: Pose,
    last_result: Option<Arc<SegmentationResult>>,
    cycles: u64,
}

impl Orchestrator {
    pub fn new(segmenter: Box<dyn Segmenter>, params: SegmentationParams) -> Self {
        Self {
            segmenter,
            params,
            current_pose: Pose::identity(),
            last_result: None,
            cycles: 0,
        }
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    /// Replaces the cached pose. A pose that is not finite or whose rotation
    /// cannot be normalized is rejected and the previous pose stays in effect.
    pub fn update_pose(&mut self, pose: Pose) -> Result<(), SegmentationError> {
        let pose = Pose::new(pose.translation, pose.rotation).ok_or_else(|| {
            SegmentationError::InvalidInput(format!("malformed pose update: {:?}", pose))
        })?;
        self.current_pose = pose;
        Ok(())
    }

    pub fn current_pose(&self) -> Pose {
        self.current_pose
    }

    pub fn last_result(&self) -> Option<Arc<SegmentationResult>> {
        self.last_result.clone()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Segments `cloud` as seen from the current robot pose. The pose is
    /// copied once, before anything else happens.
    pub fn process_with_current_pose(
        &mut self,
        cloud: Arc<LabeledCloud>,
    ) -> Result<Cycle, SegmentationError> {
        let pose = self.current_pose;
        let look_direction = sensor_look_direction(&pose);
        self.process_cloud(cloud, pose.translation, look_direction)
    }

    pub fn process_cloud(
        &mut self,
        cloud: Arc<LabeledCloud>,
        origin: Vector3,
        look_direction: Vector3,
    ) -> Result<Cycle, SegmentationError> {
        validate(&cloud, origin, look_direction)?;

        let start = Instant::now();
        let request = SegmentationRequest {
            cloud: cloud.clone(),
            origin,
            look_direction,
            params: self.params.clone(),
        };
        let result = self
            .segmenter
            .segment(request)
            .map_err(SegmentationError::SegmentationFailed)?;

        log::info!(
            "segmented {} points into {} blocks in {:?}",
            cloud.len(),
            result.len(),
            start.elapsed()
        );
        if self.params.debug {
            for (i, block) in result.blocks.iter().enumerate() {
                log::debug!(
                    "block {}: size {:?}, position {:?}, {} hull points",
                    i,
                    block.size,
                    block.pose.translation,
                    block.hull.len()
                );
            }
        }

        let result = Arc::new(result);
        self.last_result = Some(result.clone());
        let index = self.cycles;
        self.cycles += 1;

        Ok(Cycle {
            index,
            origin,
            look_direction,
            cloud,
            result,
        })
    }
}

fn validate(
    cloud: &LabeledCloud,
    origin: Vector3,
    look_direction: Vector3,
) -> Result<(), SegmentationError> {
    if cloud.is_empty() {
        return Err(SegmentationError::InvalidInput("empty cloud".to_string()));
    }
    if let Some(index) = cloud.first_non_finite() {
        return Err(SegmentationError::InvalidInput(format!(
            "point {} has a non-finite coordinate",
            index
        )));
    }
    if !vector::is_finite(origin) {
        return Err(SegmentationError::InvalidInput(format!(
            "non-finite sensor origin {:?}",
            origin
        )));
    }
    if vector::normalize(look_direction).is_none() {
        return Err(SegmentationError::InvalidInput(format!(
            "unusable look direction {:?}",
            look_direction
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pcd_core::{
        geometry::{vector::Vector3, Quaternion},
        pointcloud::point::LabeledPoint,
    };

    use super::*;
    use crate::segmenter::{Block, BoxError};

    fn cloud(n: usize) -> Arc<LabeledCloud> {
        Arc::new(LabeledCloud::new(
            (0..n)
                .map(|i| LabeledPoint::with_label(i as f64, 0.0, 0.0, 1))
                .collect(),
        ))
    }

    fn block(x: f64) -> Block {
        Block {
            size: [1.0, 1.0, 0.0],
            pose: Pose::from_translation([x, 0.0, 0.0]),
            hull: vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x + 1.0, 1.0, 0.0]],
        }
    }

    struct Scripted {
        calls: Arc<Mutex<Vec<(Vector3, Vector3, SegmentationParams)>>>,
        fail: bool,
    }

    impl Segmenter for Scripted {
        fn segment(
            &mut self,
            request: SegmentationRequest,
        ) -> Result<SegmentationResult, BoxError> {
            self.calls.lock().unwrap().push((
                request.origin,
                request.look_direction,
                request.params.clone(),
            ));
            if self.fail {
                return Err("engine exploded".into());
            }
            Ok(SegmentationResult {
                blocks: vec![block(request.cloud.len() as f64)],
            })
        }
    }

    fn scripted(fail: bool) -> (Orchestrator, Arc<Mutex<Vec<(Vector3, Vector3, SegmentationParams)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = Scripted {
            calls: calls.clone(),
            fail,
        };
        (
            Orchestrator::new(Box::new(engine), SegmentationParams::default()),
            calls,
        )
    }

    #[test]
    fn cycle_replaces_last_result() {
        let (mut orchestrator, calls) = scripted(false);
        assert!(orchestrator.last_result().is_none());

        let first = orchestrator
            .process_cloud(cloud(2), [0.0; 3], [1.0, 0.0, 0.0])
            .unwrap();
        let second = orchestrator
            .process_cloud(cloud(5), [0.0; 3], [1.0, 0.0, 0.0])
            .unwrap();

        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(orchestrator.cycle_count(), 2);
        assert_eq!(orchestrator.last_result().unwrap().blocks, vec![block(5.0)]);
        assert!(Arc::ptr_eq(&orchestrator.last_result().unwrap(), &second.result));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn empty_cloud_is_rejected_before_the_engine() {
        let (mut orchestrator, calls) = scripted(false);
        orchestrator
            .process_cloud(cloud(3), [0.0; 3], [1.0, 0.0, 0.0])
            .unwrap();
        let before = orchestrator.last_result().unwrap();

        let error = orchestrator
            .process_cloud(cloud(0), [0.0; 3], [1.0, 0.0, 0.0])
            .unwrap_err();

        assert!(matches!(error, SegmentationError::InvalidInput(_)));
        assert!(Arc::ptr_eq(&orchestrator.last_result().unwrap(), &before));
        assert_eq!(orchestrator.cycle_count(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let (mut orchestrator, calls) = scripted(false);
        let nan_cloud = Arc::new(LabeledCloud::new(vec![LabeledPoint::new(f64::NAN, 0.0, 0.0)]));

        let cases = [
            (nan_cloud, [0.0; 3], [1.0, 0.0, 0.0]),
            (cloud(1), [f64::INFINITY, 0.0, 0.0], [1.0, 0.0, 0.0]),
            (cloud(1), [0.0; 3], [0.0; 3]),
            (cloud(1), [0.0; 3], [f64::NAN, 0.0, 0.0]),
        ];
        for (c, origin, look) in cases {
            assert!(matches!(
                orchestrator.process_cloud(c, origin, look),
                Err(SegmentationError::InvalidInput(_))
            ));
        }
        assert!(calls.lock().unwrap().is_empty());
        assert!(orchestrator.last_result().is_none());
    }

    #[test]
    fn engine_failure_keeps_previous_result() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut fail = false;
        let flaky = move |request: SegmentationRequest| -> Result<SegmentationResult, BoxError> {
            calls.lock().unwrap().push(request.origin);
            if fail {
                return Err("no planes".into());
            }
            fail = true;
            Ok(SegmentationResult {
                blocks: vec![block(0.0)],
            })
        };
        let mut orchestrator = Orchestrator::new(Box::new(flaky), SegmentationParams::default());

        orchestrator
            .process_cloud(cloud(1), [0.0; 3], [1.0, 0.0, 0.0])
            .unwrap();
        let error = orchestrator
            .process_cloud(cloud(1), [0.0; 3], [1.0, 0.0, 0.0])
            .unwrap_err();

        assert!(matches!(error, SegmentationError::SegmentationFailed(_)));
        assert_eq!(error.to_string(), "segmentation failed: no planes");
        assert_eq!(orchestrator.last_result().unwrap().blocks, vec![block(0.0)]);
        assert_eq!(orchestrator.cycle_count(), 1);
    }

    #[test]
    fn request_carries_configured_params() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let engine = Scripted {
            calls: calls.clone(),
            fail: false,
        };
        let params = SegmentationParams {
            remove_ground: true,
            max_angle_of_plane_segmenter: 30.0,
            debug: false,
            downsample_resolution: Some(0.02),
        };
        let mut orchestrator = Orchestrator::new(Box::new(engine), params.clone());

        orchestrator
            .process_cloud(cloud(1), [1.0, 2.0, 3.0], [0.0, 1.0, 0.0])
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], ([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], params));
    }

    #[test]
    fn current_pose_drives_origin_and_direction() {
        let (mut orchestrator, calls) = scripted(false);
        let yaw = Quaternion::from_axis_angle([0.0, 0.0, 1.0], std::f64::consts::FRAC_PI_2).unwrap();
        orchestrator
            .update_pose(Pose::new([4.0, 5.0, 0.5], yaw).unwrap())
            .unwrap();

        let cycle = orchestrator.process_with_current_pose(cloud(1)).unwrap();

        assert_eq!(cycle.origin, [4.0, 5.0, 0.5]);
        assert!(cycle.look_direction[0].abs() < 1e-12);
        assert!((cycle.look_direction[1] - 1.0).abs() < 1e-12);
        assert_eq!(calls.lock().unwrap()[0].0, [4.0, 5.0, 0.5]);
    }

    #[test]
    fn malformed_pose_keeps_previous() {
        let (mut orchestrator, _) = scripted(false);
        let good = Pose::from_translation([1.0, 0.0, 0.0]);
        orchestrator.update_pose(good).unwrap();

        let zero_rotation = Pose {
            translation: [2.0, 0.0, 0.0],
            rotation: Quaternion::new(0.0, 0.0, 0.0, 0.0),
        };
        let nan_translation = Pose {
            translation: [f64::NAN, 0.0, 0.0],
            rotation: Quaternion::identity(),
        };
        for pose in [zero_rotation, nan_translation] {
            assert!(matches!(
                orchestrator.update_pose(pose),
                Err(SegmentationError::InvalidInput(_))
            ));
        }
        assert_eq!(orchestrator.current_pose(), good);
    }

    #[test]
    fn pose_updates_are_normalized() {
        let (mut orchestrator, _) = scripted(false);
        orchestrator
            .update_pose(Pose {
                translation: [0.0; 3],
                rotation: Quaternion::new(2.0, 0.0, 0.0, 0.0),
            })
            .unwrap();
        assert_eq!(orchestrator.current_pose().rotation, Quaternion::identity());
    }
}
