use std::sync::Arc;

use pcd_core::{
    geometry::{vector::Vector3, Pose},
    pointcloud::point::LabeledCloud,
};
use serde::{Deserialize, Serialize};

use crate::params::SegmentationParams;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Input of one engine call. Built per cycle and moved into the engine.
#[derive(Debug, Clone)]
pub struct SegmentationRequest {
    pub cloud: Arc<LabeledCloud>,
    pub origin: Vector3,
    pub look_direction: Vector3,
    pub params: SegmentationParams,
}

/// A planar patch found by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub size: Vector3,
    pub pose: Pose,
    /// Ordered boundary polygon; the loop closes implicitly.
    pub hull: Vec<Vector3>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub blocks: Vec<Block>,
}

impl SegmentationResult {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The plane segmentation engine. Calls are blocking and run to completion.
pub trait Segmenter: Send {
    fn segment(&mut self, request: SegmentationRequest) -> Result<SegmentationResult, BoxError>;
}

impl<F> Segmenter for F
where
    F: FnMut(SegmentationRequest) -> Result<SegmentationResult, BoxError> + Send,
{
    fn segment(&mut self, request: SegmentationRequest) -> Result<SegmentationResult, BoxError> {
        self(request)
    }
}
