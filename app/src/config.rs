use std::path::Path;

use hull_exporter::{messages::StampMode, ColorPalette};
use plane_seg::SegmentationParams;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings read from `--config`. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationParams,
    pub frame_id: String,
    pub stamp: StampMode,
    pub palette: ColorPalette,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationParams::default(),
            frame_id: "odom".to_string(),
            stamp: StampMode::Zero,
            palette: ColorPalette::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AppError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })
    }
}
