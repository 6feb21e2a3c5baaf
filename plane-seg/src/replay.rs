use std::path::Path;

use crate::{
    error::EngineError,
    segmenter::{BoxError, SegmentationRequest, SegmentationResult, Segmenter},
};

/// Answers every request with the same recorded result.
#[derive(Debug, Clone)]
pub struct ReplaySegmenter {
    result: SegmentationResult,
}

impl ReplaySegmenter {
    pub fn new(result: SegmentationResult) -> Self {
        Self { result }
    }

    /// Loads a result stored as `{"blocks": [...]}`.
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let result: SegmentationResult = serde_json::from_str(&text)?;
        log::info!("replaying {} blocks from {:?}", result.len(), path);
        Ok(Self::new(result))
    }
}

impl Segmenter for ReplaySegmenter {
    fn segment(&mut self, _request: SegmentationRequest) -> Result<SegmentationResult, BoxError> {
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write as _, sync::Arc};

    use pcd_core::pointcloud::point::LabeledCloud;

    use super::*;
    use crate::params::SegmentationParams;

    #[test]
    fn loads_blocks_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"blocks": [{{
                "size": [1.0, 0.5, 0.0],
                "pose": {{"translation": [0.0, 0.0, 0.2], "rotation": {{"w": 1.0, "x": 0.0, "y": 0.0, "z": 0.0}}}},
                "hull": [[0.0, 0.0, 0.2], [1.0, 0.0, 0.2], [1.0, 0.5, 0.2]]
            }}]}}"#
        )
        .unwrap();

        let mut engine = ReplaySegmenter::from_path(file.path()).unwrap();
        let request = SegmentationRequest {
            cloud: Arc::new(LabeledCloud::default()),
            origin: [0.0; 3],
            look_direction: [1.0, 0.0, 0.0],
            params: SegmentationParams::default(),
        };

        let result = engine.segment(request.clone()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.blocks[0].hull.len(), 3);
        assert_eq!(engine.segment(request).unwrap(), result);
    }

    #[test]
    fn bad_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"blocks\": 3}}").unwrap();
        assert!(matches!(
            ReplaySegmenter::from_path(file.path()),
            Err(EngineError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ReplaySegmenter::from_path(&dir.path().join("none.json")),
            Err(EngineError::Io { .. })
        ));
    }
}
