use serde::{Deserialize, Serialize};

/// Tuning passed to the segmentation engine on every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    pub remove_ground: bool,
    /// Degrees.
    pub max_angle_of_plane_segmenter: f64,
    pub debug: bool,
    pub downsample_resolution: Option<f64>,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            remove_ground: false,
            max_angle_of_plane_segmenter: 10.0,
            debug: true,
            downsample_resolution: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = SegmentationParams::default();
        assert!(!params.remove_ground);
        assert_eq!(params.max_angle_of_plane_segmenter, 10.0);
        assert!(params.debug);
        assert_eq!(params.downsample_resolution, None);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let params: SegmentationParams =
            serde_json::from_str(r#"{"max_angle_of_plane_segmenter": 25.0}"#).unwrap();
        assert_eq!(params.max_angle_of_plane_segmenter, 25.0);
        assert!(params.debug);
        assert!(!params.remove_ground);
    }
}
