//! Message shapes handed to publishers, one per output topic.

use pcd_core::{
    geometry::{vector::Vector3, Frame, Pose},
    pointcloud::point::LabeledPoint,
};
use serde::{Deserialize, Serialize};

use crate::primitives::{ColoredPoint, LineSegment};

pub const RECEIVED_CLOUD_TOPIC: &str = "/plane_seg/received_cloud";
pub const HULL_CLOUD_TOPIC: &str = "/plane_seg/hull_cloud";
pub const HULL_MARKERS_TOPIC: &str = "/plane_seg/hull_markers";
pub const LOOK_POSE_TOPIC: &str = "/plane_seg/look_pose";

const HULL_LINES_NAMESPACE: &str = "hull lines";
const HULL_LINE_WIDTH: f64 = 0.03;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i64,
    pub nanosec: u32,
}

impl Stamp {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Self {
            sec: now.timestamp(),
            nanosec: now.timestamp_subsec_nanos(),
        }
    }
}

/// How outgoing headers are stamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampMode {
    #[default]
    Zero,
    Now,
}

impl StampMode {
    pub fn stamp(&self) -> Stamp {
        match self {
            StampMode::Zero => Stamp::zero(),
            StampMode::Now => Stamp::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub frame_id: String,
    pub stamp: Stamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledCloudMessage {
    pub header: Header,
    pub points: Vec<LabeledPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColoredCloudMessage {
    pub header: Header,
    pub points: Vec<ColoredPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    LineList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerAction {
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseMessage {
    pub position: Vector3,
    /// `[x, y, z, w]`
    pub orientation: [f64; 4],
}

impl From<&Pose> for PoseMessage {
    fn from(pose: &Pose) -> Self {
        Self {
            position: pose.translation,
            orientation: pose.rotation.to_xyzw(),
        }
    }
}

/// All hull outlines as one line list: two points per segment, each with
/// its own color. The geometry is fixed in the header frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineListMarker {
    pub header: Header,
    pub ns: String,
    pub id: i32,
    pub kind: MarkerKind,
    pub action: MarkerAction,
    pub pose: PoseMessage,
    pub scale: Vector3,
    pub color: ColorRgba,
    pub points: Vec<Vector3>,
    pub colors: Vec<ColorRgba>,
    pub frame_locked: bool,
}

impl LineListMarker {
    pub fn from_segments(header: Header, segments: &[LineSegment]) -> Self {
        let mut points = Vec::with_capacity(segments.len() * 2);
        let mut colors = Vec::with_capacity(segments.len() * 2);
        for segment in segments {
            let [r, g, b] = segment.color.to_unit();
            let color = ColorRgba { r, g, b, a: 1.0 };
            points.extend([segment.start, segment.end]);
            colors.extend([color, color]);
        }

        Self {
            header,
            ns: HULL_LINES_NAMESPACE.to_string(),
            id: 0,
            kind: MarkerKind::LineList,
            action: MarkerAction::Add,
            pose: PoseMessage::from(&Pose::identity()),
            scale: [HULL_LINE_WIDTH; 3],
            color: ColorRgba {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            points,
            colors,
            frame_locked: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStampedMessage {
    pub header: Header,
    pub pose: PoseMessage,
}

impl PoseStampedMessage {
    pub fn from_frame(header: Header, frame: &Frame) -> Self {
        Self {
            header,
            pose: PoseMessage::from(&frame.to_pose()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    ReceivedCloud(LabeledCloudMessage),
    HullCloud(ColoredCloudMessage),
    HullMarkers(LineListMarker),
    LookPose(PoseStampedMessage),
}

impl Message {
    pub fn topic(&self) -> &'static str {
        match self {
            Message::ReceivedCloud(_) => RECEIVED_CLOUD_TOPIC,
            Message::HullCloud(_) => HULL_CLOUD_TOPIC,
            Message::HullMarkers(_) => HULL_MARKERS_TOPIC,
            Message::LookPose(_) => LOOK_POSE_TOPIC,
        }
    }
}
