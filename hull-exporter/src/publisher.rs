use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use crossbeam::channel::Sender;
use pcd_core::geometry::build_frame;
use plane_seg::{worker::CycleSink, Cycle, SegmentationError};

use crate::{
    messages::{
        ColoredCloudMessage, Header, LabeledCloudMessage, LineListMarker, Message,
        PoseStampedMessage, StampMode,
    },
    palette::ColorPalette,
    primitives::hulls_to_primitives,
    report::CycleReport,
    PublishError,
};

/// Delivers messages to their topic. Delivery is best effort.
pub trait Publisher: Send {
    fn publish(&mut self, cycle: u64, message: &Message) -> Result<(), PublishError>;
}

/// Writes each message to `<root>/<cycle>/<topic>.json`.
pub struct JsonDirPublisher {
    root: PathBuf,
}

impl JsonDirPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn message_path(&self, cycle: u64, topic: &str) -> PathBuf {
        self.root
            .join(cycle.to_string())
            .join(format!("{}.json", topic.trim_start_matches('/')))
    }
}

impl Publisher for JsonDirPublisher {
    fn publish(&mut self, cycle: u64, message: &Message) -> Result<(), PublishError> {
        let path = self.message_path(cycle, message.topic());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(&path)?);
        serde_json::to_writer(&mut writer, message)?;
        writer.flush()?;
        log::debug!("wrote {:?}", path);
        Ok(())
    }
}

/// Forwards messages to an in-process subscriber.
pub struct ChannelPublisher {
    sender: Sender<(u64, Message)>,
}

impl ChannelPublisher {
    pub fn new(sender: Sender<(u64, Message)>) -> Self {
        Self { sender }
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&mut self, cycle: u64, message: &Message) -> Result<(), PublishError> {
        self.sender
            .send((cycle, message.clone()))
            .map_err(|_| PublishError::Disconnected(message.topic()))
    }
}

/// Turns finished cycles into visualization messages and hands them to every
/// registered publisher. Optionally writes the block report as well.
pub struct VisualizationPublisher {
    palette: ColorPalette,
    frame_id: String,
    stamp_mode: StampMode,
    publishers: Vec<Box<dyn Publisher>>,
    report: Option<Box<dyn Write + Send>>,
}

impl VisualizationPublisher {
    pub fn new(palette: ColorPalette, frame_id: impl Into<String>, stamp_mode: StampMode) -> Self {
        Self {
            palette,
            frame_id: frame_id.into(),
            stamp_mode,
            publishers: Vec::new(),
            report: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    pub fn with_report(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.report = Some(writer);
        self
    }

    /// Messages for one cycle, in publishing order. The look pose is left out
    /// when the look direction has no usable frame.
    pub fn messages(&self, cycle: &Cycle) -> Vec<Message> {
        let header = Header {
            frame_id: self.frame_id.clone(),
            stamp: self.stamp_mode.stamp(),
        };
        let primitives = hulls_to_primitives(&cycle.result.blocks, &self.palette);

        let mut messages = vec![
            Message::ReceivedCloud(LabeledCloudMessage {
                header: header.clone(),
                points: cycle.cloud.points.clone(),
            }),
            Message::HullCloud(ColoredCloudMessage {
                header: header.clone(),
                points: primitives.points,
            }),
            Message::HullMarkers(LineListMarker::from_segments(
                header.clone(),
                &primitives.segments,
            )),
        ];

        match build_frame(cycle.origin, cycle.look_direction) {
            Ok(frame) => messages.push(Message::LookPose(PoseStampedMessage::from_frame(
                header, &frame,
            ))),
            Err(e) => log::warn!("cycle {}: look pose not published: {}", cycle.index, e),
        }

        messages
    }

    fn write_report(&mut self, cycle: &Cycle) {
        let Some(writer) = self.report.as_mut() else {
            return;
        };
        let report = CycleReport::new(cycle.index, &cycle.result.blocks);
        if let Err(e) = report.write_to(writer) {
            log::error!("failed to write report for cycle {}: {}", cycle.index, e);
        }
    }
}

impl CycleSink for VisualizationPublisher {
    fn on_cycle(&mut self, cycle: &Cycle) {
        let messages = self.messages(cycle);
        for message in &messages {
            for publisher in self.publishers.iter_mut() {
                if let Err(e) = publisher.publish(cycle.index, message) {
                    log::warn!("failed to publish {}: {}", message.topic(), e);
                }
            }
        }
        log::info!(
            "cycle {}: published {} messages for {} blocks",
            cycle.index,
            messages.len(),
            cycle.result.len()
        );

        self.write_report(cycle);
    }

    fn on_error(&mut self, error: &SegmentationError) {
        match error {
            SegmentationError::InvalidInput(_) => log::warn!("cycle skipped: {}", error),
            SegmentationError::SegmentationFailed(_) => log::error!("{}", error),
        }
    }
}
