//! Per-block text report, one JSON object keyed by `"<cycle>_<block + 1>"`.
//!
//! A stream of reports is JSON Lines: each cycle is written as a single line.

use std::io::Write;

use pcd_core::geometry::vector::Vector3;
use plane_seg::Block;
use serde::{ser::Serializer, Serialize};

use crate::PublishError;

const CLASS_NAME: &str = "BoxAffordanceItem";
const PLACEHOLDER_COLOR: [f64; 3] = [0.5, 0.4, 0.5];
const PLACEHOLDER_ALPHA: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub classname: &'static str,
    /// Position, then rotation as `[w, x, y, z]`.
    pub pose: (Vector3, [f64; 4]),
    pub uuid: String,
    #[serde(rename = "Dimensions")]
    pub dimensions: Vector3,
    #[serde(rename = "Color")]
    pub color: [f64; 3],
    #[serde(rename = "Alpha")]
    pub alpha: f64,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Entries keep block order when serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub entries: Vec<BlockReport>,
}

impl CycleReport {
    pub fn new(cycle_index: u64, blocks: &[Block]) -> Self {
        let entries = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let q = block.pose.rotation;
                BlockReport {
                    classname: CLASS_NAME,
                    pose: (block.pose.translation, [q.w, q.x, q.y, q.z]),
                    uuid: format!("{}_{}", cycle_index, i + 1),
                    dimensions: block.size,
                    color: PLACEHOLDER_COLOR,
                    alpha: PLACEHOLDER_ALPHA,
                    name: format!("block {}", i),
                }
            })
            .collect();
        Self { entries }
    }

    /// Appends the report as one line of JSON.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), PublishError> {
        serde_json::to_writer(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl Serialize for CycleReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|entry| (&entry.uuid, entry)))
    }
}
