use std::{
    io::Write as _,
    process::{Command, Stdio},
};

use pcd_core::{geometry::vector::Vector3, pointcloud::point::LabeledPoint};
use serde::Serialize;

use crate::{
    error::EngineError,
    params::SegmentationParams,
    segmenter::{BoxError, SegmentationRequest, SegmentationResult, Segmenter},
};

/// Runs an external program once per cycle. The request goes to its stdin as
/// JSON and a `{"blocks": [...]}` document is expected on stdout.
#[derive(Debug, Clone)]
pub struct CommandSegmenter {
    program: String,
    args: Vec<String>,
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    points: &'a [LabeledPoint],
    origin: Vector3,
    look_direction: Vector3,
    params: &'a SegmentationParams,
}

impl CommandSegmenter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn run(&self, request: &SegmentationRequest) -> Result<SegmentationResult, EngineError> {
        let payload = serde_json::to_vec(&CommandRequest {
            points: &request.cloud.points,
            origin: request.origin,
            look_direction: request.look_direction,
            params: &request.params,
        })?;

        let spawn_error = |source| EngineError::Spawn {
            program: self.program.clone(),
            source,
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin from another thread so a chatty child cannot fill its
        // stdout pipe while we are still writing.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                if let Err(e) = stdin.write_all(&payload) {
                    log::debug!("engine command closed stdin early: {}", e);
                }
            })
        });
        let output = child.wait_with_output().map_err(spawn_error)?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

impl Segmenter for CommandSegmenter {
    fn segment(&mut self, request: SegmentationRequest) -> Result<SegmentationResult, BoxError> {
        Ok(self.run(&request)?)
    }
}
