use std::{io, path::PathBuf};

use crate::segmenter::BoxError;

/// Per-cycle failures. None of them is fatal to the worker.
#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("segmentation failed: {0}")]
    SegmentationFailed(#[source] BoxError),
}

/// Failures of the bundled engines.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid engine JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to run engine command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("engine command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
}
