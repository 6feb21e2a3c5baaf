use std::{io, path::PathBuf};

use pcd_parser::ParseError;
use plane_seg::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to read config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to open report {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("either --blocks or --engine is required")]
    NoEngine,
    #[error("failed to start the segmentation worker: {0}")]
    Worker(#[source] io::Error),
    #[error("the segmentation worker stopped unexpectedly")]
    WorkerStopped,
}
