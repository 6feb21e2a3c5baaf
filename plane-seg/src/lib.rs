pub mod command;
mod error;
pub mod orchestrator;
mod params;
pub mod replay;
pub mod segmenter;
pub mod worker;

pub use error::{EngineError, SegmentationError};
pub use orchestrator::{Cycle, Orchestrator};
pub use params::SegmentationParams;
pub use segmenter::{Block, BoxError, SegmentationRequest, SegmentationResult, Segmenter};
