mod error;
pub mod messages;
pub mod palette;
pub mod primitives;
pub mod publisher;
pub mod report;

pub use error::PublishError;
pub use palette::{ColorPalette, Rgb};
pub use primitives::{hulls_to_primitives, ColoredPoint, LineSegment, VisualPrimitiveSet};
pub use publisher::{ChannelPublisher, JsonDirPublisher, Publisher, VisualizationPublisher};
