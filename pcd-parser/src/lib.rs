pub mod dataset;
mod error;
pub mod parsers;

pub use error::ParseError;
