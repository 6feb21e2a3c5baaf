use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
    #[error("unknown test case {0}")]
    UnknownTestCase(u8),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("invalid data at record {record}: {message}")]
    InvalidData { record: usize, message: String },
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("missing field '{0}'")]
    MissingField(String),
}
