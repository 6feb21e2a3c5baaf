use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use byteorder::{ByteOrder as _, LittleEndian};
use pcd_core::pointcloud::point::LabeledCloud;

use crate::ParseError;

pub mod pcd;
pub mod ply;

pub trait ParserProvider {
    fn get_parser(&self) -> Box<dyn Parser>;
}

pub trait Parser {
    fn parse(&self) -> Result<LabeledCloud, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Pcd,
    Ply,
}

pub fn get_extension(path: &Path) -> Result<Extension, ParseError> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pcd") => Ok(Extension::Pcd),
        Some("ply") => Ok(Extension::Ply),
        _ => Err(ParseError::UnsupportedFileFormat(
            path.to_string_lossy().into_owned(),
        )),
    }
}

/// Picks the parser for a set of files sharing one extension.
pub fn parser_for(filenames: Vec<PathBuf>) -> Result<Box<dyn Parser>, ParseError> {
    let mut extensions = Vec::with_capacity(filenames.len());
    for path in &filenames {
        extensions.push(get_extension(path)?);
    }
    extensions.dedup();

    match extensions.as_slice() {
        [Extension::Pcd] => Ok(pcd::PcdParserProvider { filenames }.get_parser()),
        [Extension::Ply] => Ok(ply::PlyParserProvider { filenames }.get_parser()),
        [] => Err(ParseError::UnsupportedFileFormat("no input files".to_string())),
        _ => Err(ParseError::UnsupportedFileFormat(
            "multiple extensions are not supported".to_string(),
        )),
    }
}

pub(crate) fn parse_files(
    filenames: &[PathBuf],
    parse_bytes: fn(&[u8]) -> Result<LabeledCloud, ParseError>,
) -> Result<LabeledCloud, ParseError> {
    let mut cloud = LabeledCloud::default();
    for path in filenames {
        let start = std::time::Instant::now();
        let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed = parse_bytes(&bytes)?;
        log::info!(
            "read {} points from {:?} in {:?}",
            parsed.len(),
            path,
            start.elapsed()
        );
        cloud.extend(parsed);
    }
    Ok(cloud)
}

/// Splits off the ASCII header. Returns the header lines (terminator
/// included) and the byte offset where the body starts.
pub(crate) fn split_header(
    bytes: &[u8],
    is_last: impl Fn(&str) -> bool,
) -> Result<(Vec<String>, usize), ParseError> {
    let mut lines = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let end = bytes[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| offset + p + 1)
            .unwrap_or(bytes.len());
        let line = std::str::from_utf8(&bytes[offset..end])
            .map_err(|_| ParseError::InvalidHeader("header is not valid UTF-8".to_string()))?
            .trim()
            .to_string();
        offset = end;

        let last = is_last(&line);
        lines.push(line);
        if last {
            return Ok((lines, offset));
        }
    }

    Err(ParseError::InvalidHeader(
        "header terminator not found".to_string(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarType {
    pub fn size(&self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    /// Reads one little-endian value; `bytes` must hold at least `size()` bytes.
    pub fn read_le(&self, bytes: &[u8]) -> f64 {
        match self {
            ScalarType::I8 => bytes[0] as i8 as f64,
            ScalarType::U8 => bytes[0] as f64,
            ScalarType::I16 => LittleEndian::read_i16(bytes) as f64,
            ScalarType::U16 => LittleEndian::read_u16(bytes) as f64,
            ScalarType::I32 => LittleEndian::read_i32(bytes) as f64,
            ScalarType::U32 => LittleEndian::read_u32(bytes) as f64,
            ScalarType::I64 => LittleEndian::read_i64(bytes) as f64,
            ScalarType::U64 => LittleEndian::read_u64(bytes) as f64,
            ScalarType::F32 => LittleEndian::read_f32(bytes) as f64,
            ScalarType::F64 => LittleEndian::read_f64(bytes),
        }
    }
}

pub(crate) fn parse_ascii_value(token: &str, record: usize) -> Result<f64, ParseError> {
    token.parse::<f64>().map_err(|e| ParseError::InvalidData {
        record,
        message: format!("failed to parse '{}': {}", token, e),
    })
}
