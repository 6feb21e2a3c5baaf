use std::path::PathBuf;

use pcd_core::pointcloud::point::{LabeledCloud, LabeledPoint};
use rayon::{
    iter::{IndexedParallelIterator as _, IntoParallelIterator as _, ParallelIterator as _},
    slice::ParallelSlice as _,
};

use super::{parse_ascii_value, parse_files, split_header, Parser, ParserProvider, ScalarType};
use crate::ParseError;

pub struct PcdParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for PcdParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(PcdParser {
            filenames: self.filenames.clone(),
        })
    }
}

pub struct PcdParser {
    pub filenames: Vec<PathBuf>,
}

impl Parser for PcdParser {
    fn parse(&self) -> Result<LabeledCloud, ParseError> {
        parse_files(&self.filenames, parse_pcd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataEncoding {
    Ascii,
    Binary,
}

#[derive(Debug, Clone)]
struct PcdField {
    name: String,
    scalar: ScalarType,
    count: usize,
    // Position of the first element, in bytes (binary) and in columns (ascii).
    byte_offset: usize,
    column: usize,
}

#[derive(Debug)]
struct PcdHeader {
    fields: Vec<PcdField>,
    // Bytes per point in a binary body.
    record_size: usize,
    points: usize,
    encoding: DataEncoding,
}

impl PcdHeader {
    fn field(&self, name: &str) -> Option<&PcdField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn required(&self, name: &str) -> Result<&PcdField, ParseError> {
        self.field(name)
            .ok_or_else(|| ParseError::MissingField(name.to_string()))
    }
}

fn scalar_type(kind: &str, size: usize) -> Result<ScalarType, ParseError> {
    let scalar = match (kind, size) {
        ("I", 1) => ScalarType::I8,
        ("U", 1) => ScalarType::U8,
        ("I", 2) => ScalarType::I16,
        ("U", 2) => ScalarType::U16,
        ("I", 4) => ScalarType::I32,
        ("U", 4) => ScalarType::U32,
        ("I", 8) => ScalarType::I64,
        ("U", 8) => ScalarType::U64,
        ("F", 4) => ScalarType::F32,
        ("F", 8) => ScalarType::F64,
        _ => {
            return Err(ParseError::InvalidHeader(format!(
                "unsupported field type {}{}",
                kind, size
            )))
        }
    };
    Ok(scalar)
}

fn parse_usize(value: &str, key: &str) -> Result<usize, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::InvalidHeader(format!("invalid {} value '{}'", key, value)))
}

fn header_overflow(key: &str) -> ParseError {
    ParseError::InvalidHeader(format!("{} values exceed the addressable size", key))
}

fn parse_header(lines: &[String]) -> Result<PcdHeader, ParseError> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<String> = Vec::new();
    let mut counts: Option<Vec<usize>> = None;
    let mut width = None;
    let mut height = None;
    let mut points = None;
    let mut encoding = None;

    for line in lines {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            continue;
        };
        let values: Vec<&str> = tokens.collect();

        match key.to_ascii_uppercase().as_str() {
            "FIELDS" => names = values.iter().map(|v| v.to_string()).collect(),
            "SIZE" => {
                sizes = values
                    .iter()
                    .map(|v| parse_usize(v, "SIZE"))
                    .collect::<Result<_, _>>()?
            }
            "TYPE" => kinds = values.iter().map(|v| v.to_ascii_uppercase()).collect(),
            "COUNT" => {
                counts = Some(
                    values
                        .iter()
                        .map(|v| parse_usize(v, "COUNT"))
                        .collect::<Result<_, _>>()?,
                )
            }
            "WIDTH" => width = values.first().map(|v| parse_usize(v, "WIDTH")).transpose()?,
            "HEIGHT" => height = values.first().map(|v| parse_usize(v, "HEIGHT")).transpose()?,
            "POINTS" => points = values.first().map(|v| parse_usize(v, "POINTS")).transpose()?,
            "DATA" => {
                encoding = Some(match values.first().copied() {
                    Some("ascii") => DataEncoding::Ascii,
                    Some("binary") => DataEncoding::Binary,
                    Some(other) => return Err(ParseError::UnsupportedEncoding(other.to_string())),
                    None => return Err(ParseError::InvalidHeader("empty DATA line".to_string())),
                })
            }
            // VERSION and VIEWPOINT carry nothing the loader needs.
            _ => {}
        }
    }

    let counts = counts.unwrap_or_else(|| vec![1; names.len()]);
    if names.is_empty() || sizes.len() != names.len() || kinds.len() != names.len() {
        return Err(ParseError::InvalidHeader(
            "FIELDS, SIZE and TYPE must list the same number of entries".to_string(),
        ));
    }
    if counts.len() != names.len() {
        return Err(ParseError::InvalidHeader(
            "COUNT must list one entry per field".to_string(),
        ));
    }

    let mut fields = Vec::with_capacity(names.len());
    let mut byte_offset = 0usize;
    let mut column = 0usize;
    for (((name, size), kind), count) in names.into_iter().zip(sizes).zip(kinds).zip(counts) {
        let scalar = scalar_type(&kind, size)?;
        if count == 0 && ["x", "y", "z", "label"].contains(&name.as_str()) {
            return Err(ParseError::InvalidHeader(format!(
                "field '{}' has COUNT 0",
                name
            )));
        }
        let next_offset = size
            .checked_mul(count)
            .and_then(|bytes| byte_offset.checked_add(bytes))
            .ok_or_else(|| header_overflow("COUNT"))?;
        let next_column = column
            .checked_add(count)
            .ok_or_else(|| header_overflow("COUNT"))?;
        fields.push(PcdField {
            name,
            scalar,
            count,
            byte_offset,
            column,
        });
        byte_offset = next_offset;
        column = next_column;
    }

    let points = match (points, width, height) {
        (Some(points), _, _) => points,
        (None, Some(width), height) => width
            .checked_mul(height.unwrap_or(1))
            .ok_or_else(|| header_overflow("WIDTH and HEIGHT"))?,
        _ => return Err(ParseError::InvalidHeader("point count is missing".to_string())),
    };

    Ok(PcdHeader {
        fields,
        record_size: byte_offset,
        points,
        encoding: encoding
            .ok_or_else(|| ParseError::InvalidHeader("DATA line is missing".to_string()))?,
    })
}

/// Parses a PCD file held in memory. Points with non-finite coordinates are dropped.
pub fn parse_pcd(bytes: &[u8]) -> Result<LabeledCloud, ParseError> {
    let (lines, body_offset) =
        split_header(bytes, |line| line.to_ascii_uppercase().starts_with("DATA"))?;
    let header = parse_header(&lines)?;
    let body = &bytes[body_offset..];

    let points = match header.encoding {
        DataEncoding::Ascii => parse_ascii_body(&header, body)?,
        DataEncoding::Binary => parse_binary_body(&header, body)?,
    };

    Ok(LabeledCloud::new(points))
}

fn parse_ascii_body(header: &PcdHeader, body: &[u8]) -> Result<Vec<LabeledPoint>, ParseError> {
    let text = std::str::from_utf8(body).map_err(|_| ParseError::InvalidData {
        record: 0,
        message: "ascii body is not valid UTF-8".to_string(),
    })?;
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(header.points)
        .collect();
    if lines.len() < header.points {
        return Err(ParseError::InvalidData {
            record: lines.len(),
            message: format!("expected {} points, found {}", header.points, lines.len()),
        });
    }

    let columns = [
        header.required("x")?.column,
        header.required("y")?.column,
        header.required("z")?.column,
    ];
    let label_column = header.field("label").map(|f| f.column);

    let parsed: Vec<Option<LabeledPoint>> = lines
        .into_par_iter()
        .enumerate()
        .map(|(record, line)| -> Result<Option<LabeledPoint>, ParseError> {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let value = |column: usize| -> Result<f64, ParseError> {
                let token = tokens.get(column).ok_or_else(|| ParseError::InvalidData {
                    record,
                    message: format!("missing column {}", column),
                })?;
                parse_ascii_value(token, record)
            };

            let point = LabeledPoint {
                x: value(columns[0])?,
                y: value(columns[1])?,
                z: value(columns[2])?,
                label: label_column.map(&value).transpose()?.unwrap_or(0.0) as u32,
            };
            Ok(point.is_finite().then_some(point))
        })
        .collect::<Result<_, _>>()?;

    Ok(parsed.into_iter().flatten().collect())
}

fn parse_binary_body(header: &PcdHeader, body: &[u8]) -> Result<Vec<LabeledPoint>, ParseError> {
    let record_size = header.record_size;
    let expected = record_size
        .checked_mul(header.points)
        .ok_or_else(|| ParseError::InvalidData {
            record: 0,
            message: format!("{} points exceed the addressable size", header.points),
        })?;
    if body.len() < expected {
        return Err(ParseError::InvalidData {
            record: body.len() / record_size.max(1),
            message: format!("expected {} bytes of point data, found {}", expected, body.len()),
        });
    }

    let x = header.required("x")?.clone();
    let y = header.required("y")?.clone();
    let z = header.required("z")?.clone();
    let label = header.field("label").cloned();
    let read = |record: &[u8], field: &PcdField| field.scalar.read_le(&record[field.byte_offset..]);

    let points: Vec<Option<LabeledPoint>> = body[..expected]
        .par_chunks_exact(record_size)
        .map(|record| {
            let point = LabeledPoint {
                x: read(record, &x),
                y: read(record, &y),
                z: read(record, &z),
                label: label.as_ref().map(|f| read(record, f)).unwrap_or(0.0) as u32,
            };
            point.is_finite().then_some(point)
        })
        .collect();

    Ok(points.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const ASCII_PCD: &str = "\
# .PCD v0.7 - Point Cloud Data file format
VERSION 0.7
FIELDS x y z label
SIZE 4 4 4 4
TYPE F F F U
COUNT 1 1 1 1
WIDTH 3
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 3
DATA ascii
0.5 1 -2 4
nan nan nan 0
3 4 5 9
";

    #[test]
    fn ascii_with_labels() {
        let cloud = parse_pcd(ASCII_PCD.as_bytes()).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[0], LabeledPoint::with_label(0.5, 1.0, -2.0, 4));
        assert_eq!(cloud.points[1], LabeledPoint::with_label(3.0, 4.0, 5.0, 9));
    }

    #[test]
    fn binary_without_labels() {
        let mut bytes = b"VERSION 0.7\nFIELDS x y z rgb\nSIZE 4 4 8 4\nTYPE F F F F\n\
WIDTH 2\nHEIGHT 1\nDATA binary\n"
            .to_vec();
        for (x, y, z) in [(1.0f32, 2.0f32, 3.0f64), (-1.0, 0.25, 8.5)] {
            bytes.extend_from_slice(&x.to_le_bytes());
            bytes.extend_from_slice(&y.to_le_bytes());
            bytes.extend_from_slice(&z.to_le_bytes());
            bytes.extend_from_slice(&0f32.to_le_bytes());
        }

        let cloud = parse_pcd(&bytes).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[1], LabeledPoint::new(-1.0, 0.25, 8.5));
    }

    #[test]
    fn truncated_binary_body_is_an_error() {
        let bytes = b"FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 2\nDATA binary\n\0\0\0\0";
        assert!(matches!(
            parse_pcd(bytes),
            Err(ParseError::InvalidData { .. })
        ));
    }

    #[test]
    fn zero_count_coordinate_is_rejected() {
        let bytes = b"FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 0\nPOINTS 1\nDATA binary\n\
\0\0\0\0\0\0\0\0\0\0\0\0";
        assert!(matches!(parse_pcd(bytes), Err(ParseError::InvalidHeader(_))));
    }

    #[test]
    fn oversized_point_count_is_an_error() {
        let bytes =
            b"FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 18446744073709551615\nDATA binary\n";
        assert!(matches!(
            parse_pcd(bytes),
            Err(ParseError::InvalidData { .. })
        ));

        let bytes = b"FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 18446744073709551615\nHEIGHT 2\n\
DATA binary\n";
        assert!(matches!(parse_pcd(bytes), Err(ParseError::InvalidHeader(_))));
    }

    #[test]
    fn multi_count_field_before_coordinates_ascii() {
        let text = "\
FIELDS normal x y z label
SIZE 4 4 4 4 4
TYPE F F F F U
COUNT 3 1 1 1 1
POINTS 2
DATA ascii
0.1 0.2 0.3 1 2 3 7
0 0 1 -1 -2 -3 8
";
        let cloud = parse_pcd(text.as_bytes()).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[0], LabeledPoint::with_label(1.0, 2.0, 3.0, 7));
        assert_eq!(cloud.points[1], LabeledPoint::with_label(-1.0, -2.0, -3.0, 8));
    }

    #[test]
    fn multi_count_field_before_coordinates_binary() {
        let mut bytes = b"FIELDS fpfh x y z label\nSIZE 4 4 4 4 2\nTYPE F F F F U\n\
COUNT 2 1 1 1 1\nPOINTS 2\nDATA binary\n"
            .to_vec();
        for (x, y, z, label) in [(1.0f32, 2.0f32, 3.0f32, 4u16), (-0.5, 0.5, 9.0, 11)] {
            bytes.extend_from_slice(&100f32.to_le_bytes());
            bytes.extend_from_slice(&200f32.to_le_bytes());
            bytes.extend_from_slice(&x.to_le_bytes());
            bytes.extend_from_slice(&y.to_le_bytes());
            bytes.extend_from_slice(&z.to_le_bytes());
            bytes.extend_from_slice(&label.to_le_bytes());
        }

        let cloud = parse_pcd(&bytes).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[0], LabeledPoint::with_label(1.0, 2.0, 3.0, 4));
        assert_eq!(cloud.points[1], LabeledPoint::with_label(-0.5, 0.5, 9.0, 11));
    }

    #[test]
    fn compressed_data_is_unsupported() {
        let bytes = b"FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 1\nDATA binary_compressed\n";
        assert!(matches!(
            parse_pcd(bytes),
            Err(ParseError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn missing_z_field() {
        let bytes = b"FIELDS x y\nSIZE 4 4\nTYPE F F\nPOINTS 1\nDATA ascii\n1 2\n";
        assert!(matches!(parse_pcd(bytes), Err(ParseError::MissingField(f)) if f == "z"));
    }

    #[test]
    fn provider_concatenates_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut filenames = Vec::new();
        for name in ["a.pcd", "b.pcd"] {
            let path = dir.path().join(name);
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(ASCII_PCD.as_bytes()).unwrap();
            filenames.push(path);
        }

        let parser = PcdParserProvider { filenames }.get_parser();
        let cloud = parser.parse().unwrap();

        assert_eq!(cloud.len(), 4);
        assert_eq!(cloud.metadata.point_count, 4);
        assert_eq!(cloud.metadata.bounding_volume.max, [3.0, 4.0, 5.0]);
    }
}
