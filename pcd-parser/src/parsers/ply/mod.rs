use std::path::PathBuf;

use pcd_core::pointcloud::point::{LabeledCloud, LabeledPoint};
use rayon::{
    iter::{IndexedParallelIterator as _, IntoParallelIterator as _, ParallelIterator as _},
    slice::ParallelSlice as _,
};

use super::{parse_ascii_value, parse_files, split_header, Parser, ParserProvider, ScalarType};
use crate::ParseError;

pub struct PlyParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for PlyParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(PlyParser {
            filenames: self.filenames.clone(),
        })
    }
}

pub struct PlyParser {
    pub filenames: Vec<PathBuf>,
}

impl Parser for PlyParser {
    fn parse(&self) -> Result<LabeledCloud, ParseError> {
        parse_files(&self.filenames, parse_ply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, scalar: ScalarType },
    List { name: String },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name } => name,
        }
    }
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl Element {
    /// Byte size of one record, `None` if any property is a list.
    fn stride(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| match p {
                Property::Scalar { scalar, .. } => Some(scalar.size()),
                Property::List { .. } => None,
            })
            .sum()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }
}

fn scalar_type(name: &str) -> Result<ScalarType, ParseError> {
    let scalar = match name {
        "char" | "int8" => ScalarType::I8,
        "uchar" | "uint8" => ScalarType::U8,
        "short" | "int16" => ScalarType::I16,
        "ushort" | "uint16" => ScalarType::U16,
        "int" | "int32" => ScalarType::I32,
        "uint" | "uint32" => ScalarType::U32,
        "float" | "float32" => ScalarType::F32,
        "double" | "float64" => ScalarType::F64,
        other => {
            return Err(ParseError::InvalidHeader(format!(
                "unknown property type '{}'",
                other
            )))
        }
    };
    Ok(scalar)
}

fn parse_header(lines: &[String]) -> Result<(Format, Vec<Element>), ParseError> {
    if lines.first().map(String::as_str) != Some("ply") {
        return Err(ParseError::InvalidHeader("missing 'ply' magic".to_string()));
    }

    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();

    for line in &lines[1..] {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["format", "ascii", ..] => format = Some(Format::Ascii),
            ["format", "binary_little_endian", ..] => format = Some(Format::BinaryLittleEndian),
            ["format", other, ..] => return Err(ParseError::UnsupportedEncoding(other.to_string())),
            ["element", name, count] => elements.push(Element {
                name: name.to_string(),
                count: count.parse().map_err(|_| {
                    ParseError::InvalidHeader(format!("invalid element count '{}'", count))
                })?,
                properties: Vec::new(),
            }),
            ["property", "list", _, _, name] => {
                let element = elements.last_mut().ok_or_else(|| {
                    ParseError::InvalidHeader("property before element".to_string())
                })?;
                element.properties.push(Property::List {
                    name: name.to_string(),
                });
            }
            ["property", kind, name] => {
                let scalar = scalar_type(kind)?;
                let element = elements.last_mut().ok_or_else(|| {
                    ParseError::InvalidHeader("property before element".to_string())
                })?;
                element.properties.push(Property::Scalar {
                    name: name.to_string(),
                    scalar,
                });
            }
            ["comment", ..] | ["obj_info", ..] | ["end_header"] | [] => {}
            _ => {
                return Err(ParseError::InvalidHeader(format!(
                    "unexpected header line '{}'",
                    line
                )))
            }
        }
    }

    let format =
        format.ok_or_else(|| ParseError::InvalidHeader("format line is missing".to_string()))?;
    Ok((format, elements))
}

struct VertexLayout {
    // Property indices of x, y, z and the optional label.
    xyz: [usize; 3],
    label: Option<usize>,
}

impl VertexLayout {
    fn new(vertex: &Element) -> Result<Self, ParseError> {
        if vertex.stride().is_none() {
            return Err(ParseError::UnsupportedEncoding(
                "list properties on vertex element".to_string(),
            ));
        }
        let required = |name: &str| {
            vertex
                .position(name)
                .ok_or_else(|| ParseError::MissingField(name.to_string()))
        };
        Ok(Self {
            xyz: [required("x")?, required("y")?, required("z")?],
            label: vertex.position("label"),
        })
    }
}

/// Parses the vertex element of a PLY file held in memory.
/// Points with non-finite coordinates are dropped.
pub fn parse_ply(bytes: &[u8]) -> Result<LabeledCloud, ParseError> {
    let (lines, body_offset) = split_header(bytes, |line| line == "end_header")?;
    let (format, elements) = parse_header(&lines)?;

    let vertex_index = elements
        .iter()
        .position(|e| e.name == "vertex")
        .ok_or_else(|| ParseError::MissingField("vertex".to_string()))?;
    let vertex = &elements[vertex_index];
    let layout = VertexLayout::new(vertex)?;
    let preceding = &elements[..vertex_index];
    let body = &bytes[body_offset..];

    let points = match format {
        Format::Ascii => parse_ascii_vertices(body, preceding, vertex, &layout)?,
        Format::BinaryLittleEndian => parse_binary_vertices(body, preceding, vertex, &layout)?,
    };

    Ok(LabeledCloud::new(points))
}

fn body_overflow() -> ParseError {
    ParseError::InvalidData {
        record: 0,
        message: "element counts exceed the addressable size".to_string(),
    }
}

fn parse_ascii_vertices(
    body: &[u8],
    preceding: &[Element],
    vertex: &Element,
    layout: &VertexLayout,
) -> Result<Vec<LabeledPoint>, ParseError> {
    let text = std::str::from_utf8(body).map_err(|_| ParseError::InvalidData {
        record: 0,
        message: "ascii body is not valid UTF-8".to_string(),
    })?;
    let skip = preceding
        .iter()
        .try_fold(0usize, |total, e| total.checked_add(e.count))
        .ok_or_else(body_overflow)?;
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .skip(skip)
        .take(vertex.count)
        .collect();
    if lines.len() < vertex.count {
        return Err(ParseError::InvalidData {
            record: lines.len(),
            message: format!("expected {} vertices, found {}", vertex.count, lines.len()),
        });
    }

    let parsed: Vec<Option<LabeledPoint>> = lines
        .into_par_iter()
        .enumerate()
        .map(|(record, line)| -> Result<Option<LabeledPoint>, ParseError> {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let value = |index: usize| -> Result<f64, ParseError> {
                let token = tokens.get(index).ok_or_else(|| ParseError::InvalidData {
                    record,
                    message: format!("missing property {}", index),
                })?;
                parse_ascii_value(token, record)
            };

            let point = LabeledPoint {
                x: value(layout.xyz[0])?,
                y: value(layout.xyz[1])?,
                z: value(layout.xyz[2])?,
                label: layout.label.map(&value).transpose()?.unwrap_or(0.0) as u32,
            };
            Ok(point.is_finite().then_some(point))
        })
        .collect::<Result<_, _>>()?;

    Ok(parsed.into_iter().flatten().collect())
}

fn parse_binary_vertices(
    body: &[u8],
    preceding: &[Element],
    vertex: &Element,
    layout: &VertexLayout,
) -> Result<Vec<LabeledPoint>, ParseError> {
    let mut start = 0usize;
    for element in preceding {
        let stride = element.stride().ok_or_else(|| {
            ParseError::UnsupportedEncoding(format!(
                "list properties on element '{}' before vertex",
                element.name
            ))
        })?;
        start = stride
            .checked_mul(element.count)
            .and_then(|size| start.checked_add(size))
            .ok_or_else(body_overflow)?;
    }

    let stride = vertex.stride().unwrap_or_default();
    let end = stride
        .checked_mul(vertex.count)
        .and_then(|size| start.checked_add(size))
        .ok_or_else(body_overflow)?;
    if body.len() < end || stride == 0 {
        return Err(ParseError::InvalidData {
            record: body.len().saturating_sub(start) / stride.max(1),
            message: format!("expected {} vertices", vertex.count),
        });
    }

    let mut offsets = Vec::with_capacity(vertex.properties.len());
    let mut offset = 0;
    for property in &vertex.properties {
        offsets.push(offset);
        if let Property::Scalar { scalar, .. } = property {
            offset += scalar.size();
        }
    }
    let read = |record: &[u8], index: usize| match &vertex.properties[index] {
        Property::Scalar { scalar, .. } => scalar.read_le(&record[offsets[index]..]),
        Property::List { .. } => f64::NAN,
    };

    let points: Vec<Option<LabeledPoint>> = body[start..end]
        .par_chunks_exact(stride)
        .map(|record| {
            let point = LabeledPoint {
                x: read(record, layout.xyz[0]),
                y: read(record, layout.xyz[1]),
                z: read(record, layout.xyz[2]),
                label: layout.label.map(|i| read(record, i)).unwrap_or(0.0) as u32,
            };
            point.is_finite().then_some(point)
        })
        .collect();

    Ok(points.into_iter().flatten().collect())
}
