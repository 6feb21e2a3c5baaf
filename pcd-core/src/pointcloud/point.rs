use serde::{Deserialize, Serialize};

/// A point as produced by the segmentation front-end: position plus an integer label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub label: u32,
}

impl LabeledPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, label: 0 }
    }

    pub fn with_label(x: f64, y: f64, z: f64, label: u32) -> Self {
        Self { x, y, z, label }
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledCloud {
    pub points: Vec<LabeledPoint>,
    pub metadata: Metadata,
}

impl LabeledCloud {
    pub fn new(points: Vec<LabeledPoint>) -> Self {
        let mut bounding_volume = BoundingVolume {
            min: [f64::MAX, f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN, f64::MIN],
        };

        for point in points.iter().filter(|p| p.is_finite()) {
            bounding_volume.max[0] = bounding_volume.max[0].max(point.x);
            bounding_volume.max[1] = bounding_volume.max[1].max(point.y);
            bounding_volume.max[2] = bounding_volume.max[2].max(point.z);
            bounding_volume.min[0] = bounding_volume.min[0].min(point.x);
            bounding_volume.min[1] = bounding_volume.min[1].min(point.y);
            bounding_volume.min[2] = bounding_volume.min[2].min(point.z);
        }

        let metadata = Metadata {
            point_count: points.len(),
            bounding_volume,
        };

        LabeledCloud { points, metadata }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64, &LabeledPoint)> {
        self.points
            .iter()
            .map(|point| (point.x, point.y, point.z, point))
    }

    /// Index of the first point with a non-finite coordinate, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.points.iter().position(|p| !p.is_finite())
    }

    /// Appends another cloud, keeping the metadata in sync.
    pub fn extend(&mut self, other: LabeledCloud) {
        let mut points = std::mem::take(&mut self.points);
        points.extend(other.points);
        *self = LabeledCloud::new(points);
    }
}

impl FromIterator<LabeledPoint> for LabeledCloud {
    fn from_iter<T: IntoIterator<Item = LabeledPoint>>(iter: T) -> Self {
        LabeledCloud::new(iter.into_iter().collect())
    }
}

// Only finite points contribute; an empty cloud keeps the inverted MAX/MIN bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingVolume {
    pub fn extent(&self) -> [f64; 3] {
        [
            (self.max[0] - self.min[0]).max(0.0),
            (self.max[1] - self.min[1]).max(0.0),
            (self.max[2] - self.min[2]).max(0.0),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub point_count: usize,
    pub bounding_volume: BoundingVolume,
}
