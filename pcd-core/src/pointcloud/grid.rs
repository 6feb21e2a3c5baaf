use serde::{Deserialize, Serialize};

use crate::pointcloud::point::{LabeledCloud, LabeledPoint};

/// A single-layer elevation map.
///
/// Cell `(0, 0)` sits at the corner with the largest x and y; indices grow
/// towards negative x (rows) and negative y (columns). `elevation` is stored
/// row-major and holds NaN for unknown cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationGrid {
    pub resolution: f64,
    /// Map center in the map frame.
    pub position: [f64; 2],
    /// Number of cells as `[rows, cols]`.
    pub size: [usize; 2],
    pub elevation: Vec<f32>,
}

impl ElevationGrid {
    pub fn length(&self) -> [f64; 2] {
        [
            self.size[0] as f64 * self.resolution,
            self.size[1] as f64 * self.resolution,
        ]
    }

    pub fn cell_position(&self, row: usize, col: usize) -> [f64; 2] {
        let length = self.length();
        [
            self.position[0] + 0.5 * length[0] - (row as f64 + 0.5) * self.resolution,
            self.position[1] + 0.5 * length[1] - (col as f64 + 0.5) * self.resolution,
        ]
    }

    pub fn elevation_at(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.size[0] || col >= self.size[1] {
            return None;
        }
        self.elevation.get(row * self.size[1] + col).copied()
    }

    /// Converts every known cell into a point at the cell center.
    pub fn to_cloud(&self) -> LabeledCloud {
        let [rows, cols] = self.size;
        let mut points = Vec::with_capacity(rows * cols);

        for row in 0..rows {
            for col in 0..cols {
                let Some(z) = self.elevation_at(row, col).filter(|z| z.is_finite()) else {
                    continue;
                };
                let [x, y] = self.cell_position(row, col);
                points.push(LabeledPoint::new(x, y, z as f64));
            }
        }

        LabeledCloud::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> ElevationGrid {
        ElevationGrid {
            resolution: 0.5,
            position: [1.0, 2.0],
            size: [2, 3],
            elevation: vec![0.1, f32::NAN, 0.3, 0.4, 0.5, f32::INFINITY],
        }
    }

    #[test]
    fn first_cell_is_max_corner() {
        let grid = grid();
        assert_eq!(grid.length(), [1.0, 1.5]);
        assert_eq!(grid.cell_position(0, 0), [1.25, 2.5]);
        assert_eq!(grid.cell_position(1, 2), [0.75, 1.5]);
    }

    #[test]
    fn unknown_cells_are_skipped() {
        let cloud = grid().to_cloud();

        assert_eq!(cloud.len(), 4);
        let first = cloud.points[0];
        assert_eq!((first.x, first.y), (1.25, 2.5));
        assert!((first.z - 0.1).abs() < 1e-6);
        assert!(cloud.points.iter().all(|p| p.label == 0 && p.is_finite()));
    }

    #[test]
    fn short_elevation_buffer_does_not_panic() {
        let mut grid = grid();
        grid.elevation.truncate(2);
        assert_eq!(grid.to_cloud().len(), 1);
        assert_eq!(grid.elevation_at(5, 0), None);
    }
}
