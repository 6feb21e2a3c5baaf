use itertools::Itertools as _;
use pcd_core::geometry::vector::Vector3;
use plane_seg::Block;
use serde::{Deserialize, Serialize};

use crate::palette::{ColorPalette, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColoredPoint {
    pub position: Vector3,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Vector3,
    pub end: Vector3,
    pub color: Rgb,
}

/// Hull points and outline segments of one result, colored per block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualPrimitiveSet {
    pub points: Vec<ColoredPoint>,
    pub segments: Vec<LineSegment>,
}

/// Block `i` is drawn with `palette.color(i)`. Every hull of `n >= 2` points
/// becomes `n` segments: the consecutive edges, then one from the first
/// point to the last.
pub fn hulls_to_primitives(blocks: &[Block], palette: &ColorPalette) -> VisualPrimitiveSet {
    let mut primitives = VisualPrimitiveSet::default();

    for (i, block) in blocks.iter().enumerate() {
        let color = palette.color(i);
        let hull = &block.hull;

        primitives
            .points
            .extend(hull.iter().map(|&position| ColoredPoint { position, color }));

        if let [first, .., last] = hull.as_slice() {
            primitives.segments.extend(
                hull.iter()
                    .tuple_windows()
                    .map(|(&start, &end)| LineSegment { start, end, color }),
            );
            primitives.segments.push(LineSegment {
                start: *first,
                end: *last,
                color,
            });
        }
    }

    primitives
}
