#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("look direction {look_direction:?} is parallel to the up axis or has no length")]
    DegenerateFrame { look_direction: [f64; 3] },
}
