use super::domain::{BoundingBox, Coordinate};

/// Half-width of the search window on each axis, in degrees.
///
/// Degrees are not distance-uniform: the window narrows in metres as latitude
/// grows. Callers wanting a fixed ground distance must scale the margin themselves.
pub const DEFAULT_MARGIN: f64 = 0.025;

pub fn build(coord: Coordinate) -> BoundingBox {
    build_with_margin(coord, DEFAULT_MARGIN)
}

pub fn build_with_margin(coord: Coordinate, margin: f64) -> BoundingBox {
    BoundingBox {
        west: coord.lng - margin,
        south: coord.lat - margin,
        east: coord.lng + margin,
        north: coord.lat + margin,
    }
}
