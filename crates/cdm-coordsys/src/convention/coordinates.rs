//! The plain `_Coordinate*` attribute convention.

use super::Convention;

/// Relies entirely on `_CoordinateAxisType` and the other `_Coordinate`
/// attributes; no axis-type heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatesConvention;

impl Convention for CoordinatesConvention {
    fn name(&self) -> &str {
        "_Coordinates"
    }
}
