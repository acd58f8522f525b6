use serde::{Deserialize, Serialize};

/// Decides which pixels belong to a cell polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RasterizationMode {
    /// a pixel belongs to the cell if its center lies inside the polygon
    Exact,
    /// a pixel belongs to the cell if its footprint touches the polygon
    AllTouched,
}

/// Cells finer than the source's reference resolution would often contain no pixel
/// center at all, so they take every pixel they touch. Neighbouring cells may then
/// share pixels.
///
/// # Examples
///
/// ```
/// use hexstats_operators::processing::{RasterizationMode, resolve_mode};
///
/// assert_eq!(resolve_mode(12, 11), RasterizationMode::AllTouched);
/// assert_eq!(resolve_mode(11, 11), RasterizationMode::Exact);
/// ```
///
pub fn resolve_mode(cell_resolution: u8, reference_resolution: u8) -> RasterizationMode {
    if cell_resolution > reference_resolution {
        RasterizationMode::AllTouched
    } else {
        RasterizationMode::Exact
    }
}
