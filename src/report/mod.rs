pub mod load;
pub mod normalize;

pub use load::load_report;
pub use normalize::{normalize, NormalizedReport, CANONICAL_COLUMNS};

/// Contents of the export as parsed, before any reshaping.
///
/// Column names are whatever the file claims after the fixed header offset;
/// headerless columns carry a generated placeholder name. Every row has
/// exactly `headers.len()` cells, with the empty string standing in for
/// blank cells.
#[derive(Debug, Default)]
pub struct RawReport {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
