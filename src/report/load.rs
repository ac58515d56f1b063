use std::path::Path;

use anyhow::Result;
use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::PipelineError;
use crate::report::normalize::UNNAMED_PREFIX;
use crate::report::RawReport;

/// Leading rows of the export that precede the header row. The report
/// generator emits a fixed-height title banner, so this offset never moves.
const HEADER_OFFSET: usize = 11;

/// Parses the export at `path` into a [`RawReport`].
///
/// Reads the first worksheet, discards the title banner, takes the next row
/// as headers and everything after as data. Any open or format failure is a
/// [`PipelineError::Parse`]; the caller aborts the run on it.
pub fn load_report(path: &Path) -> Result<RawReport> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PipelineError::Parse(format!("{}: {e}", path.display())))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::Parse(format!("{}: workbook has no sheets", path.display())))?
        .map_err(|e| PipelineError::Parse(format!("{}: {e}", path.display())))?;

    let report = table_from_rows(range.rows())?;
    debug!(
        columns = report.headers.len(),
        rows = report.rows.len(),
        "parsed report"
    );
    Ok(report)
}

/// Builds a [`RawReport`] from raw sheet rows: skips the banner, names the
/// columns, and pads every data row to the header width.
fn table_from_rows<'a, I>(rows: I) -> Result<RawReport>
where
    I: Iterator<Item = &'a [Data]>,
{
    let mut rows = rows.skip(HEADER_OFFSET);
    let header_cells = rows
        .next()
        .ok_or_else(|| PipelineError::Parse("report ends before the header row".into()))?;

    let headers: Vec<String> = header_cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_to_string(cell);
            if name.is_empty() {
                format!("{UNNAMED_PREFIX}: {i}")
            } else {
                name
            }
        })
        .collect();

    let width = headers.len();
    let data = rows
        .map(|cells| {
            let mut row: Vec<String> = cells.iter().take(width).map(cell_to_string).collect();
            row.resize(width, String::new());
            row
        })
        .collect();

    Ok(RawReport {
        headers,
        rows: data,
    })
}

/// Renders a cell the way the dashboard expects: blanks become the empty
/// string, and whole-number floats lose the fractional part so product codes
/// survive the float round-trip intact.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}
