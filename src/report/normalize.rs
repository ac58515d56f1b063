use anyhow::Result;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::report::RawReport;

/// First cell of a branch banner row; the third cell carries the branch name
/// that applies to every data row until the next banner.
pub const BRANCH_MARKER: &str = "Filial:";

/// Prefix given to columns that have no header in the export.
pub const UNNAMED_PREFIX: &str = "Unnamed";

/// The eleven columns the dashboard consumes, in publishing order. The odd
/// spacing and embedded newlines are exactly what the export writes, so they
/// are matched verbatim.
pub const CANONICAL_COLUMNS: [&str; 11] = [
    "Código",
    "Filial",
    " Descrição Produto",
    "Laboratório",
    "Grupo",
    "Curva/Padrão",
    "Estoq.\nMín.",
    "Qtd.\nDem.",
    "Est.\nCrit.",
    "Acima\nDem/Crit",
    "Qtd.\nEstoq.",
];

/// Product-code label as the export spells it, trailing space included.
const RAW_CODE_LABEL: &str = "Cód. ";
const CODE_LABEL: &str = "Código";
const BRANCH_LABEL: &str = "Filial";

/// Leading index column dropped before any other step.
const LEADING_DROP: usize = 1;
/// Trailing summary columns dropped before any other step.
const TRAILING_DROP: usize = 5;

/// The reshaped table, ready for publishing: canonical columns only, one row
/// per product-branch pair, no branch banner rows.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReport {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl NormalizedReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-oriented form for the bulk sheet write: header row first, then the
    /// data rows in order. Missing values are already the empty string, which
    /// is the only "null" the sheet format has.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(self.columns.clone());
        out.extend(self.rows.iter().cloned());
        out
    }
}

/// Reshapes a [`RawReport`] into the canonical dashboard table.
///
/// The export groups products under repeating "Filial:" banner rows instead
/// of carrying a per-row branch column; the core of this pass folds that
/// banner structure into a flat `Filial` attribute on every data row. The
/// remaining steps trim bookkeeping columns and project onto
/// [`CANONICAL_COLUMNS`], failing with [`PipelineError::SchemaMismatch`] if
/// the export layout drifted.
pub fn normalize(raw: RawReport) -> Result<NormalizedReport> {
    // Trim the index column and the trailing summary block.
    let mut headers = trim_edges(raw.headers);
    let rows: Vec<Vec<String>> = raw.rows.into_iter().map(trim_edges).collect();

    let banner_count = rows
        .iter()
        .filter(|r| r.first().map(String::as_str) == Some(BRANCH_MARKER))
        .count();
    if banner_count == 0 {
        warn!("report contains no branch banner rows; Filial will be blank");
    }

    // Pair each data row with the branch in effect where it appears. Banner
    // rows are consumed here and never reach the output, so the association
    // count equals the retained-row count by construction.
    let tagged = tag_branches(rows);
    debug!(
        banners = banner_count,
        records = tagged.len(),
        "associated branches"
    );

    let width = headers.len();
    headers.push(BRANCH_LABEL.to_string());
    let mut rows: Vec<Vec<String>> = tagged
        .into_iter()
        .map(|(mut row, branch)| {
            row.resize(width, String::new());
            row.push(branch.unwrap_or_default());
            row
        })
        .collect();

    // Records without a product code are subtotal/blank filler lines.
    if let Some(code_idx) = headers.iter().position(|h| h == RAW_CODE_LABEL) {
        rows.retain(|r| !r[code_idx].trim().is_empty());
    }

    // Drop headerless placeholder columns.
    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.starts_with(UNNAMED_PREFIX))
        .map(|(i, _)| i)
        .collect();
    let mut headers: Vec<String> = keep.iter().map(|&i| headers[i].clone()).collect();
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
        .collect();

    for h in &mut headers {
        if *h == RAW_CODE_LABEL {
            *h = CODE_LABEL.to_string();
        }
    }

    project(headers, rows)
}

/// Drops the leading index column and the trailing summary columns from one
/// row of cells. Rows too short to carry data come back empty.
fn trim_edges(mut cells: Vec<String>) -> Vec<String> {
    if cells.len() <= LEADING_DROP + TRAILING_DROP {
        cells.clear();
        return cells;
    }
    cells.truncate(cells.len() - TRAILING_DROP);
    cells.drain(..LEADING_DROP);
    cells
}

/// Explicit fold over the rows: banner rows update the branch carried
/// forward, data rows are emitted paired with it. Rows seen before any
/// banner get `None`.
fn tag_branches(rows: Vec<Vec<String>>) -> Vec<(Vec<String>, Option<String>)> {
    rows.into_iter()
        .fold(
            (Vec::new(), None::<String>),
            |(mut out, branch), row| {
                if row.first().map(String::as_str) == Some(BRANCH_MARKER) {
                    let next = row
                        .get(2)
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty());
                    (out, next)
                } else {
                    out.push((row, branch.clone()));
                    (out, branch)
                }
            },
        )
        .0
}

/// Projects onto [`CANONICAL_COLUMNS`] in order, preserving row order. Any
/// absent column is an unrecoverable layout mismatch for this run.
fn project(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<NormalizedReport> {
    let mut indices = Vec::with_capacity(CANONICAL_COLUMNS.len());
    for name in CANONICAL_COLUMNS {
        let idx = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::SchemaMismatch(name.to_string()))?;
        indices.push(idx);
    }

    let rows = rows
        .into_iter()
        .map(|r| {
            indices
                .iter()
                .map(|&i| r.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(NormalizedReport {
        columns: CANONICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raw header layout of the export: index column, the ten meaningful
    /// columns, one headerless column, five trailing summary columns.
    fn raw_headers() -> Vec<String> {
        [
            "Item",
            "Cód. ",
            " Descrição Produto",
            "Laboratório",
            "Grupo",
            "Curva/Padrão",
            "Estoq.\nMín.",
            "Qtd.\nDem.",
            "Est.\nCrit.",
            "Acima\nDem/Crit",
            "Qtd.\nEstoq.",
            "Unnamed: 11",
            "Sum1",
            "Sum2",
            "Sum3",
            "Sum4",
            "Sum5",
        ]
        .map(String::from)
        .to_vec()
    }

    fn data_row(code: &str, desc: &str) -> Vec<String> {
        let mut row = vec![
            "1".to_string(),
            code.to_string(),
            desc.to_string(),
            "LabX".to_string(),
            "GrpY".to_string(),
            "A".to_string(),
            "5".to_string(),
            "10".to_string(),
            "2".to_string(),
            "0".to_string(),
            "7".to_string(),
        ];
        row.resize(17, String::new());
        row
    }

    /// Banner rows carry the marker in the first kept column and the branch
    /// name two cells to its right.
    fn banner_row(branch: &str) -> Vec<String> {
        let mut row = vec![String::new(); 17];
        row[1] = BRANCH_MARKER.to_string();
        row[3] = branch.to_string();
        row
    }

    #[test]
    fn branches_are_folded_onto_data_rows() {
        let raw = RawReport {
            headers: raw_headers(),
            rows: vec![
                banner_row("Branch A"),
                data_row("101", "Widget"),
                banner_row("Branch B"),
                data_row("102", "Gadget"),
            ],
        };
        let report = normalize(raw).unwrap();
        assert_eq!(report.columns, CANONICAL_COLUMNS.map(String::from).to_vec());
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0][0], "101");
        assert_eq!(report.rows[0][1], "Branch A");
        assert_eq!(report.rows[0][2], "Widget");
        assert_eq!(report.rows[1][0], "102");
        assert_eq!(report.rows[1][1], "Branch B");
    }

    #[test]
    fn every_data_row_gets_an_association() {
        let raw = RawReport {
            headers: raw_headers(),
            rows: vec![
                banner_row("Matriz"),
                data_row("1", "a"),
                data_row("2", "b"),
                banner_row("Norte"),
                banner_row("Sul"),
                data_row("3", "c"),
            ],
        };
        let report = normalize(raw).unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0][1], "Matriz");
        assert_eq!(report.rows[1][1], "Matriz");
        assert_eq!(report.rows[2][1], "Sul");
    }

    #[test]
    fn rows_before_any_banner_have_blank_branch() {
        let raw = RawReport {
            headers: raw_headers(),
            rows: vec![data_row("101", "Widget"), data_row("102", "Gadget")],
        };
        let report = normalize(raw).unwrap();
        assert!(report.rows.iter().all(|r| r[1].is_empty()));
    }

    #[test]
    fn rows_without_a_code_are_dropped() {
        let raw = RawReport {
            headers: raw_headers(),
            rows: vec![
                banner_row("Matriz"),
                data_row("101", "Widget"),
                data_row("", "subtotal line"),
                data_row("  ", "blank-ish"),
            ],
        };
        let report = normalize(raw).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0][0], "101");
    }

    #[test]
    fn placeholder_columns_never_reach_the_output() {
        let raw = RawReport {
            headers: raw_headers(),
            rows: vec![banner_row("Matriz"), data_row("101", "Widget")],
        };
        let report = normalize(raw).unwrap();
        assert!(report
            .columns
            .iter()
            .all(|c| !c.starts_with(UNNAMED_PREFIX)));
    }

    #[test]
    fn missing_canonical_column_is_a_schema_mismatch() {
        let mut headers = raw_headers();
        headers[3] = "Fabricante".to_string(); // was Laboratório
        let raw = RawReport {
            headers,
            rows: vec![banner_row("Matriz"), data_row("101", "Widget")],
        };
        let err = normalize(raw).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::SchemaMismatch(col)) => assert_eq!(col, "Laboratório"),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_report_normalizes_to_zero_rows() {
        let raw = RawReport {
            headers: raw_headers(),
            rows: vec![],
        };
        let report = normalize(raw).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn to_rows_puts_headers_first_in_canonical_order() {
        let raw = RawReport {
            headers: raw_headers(),
            rows: vec![banner_row("Matriz"), data_row("101", "Widget")],
        };
        let report = normalize(raw).unwrap();
        let rows = report.to_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], CANONICAL_COLUMNS.map(String::from).to_vec());
        assert_eq!(rows[1][0], "101");
    }
}
