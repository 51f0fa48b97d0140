// Stage two: the narrow grammar for one logical row's cells.

use anyhow::{Context, Result};
use regex::Regex;

use super::fragments::{LogicalRow, cell_texts};
use crate::error::PipelineError;
use crate::model::{RawComparisonRecord, Similarity};

const EXPECTED_CELLS: usize = 3;

#[derive(Debug)]
pub struct FieldGrammar {
    term: Regex,
    decimal: Regex,
    missing_marker: String,
}

impl FieldGrammar {
    pub fn new(missing_marker: &str) -> Result<Self> {
        Ok(Self {
            term: Regex::new(r"^[A-Za-z0-9][A-Za-z0-9'\-]*(?: [A-Za-z0-9][A-Za-z0-9'\-]*)?$")
                .context("failed to compile term regex")?,
            decimal: Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)$")
                .context("failed to compile similarity regex")?,
            missing_marker: missing_marker.trim().to_string(),
        })
    }

    /// Cells arrive as `[second term, first term, value]`; the record comes out in request order.
    pub fn extract(&self, row: &LogicalRow) -> Result<RawComparisonRecord, PipelineError> {
        let cells = cell_texts(&row.raw);
        if cells.len() != EXPECTED_CELLS {
            return Err(unparseable(
                row,
                format!("expected {EXPECTED_CELLS} cells, found {}", cells.len()),
            ));
        }

        for term in &cells[..2] {
            if !self.term.is_match(term) {
                return Err(unparseable(
                    row,
                    format!("'{term}' is not a one- or two-token term"),
                ));
            }
        }

        let similarity = self.coerce(&cells[2]).ok_or_else(|| {
            unparseable(
                row,
                format!(
                    "'{}' is neither a decimal nor the missing marker '{}'",
                    cells[2], self.missing_marker
                ),
            )
        })?;

        Ok(RawComparisonRecord {
            word_a: cells[1].clone(),
            word_b: cells[0].clone(),
            similarity,
        })
    }

    pub fn coerce(&self, value: &str) -> Option<Similarity> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(&self.missing_marker) {
            return Some(Similarity::Missing);
        }
        if !self.decimal.is_match(value) {
            return None;
        }
        value.parse::<f64>().ok().map(Similarity::Score)
    }
}

fn unparseable(row: &LogicalRow, reason: String) -> PipelineError {
    PipelineError::UnparseableRow {
        index: row.index,
        raw: row.raw.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> FieldGrammar {
        FieldGrammar::new("N/A").expect("grammar compiles")
    }

    fn row(raw: &str) -> LogicalRow {
        LogicalRow {
            index: 7,
            raw: raw.to_string(),
        }
    }

    #[test]
    fn missing_marker_never_becomes_zero() {
        let grammar = grammar();
        assert_eq!(grammar.coerce("N/A"), Some(Similarity::Missing));
        assert_eq!(grammar.coerce(" n/a "), Some(Similarity::Missing));
        assert_eq!(grammar.coerce("0.0"), Some(Similarity::Score(0.0)));
        assert_eq!(grammar.coerce("0"), Some(Similarity::Score(0.0)));
        assert_eq!(grammar.coerce(".75"), Some(Similarity::Score(0.75)));
        assert_eq!(grammar.coerce("-0.03"), Some(Similarity::Score(-0.03)));
    }

    #[test]
    fn coerce_rejects_non_decimal_text() {
        let grammar = grammar();
        assert_eq!(grammar.coerce(""), None);
        assert_eq!(grammar.coerce("NaN"), None);
        assert_eq!(grammar.coerce("1e-3"), None);
        assert_eq!(grammar.coerce("0.5x"), None);
    }

    #[test]
    fn extract_swaps_terms_back_to_request_order() {
        let record = grammar()
            .extract(&row(
                "<tr><td align=center>TV screen</td><td align=center>toast</td><td align=center>0.02</td></tr>",
            ))
            .expect("valid row");
        assert_eq!(record.word_a, "toast");
        assert_eq!(record.word_b, "TV screen");
        assert_eq!(record.similarity, Similarity::Score(0.02));
    }

    #[test]
    fn two_token_terms_stay_in_one_field() {
        let record = grammar()
            .extract(&row(
                "<td align=center>wall clock</td><td align=center>TV screen</td><td align=center>N/A</td>",
            ))
            .expect("valid row");
        assert_eq!(record.word_a, "TV screen");
        assert_eq!(record.word_b, "wall clock");
        assert!(record.similarity.is_missing());
    }

    #[test]
    fn three_token_term_is_unparseable_with_raw_text() {
        let raw = "<td align=center>big wall clock</td><td align=center>toast</td><td align=center>0.1</td>";
        let err = grammar().extract(&row(raw)).unwrap_err();
        match err {
            PipelineError::UnparseableRow { index, raw: reported, reason } => {
                assert_eq!(index, 7);
                assert_eq!(reported, raw);
                assert!(reason.contains("big wall clock"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wrong_cell_count_is_unparseable() {
        let err = grammar()
            .extract(&row("<td align=center>toast</td><td align=center>0.1</td>"))
            .unwrap_err();
        assert!(err.to_string().contains("expected 3 cells, found 2"));
    }

    #[test]
    fn garbage_value_is_unparseable() {
        let err = grammar()
            .extract(&row(
                "<td align=center>a</td><td align=center>b</td><td align=center>high</td>",
            ))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnparseableRow { .. }));
    }
}
