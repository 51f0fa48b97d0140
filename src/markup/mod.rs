use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::model::RawComparisonRecord;

mod fields;
mod fragments;

use fields::FieldGrammar;
use fragments::{filter_data_rows, pair_rows};

// Layout of the pairwise-comparison result page as rendered by the scoring tool
// at the time the stimuli were scored. Every comparison is two lines, both
// carrying the centred data-cell tag: the first holds the two compared terms
// (second requested term first), the second holds the cosine or "N/A".
pub const DEFAULT_PROFILE_ID: &str = "pairwise-table-v1";
pub const DEFAULT_ROW_MARKER: &str = "<td align=center>";
pub const DEFAULT_MISSING_MARKER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupProfile {
    pub profile_id: String,
    pub row_marker: String,
    pub missing_marker: String,
}

impl Default for MarkupProfile {
    fn default() -> Self {
        Self {
            profile_id: DEFAULT_PROFILE_ID.to_string(),
            row_marker: DEFAULT_ROW_MARKER.to_string(),
            missing_marker: DEFAULT_MISSING_MARKER.to_string(),
        }
    }
}

impl MarkupProfile {
    pub fn with_overrides(row_marker: Option<String>, missing_marker: Option<String>) -> Self {
        let mut profile = Self::default();
        let customized = row_marker.is_some() || missing_marker.is_some();
        if let Some(marker) = row_marker {
            profile.row_marker = marker;
        }
        if let Some(marker) = missing_marker {
            profile.missing_marker = marker;
        }
        if customized {
            profile.profile_id = format!("{DEFAULT_PROFILE_ID}+custom");
        }
        profile
    }
}

#[derive(Debug, Clone)]
pub struct ParsedMarkup {
    pub records: Vec<RawComparisonRecord>,
    pub data_row_count: usize,
    pub missing_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct MarkupTableParser {
    profile: MarkupProfile,
    grammar: FieldGrammar,
}

impl MarkupTableParser {
    pub fn new(profile: MarkupProfile) -> Result<Self> {
        let grammar = FieldGrammar::new(&profile.missing_marker)?;
        Ok(Self { profile, grammar })
    }

    pub fn profile(&self) -> &MarkupProfile {
        &self.profile
    }

    /// Records come out in the order the markup lists them, which is request order.
    pub fn parse(&self, markup: &str) -> Result<ParsedMarkup, PipelineError> {
        let rows = filter_data_rows(markup, &self.profile.row_marker);
        debug!(
            rows = rows.len(),
            marker = %self.profile.row_marker,
            "filtered markup data rows"
        );

        let logical_rows = pair_rows(&rows)?;
        let records = logical_rows
            .iter()
            .map(|row| self.grammar.extract(row))
            .collect::<Result<Vec<RawComparisonRecord>, PipelineError>>()?;

        let mut warnings = Vec::new();
        for record in &records {
            if let Some(value) = record.similarity.as_option()
                && !(0.0..=1.0).contains(&value)
            {
                let message = format!(
                    "similarity {value} for '{}' / '{}' lies outside [0, 1]",
                    record.word_a, record.word_b
                );
                warn!(word_a = %record.word_a, word_b = %record.word_b, value, "similarity outside [0, 1]");
                warnings.push(message);
            }
        }

        let missing_count = records
            .iter()
            .filter(|record| record.similarity.is_missing())
            .count();

        info!(
            profile = %self.profile.profile_id,
            data_rows = rows.len(),
            records = records.len(),
            missing = missing_count,
            "parsed scoring-tool markup"
        );

        Ok(ParsedMarkup {
            records,
            data_row_count: rows.len(),
            missing_count,
            warnings,
        })
    }
}
