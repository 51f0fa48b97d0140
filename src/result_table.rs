use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PipelineError;
use crate::model::{MISSING_TEXT, MatchType, Similarity};
use crate::table::{Delim, render_rows};
use crate::util::read_text;

pub const TABLE_HEADER: [&str; 7] = [
    "list_id",
    "match_type",
    "word_pair",
    "similarity_source_1",
    "similarity_source_2",
    "label_source_1",
    "label_source_2",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceId {
    Source1,
    Source2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub list_id: String,
    pub match_type: MatchType,
    pub word_pair: String,
    pub similarity_source_1: Similarity,
    pub similarity_source_2: Similarity,
    pub label_source_1: Option<String>,
    pub label_source_2: Option<String>,
}

impl ResultRow {
    pub fn similarity(&self, source: SourceId) -> Similarity {
        match source {
            SourceId::Source1 => self.similarity_source_1,
            SourceId::Source2 => self.similarity_source_2,
        }
    }

    fn label_mut(&mut self, source: SourceId) -> &mut Option<String> {
        match source {
            SourceId::Source1 => &mut self.label_source_1,
            SourceId::Source2 => &mut self.label_source_2,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Threshold {
    pub low: f64,
    pub high: f64,
}

impl Threshold {
    pub fn is_extreme(&self, value: f64) -> bool {
        value <= self.low || value > self.high
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Threshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Threshold>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub source_1: SourceThresholds,
    #[serde(default)]
    pub source_2: SourceThresholds,
}

impl ThresholdConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_text(path)?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse thresholds {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("rejected thresholds {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        for source in [SourceId::Source1, SourceId::Source2] {
            for match_type in [MatchType::Shape, MatchType::Category] {
                let Some(threshold) = self.get(source, match_type) else {
                    continue;
                };
                if !threshold.low.is_finite() || !threshold.high.is_finite() {
                    return Err(PipelineError::InvalidThresholds {
                        detail: format!("{source:?}/{match_type}: bounds must be finite"),
                    });
                }
                if threshold.low > threshold.high {
                    return Err(PipelineError::InvalidThresholds {
                        detail: format!(
                            "{source:?}/{match_type}: low {} exceeds high {}",
                            threshold.low, threshold.high
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, source: SourceId, match_type: MatchType) -> Option<Threshold> {
        let per_source = match source {
            SourceId::Source1 => &self.source_1,
            SourceId::Source2 => &self.source_2,
        };
        match match_type {
            MatchType::Shape => per_source.shape,
            MatchType::Category => per_source.category,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub source_1: usize,
    pub source_2: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn missing_count(&self, source: SourceId) -> usize {
        self.rows
            .iter()
            .filter(|row| row.similarity(source).is_missing())
            .count()
    }

    /// Labels every row whose score is at or below `low` or above `high` for its
    /// (source, match type). Previous labels are discarded, so repeated calls agree.
    pub fn derive_extremity_labels(&mut self, thresholds: &ThresholdConfig) -> LabelCounts {
        let mut counts = LabelCounts::default();

        for row in &mut self.rows {
            for source in [SourceId::Source1, SourceId::Source2] {
                let label = match (
                    thresholds.get(source, row.match_type),
                    row.similarity(source).as_option(),
                ) {
                    (Some(threshold), Some(value)) if threshold.is_extreme(value) => {
                        Some(row.word_pair.clone())
                    }
                    _ => None,
                };

                if label.is_some() {
                    match source {
                        SourceId::Source1 => counts.source_1 += 1,
                        SourceId::Source2 => counts.source_2 += 1,
                    }
                }
                *row.label_mut(source) = label;
            }
        }

        info!(
            source_1 = counts.source_1,
            source_2 = counts.source_2,
            "derived extremity labels"
        );
        counts
    }

    pub fn to_delimited(&self, delim: Delim) -> Result<String> {
        let rows = self.rows.iter().map(|row| {
            [
                row.list_id.clone(),
                row.match_type.to_string(),
                row.word_pair.clone(),
                row.similarity_source_1.to_string(),
                row.similarity_source_2.to_string(),
                row.label_source_1
                    .clone()
                    .unwrap_or_else(|| MISSING_TEXT.to_string()),
                row.label_source_2
                    .clone()
                    .unwrap_or_else(|| MISSING_TEXT.to_string()),
            ]
        });
        render_rows(&TABLE_HEADER, rows, delim)
    }
}
