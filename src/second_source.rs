use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::error::PipelineError;
use crate::model::{MatchType, Similarity, SimilarityRecord};
use crate::table::{Delim, DelimitedTable};
use crate::util::read_text;

const CONDITION_COLUMNS: [&str; 3] = ["condition", "match_type", "type"];
const SIMILARITY_COLUMNS: [&str; 4] = ["similarity", "cosine", "score", "sim"];
const LIST_COLUMNS: [&str; 2] = ["List", "list_id"];
const MISSING_MARKERS: [&str; 4] = ["", "NA", "N/A", "NaN"];

enum PairLayout {
    Direct { word1: usize, word2: usize },
    Triad { w1: usize, w2: usize, w3: usize },
}

pub fn load(path: &Path) -> Result<Vec<SimilarityRecord>> {
    let text = read_text(path)?;
    let records = parse(&text, Delim::for_path(path)).with_context(|| {
        format!(
            "failed to load second similarity source from {}",
            path.display()
        )
    })?;

    info!(
        path = %path.display(),
        records = records.len(),
        missing = records.iter().filter(|record| record.similarity.is_missing()).count(),
        "loaded second similarity source"
    );

    Ok(records)
}

pub fn parse(text: &str, delim: Delim) -> Result<Vec<SimilarityRecord>, PipelineError> {
    let table = DelimitedTable::parse(text, delim)
        .map_err(|err| PipelineError::similarity_source(format!("unreadable table: {err}")))?;
    if table.headers.is_empty() {
        return Err(PipelineError::similarity_source("no header row"));
    }

    let condition = table.column(&CONDITION_COLUMNS).ok_or_else(|| {
        PipelineError::similarity_source(format!(
            "missing condition column (one of {})",
            CONDITION_COLUMNS.join(", ")
        ))
    })?;
    let similarity = table.column(&SIMILARITY_COLUMNS).ok_or_else(|| {
        PipelineError::similarity_source(format!(
            "missing similarity column (one of {})",
            SIMILARITY_COLUMNS.join(", ")
        ))
    })?;
    let list = table.column(&LIST_COLUMNS);
    let layout = detect_layout(&table)?;

    let mut records = Vec::with_capacity(table.rows.len());
    for (row_index, row) in table.rows.iter().enumerate() {
        let row_number = row_index + 1;
        let label = DelimitedTable::cell(row, condition);
        let match_type = MatchType::parse_label(label).ok_or_else(|| {
            PipelineError::similarity_source(format!(
                "data row {row_number}: unknown condition '{label}'"
            ))
        })?;

        let (word_a, word_b) = match layout {
            PairLayout::Direct { word1, word2 } => (
                DelimitedTable::cell(row, word1),
                DelimitedTable::cell(row, word2),
            ),
            PairLayout::Triad { w1, w2, w3 } => match match_type {
                MatchType::Shape => (DelimitedTable::cell(row, w1), DelimitedTable::cell(row, w2)),
                MatchType::Category => {
                    (DelimitedTable::cell(row, w2), DelimitedTable::cell(row, w3))
                }
            },
        };
        if word_a.is_empty() || word_b.is_empty() {
            return Err(PipelineError::similarity_source(format!(
                "data row {row_number}: {match_type} pair has an empty word"
            )));
        }

        let raw_value = DelimitedTable::cell(row, similarity);
        let similarity = parse_similarity(raw_value).ok_or_else(|| {
            PipelineError::similarity_source(format!(
                "data row {row_number}: similarity '{raw_value}' is not a number"
            ))
        })?;

        records.push(SimilarityRecord {
            list_id: list
                .map(|index| DelimitedTable::cell(row, index))
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            match_type,
            word_a: word_a.to_string(),
            word_b: word_b.to_string(),
            similarity,
        });
    }

    Ok(records)
}

fn detect_layout(table: &DelimitedTable) -> Result<PairLayout, PipelineError> {
    if let (Some(word1), Some(word2)) = (table.column(&["word1"]), table.column(&["word2"])) {
        return Ok(PairLayout::Direct { word1, word2 });
    }
    if let (Some(w1), Some(w2), Some(w3)) = (
        table.column(&["w1"]),
        table.column(&["w2"]),
        table.column(&["w3"]),
    ) {
        return Ok(PairLayout::Triad { w1, w2, w3 });
    }
    Err(PipelineError::similarity_source(
        "missing word columns (need word1/word2 or w1/w2/w3)",
    ))
}

fn parse_similarity(raw: &str) -> Option<Similarity> {
    if MISSING_MARKERS
        .iter()
        .any(|marker| raw.eq_ignore_ascii_case(marker))
    {
        return Some(Similarity::Missing);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Similarity::Score)
}
