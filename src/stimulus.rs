use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::model::{Triad, WordPair};
use crate::table::{Delim, DelimitedTable};
use crate::util::read_text;

const LIST_COLUMN: &str = "List";
const WORD_COLUMNS: [&str; 3] = ["w1", "w2", "w3"];
const MAX_LISTS: usize = 2;

#[derive(Debug, Clone)]
pub struct StimulusSet {
    triads: Vec<Triad>,
    warnings: Vec<String>,
}

impl StimulusSet {
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_text(path)?;
        let set = Self::parse(&text, Delim::for_path(path))
            .with_context(|| format!("failed to load stimuli from {}", path.display()))?;

        for warning in &set.warnings {
            warn!(path = %path.display(), "{warning}");
        }
        info!(
            path = %path.display(),
            triads = set.triads.len(),
            lists = set.list_ids().len(),
            "loaded stimulus set"
        );

        Ok(set)
    }

    pub fn parse(text: &str, delim: Delim) -> Result<Self, PipelineError> {
        let table = DelimitedTable::parse(text, delim)
            .map_err(|err| PipelineError::stimulus(format!("unreadable table: {err}")))?;
        if table.headers.is_empty() {
            return Err(PipelineError::stimulus("no header row"));
        }

        let list_index = table.column(&[LIST_COLUMN]);
        let word_indexes = WORD_COLUMNS.map(|name| table.column(&[name]));

        let missing = std::iter::once((LIST_COLUMN, list_index))
            .chain(WORD_COLUMNS.into_iter().zip(word_indexes))
            .filter(|(_, index)| index.is_none())
            .map(|(name, _)| name)
            .collect::<Vec<&str>>();
        if !missing.is_empty() {
            return Err(PipelineError::stimulus(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let columns = [
            (LIST_COLUMN, list_index.unwrap_or_default()),
            (WORD_COLUMNS[0], word_indexes[0].unwrap_or_default()),
            (WORD_COLUMNS[1], word_indexes[1].unwrap_or_default()),
            (WORD_COLUMNS[2], word_indexes[2].unwrap_or_default()),
        ];

        let mut triads = Vec::with_capacity(table.rows.len());
        for (row_index, row) in table.rows.iter().enumerate() {
            let mut values = [""; 4];
            for (slot, (name, column)) in values.iter_mut().zip(columns) {
                let value = DelimitedTable::cell(row, column);
                if value.is_empty() {
                    return Err(PipelineError::stimulus(format!(
                        "data row {} has an empty '{name}' cell",
                        row_index + 1
                    )));
                }
                *slot = value;
            }

            triads.push(Triad {
                list_id: values[0].to_string(),
                w1: values[1].to_string(),
                w2: values[2].to_string(),
                w3: values[3].to_string(),
            });
        }

        if triads.is_empty() {
            return Err(PipelineError::stimulus("no triad rows after the header"));
        }

        let mut set = Self {
            triads,
            warnings: Vec::new(),
        };
        let lists = set.list_ids();
        if lists.len() > MAX_LISTS {
            let warning = format!(
                "stimulus file names {} lists ({}); expected at most {MAX_LISTS}",
                lists.len(),
                lists.join(", ")
            );
            set.warnings.push(warning);
        }

        Ok(set)
    }

    pub fn triads(&self) -> &[Triad] {
        &self.triads
    }

    /// Shape pairs for every triad first, then category pairs, each block in triad order.
    pub fn canonical_pairs(&self) -> Vec<WordPair> {
        canonical_pairs(&self.triads)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn list_ids(&self) -> Vec<&str> {
        let mut ids = Vec::<&str>::new();
        for triad in &self.triads {
            if !ids.contains(&triad.list_id.as_str()) {
                ids.push(&triad.list_id);
            }
        }
        ids
    }
}

pub fn canonical_pairs(triads: &[Triad]) -> Vec<WordPair> {
    triads
        .iter()
        .map(Triad::shape_pair)
        .chain(triads.iter().map(Triad::category_pair))
        .collect()
}
