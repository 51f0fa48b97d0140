use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("malformed stimulus input: {detail}")]
    MalformedStimulus { detail: String },

    #[error("markup yielded {count} data rows; an even count is required to pair them")]
    UnevenRowCount { count: usize },

    #[error("unparseable markup record {index}: {reason}: {raw}")]
    UnparseableRow {
        index: usize,
        raw: String,
        reason: String,
    },

    #[error("malformed similarity source: {detail}")]
    MalformedSimilaritySource { detail: String },

    #[error("invalid thresholds: {detail}")]
    InvalidThresholds { detail: String },
}

impl PipelineError {
    pub fn stimulus(detail: impl Into<String>) -> Self {
        Self::MalformedStimulus {
            detail: detail.into(),
        }
    }

    pub fn similarity_source(detail: impl Into<String>) -> Self {
        Self::MalformedSimilaritySource {
            detail: detail.into(),
        }
    }
}
