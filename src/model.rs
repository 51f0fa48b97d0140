use std::fmt;

use serde::Serialize;

use crate::merge::MergeStats;
use crate::markup::MarkupProfile;
use crate::result_table::{LabelCounts, ThresholdConfig};

pub const MISSING_TEXT: &str = "NA";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchType {
    Shape,
    Category,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shape => "shape",
            Self::Category => "category",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "shape" => Some(Self::Shape),
            "category" => Some(Self::Category),
            _ => None,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triad {
    pub list_id: String,
    pub w1: String,
    pub w2: String,
    pub w3: String,
}

impl Triad {
    pub fn shape_pair(&self) -> WordPair {
        WordPair {
            list_id: self.list_id.clone(),
            match_type: MatchType::Shape,
            first: self.w1.clone(),
            second: self.w2.clone(),
        }
    }

    pub fn category_pair(&self) -> WordPair {
        WordPair {
            list_id: self.list_id.clone(),
            match_type: MatchType::Category,
            first: self.w2.clone(),
            second: self.w3.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPair {
    pub list_id: String,
    pub match_type: MatchType,
    pub first: String,
    pub second: String,
}

impl WordPair {
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.first, &self.second)
    }

    pub fn render(&self) -> String {
        format!("{} - {}", self.first, self.second)
    }
}

/// Order-independent identity of two compared terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: String,
    high: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let a = normalize_term(a);
        let b = normalize_term(b);
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.low, self.high)
    }
}

pub fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_ascii_lowercase()
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum Similarity {
    Score(f64),
    Missing,
}

impl Similarity {
    pub fn as_option(self) -> Option<f64> {
        match self {
            Self::Score(value) => Some(value),
            Self::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<Similarity> for Option<f64> {
    fn from(value: Similarity) -> Self {
        value.as_option()
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(value) => write!(f, "{value}"),
            Self::Missing => f.write_str(MISSING_TEXT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawComparisonRecord {
    pub word_a: String,
    pub word_b: String,
    pub similarity: Similarity,
}

impl RawComparisonRecord {
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.word_a, &self.word_b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityRecord {
    pub list_id: Option<String>,
    pub match_type: MatchType,
    pub word_a: String,
    pub word_b: String,
    pub similarity: Similarity,
}

impl SimilarityRecord {
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.word_a, &self.word_b)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InputDigest {
    pub role: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutputs {
    pub table_path: String,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub command: String,
    pub markup_profile: MarkupProfile,
    pub inputs: Vec<InputDigest>,
    pub thresholds: Option<ThresholdConfig>,
    pub merge: MergeStats,
    pub labels: LabelCounts,
    pub outputs: AnalyzeOutputs,
    pub warnings: Vec<String>,
}
