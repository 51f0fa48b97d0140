use crate::model::{Triad, WordPair};
use crate::stimulus::canonical_pairs;

/// Input for the external pairwise scoring form, plus the pair order it encodes.
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    pub pairs: Vec<WordPair>,
    pub text: String,
}

impl ScoringRequest {
    pub fn build(triads: &[Triad]) -> Self {
        let pairs = canonical_pairs(triads);
        let text = render_pairs(&pairs);
        Self { pairs, text }
    }
}

// One word per line, each followed by a blank line; consecutive words form a pair.
fn render_pairs(pairs: &[WordPair]) -> String {
    let mut out = String::new();
    for pair in pairs {
        for word in [&pair.first, &pair.second] {
            out.push_str(word.trim());
            out.push_str("\n\n");
        }
    }
    out
}
