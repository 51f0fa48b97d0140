use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RequestArgs;
use crate::model::MatchType;
use crate::scoring_input::ScoringRequest;
use crate::stimulus::StimulusSet;
use crate::util::write_text_atomic;

pub fn run(args: RequestArgs) -> Result<()> {
    let stimuli = StimulusSet::load(&args.stimuli)?;
    let request = ScoringRequest::build(stimuli.triads());

    let shape_pairs = request
        .pairs
        .iter()
        .filter(|pair| pair.match_type == MatchType::Shape)
        .count();

    match &args.out {
        Some(path) => {
            write_text_atomic(path, &request.text)?;
            info!(path = %path.display(), "wrote scoring-tool input");
        }
        None => {
            let mut output = io::BufWriter::new(io::stdout().lock());
            output
                .write_all(request.text.as_bytes())
                .context("failed to write scoring-tool input to stdout")?;
            output.flush()?;
        }
    }

    info!(
        pairs = request.pairs.len(),
        shape_pairs,
        category_pairs = request.pairs.len() - shape_pairs,
        "scoring request built"
    );

    Ok(())
}
