use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::ExtractArgs;
use crate::markup::{MarkupProfile, MarkupTableParser, ParsedMarkup};
use crate::model::RawComparisonRecord;
use crate::util::read_text;

#[derive(Debug, Serialize)]
struct ExtractResponse<'a> {
    markup_path: String,
    profile: &'a MarkupProfile,
    data_rows: usize,
    records_count: usize,
    missing_count: usize,
    warnings: &'a [String],
    records: &'a [RawComparisonRecord],
}

pub fn run(args: ExtractArgs) -> Result<()> {
    let profile = MarkupProfile::with_overrides(
        args.profile.row_marker.clone(),
        args.profile.missing_marker.clone(),
    );
    let parser = MarkupTableParser::new(profile)?;

    let markup = read_text(&args.markup)?;
    let parsed = parser
        .parse(&markup)
        .with_context(|| format!("markup parse failed for {}", args.markup.display()))?;

    if args.json {
        write_json_response(&args, parser.profile(), &parsed)
    } else {
        write_text_response(&parsed)
    }
}

fn write_json_response(
    args: &ExtractArgs,
    profile: &MarkupProfile,
    parsed: &ParsedMarkup,
) -> Result<()> {
    let response = ExtractResponse {
        markup_path: args.markup.display().to_string(),
        profile,
        data_rows: parsed.data_row_count,
        records_count: parsed.records.len(),
        missing_count: parsed.missing_count,
        warnings: &parsed.warnings,
        records: &parsed.records,
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, &response)
        .context("failed to serialize extract json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(parsed: &ParsedMarkup) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "word_a\tword_b\tsimilarity")?;
    for record in &parsed.records {
        writeln!(
            output,
            "{}\t{}\t{}",
            record.word_a, record.word_b, record.similarity
        )?;
    }

    output.flush()?;
    Ok(())
}
