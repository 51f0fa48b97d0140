use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::cli::AnalyzeArgs;
use crate::markup::{MarkupProfile, MarkupTableParser};
use crate::merge::merge;
use crate::model::{AnalyzeOutputs, AnalyzeRunManifest, InputDigest};
use crate::result_table::{LabelCounts, ThresholdConfig};
use crate::second_source;
use crate::stimulus::StimulusSet;
use crate::table::Delim;
use crate::util::{
    now_utc_string, read_text, sha256_file, to_json_pretty, utc_compact_string,
    write_all_or_nothing,
};

const MANIFEST_VERSION: u32 = 1;

#[cfg(test)]
mod tests;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let (manifest, manifest_path) = execute(&args)?;

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &manifest)
            .context("failed to serialize analyze json output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    write_text_summary(&manifest, &manifest_path)
}

/// Runs every stage, then writes the table and the run manifest together.
/// Neither file is left behind unless both are written.
pub fn execute(args: &AnalyzeArgs) -> Result<(AnalyzeRunManifest, PathBuf)> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir_for(&args.out).join(format!(
            "analyze_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    info!(run_id = %run_id, "starting analysis");

    let thresholds = args
        .thresholds
        .as_deref()
        .map(ThresholdConfig::load)
        .transpose()?;

    let stimuli = StimulusSet::load(&args.stimuli).context("stimulus stage failed")?;

    let profile = MarkupProfile::with_overrides(
        args.profile.row_marker.clone(),
        args.profile.missing_marker.clone(),
    );
    let parser = MarkupTableParser::new(profile)?;
    let markup = read_text(&args.markup)?;
    let parsed = parser
        .parse(&markup)
        .with_context(|| format!("markup parse failed for {}", args.markup.display()))?;

    let second = second_source::load(&args.second_source).context("second source stage failed")?;

    let canonical_pairs = stimuli.canonical_pairs();
    let mut outcome = merge(&canonical_pairs, &parsed.records, &second);

    let labels = match &thresholds {
        Some(config) => outcome.table.derive_extremity_labels(config),
        None => {
            info!("no thresholds configured; extremity labels left empty");
            LabelCounts::default()
        }
    };

    let inputs = collect_input_digests(args)?;
    let table_text = outcome.table.to_delimited(Delim::for_path(&args.out))?;

    let mut warnings = stimuli.warnings().to_vec();
    warnings.extend(parsed.warnings);
    warnings.extend(outcome.warnings);

    let manifest = AnalyzeRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        status: "completed".to_string(),
        started_at,
        finished_at: now_utc_string(),
        command: render_analyze_command(args),
        markup_profile: parser.profile().clone(),
        inputs,
        thresholds,
        merge: outcome.stats,
        labels,
        outputs: AnalyzeOutputs {
            table_path: args.out.display().to_string(),
            row_count: outcome.table.rows().len(),
        },
        warnings,
    };

    let manifest_text = to_json_pretty(&manifest)?;
    write_all_or_nothing(&[
        (args.out.as_path(), table_text.as_str()),
        (manifest_path.as_path(), manifest_text.as_str()),
    ])?;
    info!(path = %args.out.display(), rows = manifest.outputs.row_count, "wrote similarity table");
    info!(path = %manifest_path.display(), "wrote analyze run manifest");

    Ok((manifest, manifest_path))
}

fn manifest_dir_for(out: &Path) -> PathBuf {
    out.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.join("manifests"))
        .unwrap_or_else(|| PathBuf::from("manifests"))
}

fn collect_input_digests(args: &AnalyzeArgs) -> Result<Vec<InputDigest>> {
    let mut inputs = vec![
        ("stimuli", args.stimuli.as_path()),
        ("markup", args.markup.as_path()),
        ("second_source", args.second_source.as_path()),
    ];
    if let Some(path) = &args.thresholds {
        inputs.push(("thresholds", path.as_path()));
    }

    inputs
        .into_iter()
        .map(|(role, path)| {
            Ok::<_, anyhow::Error>(InputDigest {
                role: role.to_string(),
                path: path.display().to_string(),
                sha256: sha256_file(path)?,
            })
        })
        .collect()
}

fn render_analyze_command(args: &AnalyzeArgs) -> String {
    let mut command = vec![
        "simpairs".to_string(),
        "analyze".to_string(),
        "--stimuli".to_string(),
        args.stimuli.display().to_string(),
        "--markup".to_string(),
        args.markup.display().to_string(),
        "--second-source".to_string(),
        args.second_source.display().to_string(),
        "--out".to_string(),
        args.out.display().to_string(),
    ];

    if let Some(path) = &args.thresholds {
        command.push("--thresholds".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(marker) = &args.profile.row_marker {
        command.push("--row-marker".to_string());
        command.push(format!("{marker:?}"));
    }
    if let Some(marker) = &args.profile.missing_marker {
        command.push("--missing-marker".to_string());
        command.push(format!("{marker:?}"));
    }
    if args.json {
        command.push("--json".to_string());
    }

    command.join(" ")
}

fn write_text_summary(manifest: &AnalyzeRunManifest, manifest_path: &Path) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    let merge = &manifest.merge;

    writeln!(output, "Run: {}", manifest.run_id)?;
    writeln!(
        output,
        "Pairs: canonical={} distinct={} lookups={}",
        merge.canonical_pairs, merge.distinct_pairs, merge.lookups
    )?;
    for (name, stats) in [("source_1", &merge.source_1), ("source_2", &merge.source_2)] {
        writeln!(
            output,
            "{name}: records={} resolved={} missing={} unmatched={} conflicts={}",
            stats.records,
            stats.distinct_resolved,
            stats.missing_rows,
            stats.unmatched_records,
            stats.conflicts
        )?;
    }
    writeln!(
        output,
        "Labels: source_1={} source_2={}",
        manifest.labels.source_1, manifest.labels.source_2
    )?;
    writeln!(
        output,
        "Table: {} ({} rows)",
        manifest.outputs.table_path, manifest.outputs.row_count
    )?;
    writeln!(output, "Manifest: {}", manifest_path.display())?;
    writeln!(output, "Warnings: {}", manifest.warnings.len())?;
    for warning in &manifest.warnings {
        writeln!(output, "\t{warning}")?;
    }

    output.flush()?;
    Ok(())
}
