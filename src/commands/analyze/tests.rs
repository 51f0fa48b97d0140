use std::fs;
use std::path::Path;

use tempfile::tempdir;

use super::*;
use crate::cli::MarkupArgs;
use crate::error::PipelineError;

const STIMULI: &str = "List,w1,w2,w3\n1,toast,TV screen,wall clock\n";

const SECOND_SOURCE: &str = "List,w1,w2,w3,condition,similarity\n\
                             1,toast,TV screen,wall clock,shape,0.11\n\
                             1,toast,TV screen,wall clock,category,NA\n";

const THRESHOLDS: &str = r#"{
  "source_1": {"shape": {"low": 0.05, "high": 0.5}, "category": {"low": 0.1, "high": 0.5}},
  "source_2": {"shape": {"low": 0.2, "high": 0.6}}
}"#;

fn markup_page(rows: &[(&str, &str, &str)]) -> String {
    let mut page = String::from(
        "<html><body>\n<table border=1>\n<tr><td>Document</td><td>Document</td><td>Cosine</td></tr>\n",
    );
    for (first, second, value) in rows {
        page.push_str(&format!(
            "<tr><td align=center>{second}</td><td align=center>{first}</td>\n<td align=center>{value}</td></tr>\n"
        ));
    }
    page.push_str("</table>\n</body></html>\n");
    page
}

fn write_inputs(dir: &Path, markup: &str) -> AnalyzeArgs {
    let stimuli = dir.join("stimuli.csv");
    let markup_path = dir.join("lsa_output.html");
    let second = dir.join("second_source.csv");
    let thresholds = dir.join("thresholds.json");

    fs::write(&stimuli, STIMULI).expect("write stimuli");
    fs::write(&markup_path, markup).expect("write markup");
    fs::write(&second, SECOND_SOURCE).expect("write second source");
    fs::write(&thresholds, THRESHOLDS).expect("write thresholds");

    AnalyzeArgs {
        stimuli,
        markup: markup_path,
        second_source: second,
        thresholds: Some(thresholds),
        out: dir.join("results").join("similarity_table.csv"),
        manifest_path: None,
        profile: MarkupArgs::default(),
        json: false,
    }
}

#[test]
fn single_triad_scenario_produces_expected_table() {
    let dir = tempdir().expect("tempdir");
    let args = write_inputs(
        dir.path(),
        &markup_page(&[
            ("toast", "TV screen", "0.02"),
            ("TV screen", "wall clock", "0.55"),
        ]),
    );

    let (manifest, manifest_path) = execute(&args).expect("analysis succeeds");

    let table = fs::read_to_string(&args.out).expect("table written");
    let lines = table.lines().collect::<Vec<&str>>();
    assert_eq!(
        lines,
        vec![
            "list_id,match_type,word_pair,similarity_source_1,similarity_source_2,label_source_1,label_source_2",
            "1,shape,toast - TV screen,0.02,0.11,toast - TV screen,toast - TV screen",
            "1,category,TV screen - wall clock,0.55,NA,TV screen - wall clock,NA",
        ]
    );

    assert_eq!(manifest.outputs.row_count, 2);
    assert_eq!(manifest.merge.source_2.missing_rows, 1);
    assert_eq!(manifest.labels.source_1, 2);
    assert_eq!(manifest.labels.source_2, 1);
    assert_eq!(manifest.inputs.len(), 4);
    assert!(manifest.inputs.iter().all(|input| input.sha256.len() == 64));
    assert!(manifest.warnings.is_empty());

    assert_eq!(
        manifest_path.parent(),
        Some(dir.path().join("results").join("manifests").as_path())
    );
    let manifest_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).expect("manifest written"))
            .expect("manifest is json");
    assert_eq!(manifest_json["status"], "completed");
    assert_eq!(manifest_json["markup_profile"]["profile_id"], "pairwise-table-v1");
}

#[test]
fn uneven_markup_aborts_without_writing_outputs() {
    let dir = tempdir().expect("tempdir");
    let mut page = markup_page(&[("toast", "TV screen", "0.02")]);
    page.push_str("<td align=center>0.55</td>\n");
    let args = write_inputs(dir.path(), &page);

    let err = execute(&args).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::UnevenRowCount { count: 3 })
    );
    assert!(!args.out.exists());
    assert!(!dir.path().join("results").exists());
}

#[test]
fn unparseable_markup_reports_the_offending_row() {
    let dir = tempdir().expect("tempdir");
    let args = write_inputs(
        dir.path(),
        &markup_page(&[
            ("toast", "TV screen", "0.02"),
            ("TV screen", "wall clock", "??"),
        ]),
    );

    let err = execute(&args).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("markup parse failed"));
    assert!(message.contains("wall clock"));
    assert!(!args.out.exists());
}

#[test]
fn missing_markup_scores_are_written_as_na_not_zero() {
    let dir = tempdir().expect("tempdir");
    let mut args = write_inputs(
        dir.path(),
        &markup_page(&[("toast", "TV screen", "N/A"), ("TV screen", "wall clock", "0.0")]),
    );
    args.thresholds = None;
    args.manifest_path = Some(dir.path().join("run.json"));

    let (manifest, manifest_path) = execute(&args).expect("analysis succeeds");
    let table = fs::read_to_string(&args.out).expect("table written");
    let lines = table.lines().collect::<Vec<&str>>();

    assert_eq!(lines[1], "1,shape,toast - TV screen,NA,0.11,NA,NA");
    assert_eq!(lines[2], "1,category,TV screen - wall clock,0,NA,NA,NA");
    assert_eq!(manifest.merge.source_1.missing_rows, 1);
    assert_eq!(manifest.labels, LabelCounts::default());
    assert_eq!(manifest_path, dir.path().join("run.json"));
    assert!(manifest.thresholds.is_none());
}

#[test]
fn malformed_stimuli_fail_the_stimulus_stage() {
    let dir = tempdir().expect("tempdir");
    let args = write_inputs(dir.path(), &markup_page(&[]));
    fs::write(&args.stimuli, "List,w1,w2\n1,a,b\n").expect("rewrite stimuli");

    let err = execute(&args).unwrap_err();
    assert!(format!("{err:#}").contains("stimulus stage failed"));
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MalformedStimulus { .. })
    ));
}

#[test]
fn manifest_dir_sits_next_to_the_table() {
    assert_eq!(
        manifest_dir_for(Path::new("results/similarity_table.csv")),
        PathBuf::from("results/manifests")
    );
    assert_eq!(
        manifest_dir_for(Path::new("table.csv")),
        PathBuf::from("manifests")
    );
}

#[test]
fn render_analyze_command_includes_optional_flags() {
    let args = AnalyzeArgs {
        stimuli: PathBuf::from("stimuli.csv"),
        markup: PathBuf::from("out.html"),
        second_source: PathBuf::from("snaut.csv"),
        thresholds: Some(PathBuf::from("thresholds.json")),
        out: PathBuf::from("results/similarity_table.csv"),
        manifest_path: None,
        profile: MarkupArgs {
            row_marker: Some("<td class=cmp>".to_string()),
            missing_marker: None,
        },
        json: true,
    };

    let command = render_analyze_command(&args);
    assert!(command.starts_with("simpairs analyze --stimuli stimuli.csv"));
    assert!(command.contains("--thresholds thresholds.json"));
    assert!(command.contains("--row-marker \"<td class=cmp>\""));
    assert!(!command.contains("--missing-marker"));
    assert!(command.ends_with("--json"));
}

#[test]
fn extra_stimulus_lists_are_recorded_in_manifest_warnings() {
    let dir = tempdir().expect("tempdir");
    let mut args = write_inputs(
        dir.path(),
        &markup_page(&[
            ("toast", "TV screen", "0.02"),
            ("TV screen", "wall clock", "0.55"),
        ]),
    );
    fs::write(
        &args.stimuli,
        "List,w1,w2,w3\n1,toast,TV screen,wall clock\n2,toast,TV screen,wall clock\n3,toast,TV screen,wall clock\n",
    )
    .expect("rewrite stimuli");
    args.manifest_path = Some(dir.path().join("run.json"));

    let (manifest, manifest_path) = execute(&args).expect("analysis succeeds");

    assert_eq!(manifest.outputs.row_count, 6);
    assert!(
        manifest
            .warnings
            .iter()
            .any(|warning| warning.contains("3 lists (1, 2, 3)"))
    );
    let written = fs::read_to_string(&manifest_path).expect("manifest written");
    assert!(written.contains("3 lists (1, 2, 3)"));
}

#[test]
fn unwritable_manifest_leaves_no_table_behind() {
    let dir = tempdir().expect("tempdir");
    let mut args = write_inputs(
        dir.path(),
        &markup_page(&[
            ("toast", "TV screen", "0.02"),
            ("TV screen", "wall clock", "0.55"),
        ]),
    );
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").expect("write blocker");
    args.manifest_path = Some(blocker.join("run.json"));

    let err = execute(&args).unwrap_err();
    assert!(format!("{err:#}").contains("failed to create directory"));
    assert!(!args.out.exists());
    assert!(!args.out.with_file_name("similarity_table.csv.partial").exists());
}
