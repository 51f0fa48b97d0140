use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "simpairs",
    version,
    about = "Extract and merge word-pair similarity scores for triad stimuli"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the word list to paste into the pairwise scoring form.
    Request(RequestArgs),
    /// Parse a saved scoring-tool result page into comparison records.
    Extract(ExtractArgs),
    /// Run the full pipeline and write the tidy similarity table.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct MarkupArgs {
    #[arg(long)]
    pub row_marker: Option<String>,

    #[arg(long)]
    pub missing_marker: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    #[arg(long)]
    pub stimuli: PathBuf,

    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub markup: PathBuf,

    #[command(flatten)]
    pub profile: MarkupArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub stimuli: PathBuf,

    #[arg(long)]
    pub markup: PathBuf,

    #[arg(long)]
    pub second_source: PathBuf,

    #[arg(long)]
    pub thresholds: Option<PathBuf>,

    #[arg(long, default_value = "results/similarity_table.csv")]
    pub out: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[command(flatten)]
    pub profile: MarkupArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
