//! Command line interface for the litkeep literature pipeline.
//!
//! Point `litkeep` at a PDF or a directory of PDFs and every paper it can identify is filed:
//! its BibTeX entry is appended to the bibliography, a reading note is written next to it and the
//! PDF is renamed after the entry's citation key.
//!
//! # Usage
//!
//! ```bash
//! # File every PDF below the current directory into ./reference.bib and ./<key>.md
//! litkeep
//!
//! # File a download folder into a notes vault, with a custom note template
//! litkeep ~/Downloads -o ~/vault/papers -t ~/vault/templates/paper.md
//!
//! # Enable title lookup for PDFs that do not print their DOI
//! OPENAI_API_KEY=sk-... litkeep paper.pdf -b library.bib
//! ```
//!
//! Settings not given on the command line come from the configuration file (see
//! `litkeep::configuration`). Logging goes to stderr and is raised with `-v`, `-vv`, `-vvv`.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use clap::{builder::ArgAction, Parser};
use console::style;
use litkeep::{
  configuration::Config,
  error::LitkeepError,
  pipeline::{Pipeline, RunSummary},
};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

pub mod error;

use crate::error::*;

/// Prefix for information messages
static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for warning messages
static WARNING_PREFIX: &str = "⚠️ ";
/// Prefix for error messages
static ERROR_PREFIX: &str = "✗ ";

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "File academic PDFs as BibTeX entries, reading notes and tidy file names")]
pub struct Cli {
  /// PDF file or directory to process; directories are searched recursively
  #[arg(default_value = ".")]
  path: PathBuf,

  /// Directory receiving the bibliography, the notes and the failure list
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// OpenAI API key, used to look up titles of PDFs without a DOI
  #[arg(short = 'k', long = "openai-key", env = "OPENAI_API_KEY", hide_env_values = true)]
  openai_key: Option<String>,

  /// Note template with {{title}}, {{bibtex}} and {{date}} placeholders
  #[arg(short, long)]
  template: Option<PathBuf>,

  /// Bibliography file name inside the output directory
  #[arg(short, long)]
  bibtex: Option<String>,

  /// Configuration file to use instead of the default one
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Extension of the note files
  #[arg(long)]
  note_extension: Option<String>,

  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging verbosity"
    )]
  verbose: u8,
}

/// Configures the logging system based on the verbosity level
///
/// # Arguments
///
/// * `verbosity` - Number of times the verbose flag was used (0-3)
///
/// The verbosity levels are:
/// - 0: warn (default)
/// - 1: info
/// - 2: debug
/// - 3+: trace
///
/// `RUST_LOG` overrides the level entirely.
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_file(verbosity > 2)
    .with_line_number(verbosity > 2)
    .with_target(verbosity > 1)
    .init();
}

/// Expands a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), dirs::home_dir()) {
    (Ok(rest), Some(home)) => home.join(rest),
    _ => path.to_path_buf(),
  }
}

/// Builds the run configuration: the configuration file first, flags on top.
fn load_config(cli: &Cli) -> Result<Config> {
  let mut config = match &cli.config {
    Some(path) => {
      let path = expand_home(path);
      if !path.is_file() {
        return Err(CliError::MissingConfig(path));
      }
      Config::from_file(path)?
    },
    None => Config::load()?,
  };
  config.output_dir = expand_home(&config.output_dir);
  config.template = config.template.as_deref().map(expand_home);

  if let Some(output) = &cli.output {
    config = config.with_output_dir(expand_home(output));
  }
  if let Some(template) = &cli.template {
    config = config.with_template(expand_home(template));
  }
  if let Some(bibtex) = &cli.bibtex {
    config = config.with_bibliography_file(bibtex);
  }
  if let Some(extension) = &cli.note_extension {
    config = config.with_note_extension(extension);
  }
  if let Some(key) = cli.openai_key.as_deref().filter(|key| !key.trim().is_empty()) {
    config = config.with_api_key(key);
  }

  trace!(
    "Bibliography {}, template {:?}, title lookup {}",
    config.bibliography_path().display(),
    config.template,
    if config.llm.api_key.is_some() { "enabled" } else { "disabled" }
  );
  Ok(config)
}

/// Prints one line per document and a closing tally.
fn report(summary: &RunSummary, pipeline: &Pipeline) {
  for paper in &summary.filed {
    println!(
      "{} {} {} {}",
      style(SUCCESS_PREFIX).green(),
      paper.source.display(),
      style("→").dim(),
      style(&paper.key).green().bold()
    );
  }
  for failure in &summary.failures {
    println!(
      "{} {}: {}",
      style(ERROR_PREFIX).red(),
      style(failure.source.display()).yellow(),
      failure.reason
    );
  }

  if summary.total == 0 {
    println!("{} No PDF files found", style(INFO_PREFIX).cyan());
    return;
  }

  println!(
    "{} {}/{} papers filed ({:.1}%)",
    style(INFO_PREFIX).cyan(),
    summary.succeeded,
    summary.total,
    summary.success_rate()
  );
  if !summary.failures.is_empty() {
    println!(
      "{} Failed files listed in {}",
      style(WARNING_PREFIX).yellow(),
      style(pipeline.failure_report_path().display()).yellow()
    );
  }
}

/// Entry point for the litkeep CLI application
///
/// # Errors
///
/// Only an unusable configuration or input path ends the run with an error. Documents that
/// cannot be filed are reported and listed, and the run still succeeds.
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  let config = load_config(&cli)?;
  let pipeline = Pipeline::from_config(&config)?;
  let input = expand_home(&cli.path);
  debug!("Processing {} into {}", input.display(), config.output_dir.display());

  println!("{} Processing {}", style(INFO_PREFIX).cyan(), style(input.display()).yellow());
  let summary = match pipeline.run_path(&input).await {
    Ok(summary) => summary,
    Err(e) => {
      eprintln!("{} {}", style(ERROR_PREFIX).red(), e);
      return Err(e.into());
    },
  };

  report(&summary, &pipeline);
  Ok(())
}
