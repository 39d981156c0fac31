//! Errors surfaced by the `litkeep` binary.

use thiserror::Error;

use super::*;

/// Error type alias used by the CLI.
pub type Result<T> = core::result::Result<T, CliError>;

/// Errors that end a `litkeep` run.
///
/// Per-document failures never show up here; they are reported in the run summary and the
/// failure list instead.
#[derive(Error, Debug)]
pub enum CliError {
  /// Configuration could not be loaded, or the input path is unusable.
  #[error(transparent)]
  Litkeep(#[from] LitkeepError),

  /// The configuration file given with `--config` does not exist.
  #[error("Configuration file not found: {}", .0.display())]
  MissingConfig(PathBuf),
}
