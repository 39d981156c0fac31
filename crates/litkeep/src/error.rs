//! Error types for the litkeep library.
//!
//! Two kinds of failure live here:
//!
//! - [`LitkeepError`]: what a single operation returns when it cannot do its job (a request failed,
//!   a record has no key, a file could not be written).
//! - [`FailureReason`]: why a whole document ended in failure. The pipeline maps every stage error
//!   onto exactly one reason, and the reason is what gets reported.
//!
//! # Examples
//!
//! ```
//! use litkeep::{bibtex, error::LitkeepError};
//!
//! match bibtex::format_record("") {
//!   Err(LitkeepError::EmptyRecord) => println!("nothing to format"),
//!   Err(e) => println!("other error: {e}"),
//!   Ok(text) => println!("{text}"),
//! }
//! ```

use thiserror::Error;

/// Error type alias used for the [`litkeep`](crate) crate.
pub type Result<T> = core::result::Result<T, LitkeepError>;

/// Errors that can occur while filing a paper.
#[derive(Error, Debug)]
pub enum LitkeepError {
  /// A network request failed.
  ///
  /// This covers unreachable hosts, timeouts and TLS errors as well as bodies
  /// that could not be decoded.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A remote service answered, but not with anything usable.
  ///
  /// The string carries the service's own message, or a short description of what
  /// was wrong with the response.
  #[error("API error: {0}")]
  ApiError(String),

  /// The DOI resolver answered with its "DOI Not Found" page.
  ///
  /// The resolver sometimes serves this page with a `200` status, so it is detected from the
  /// body rather than the status code.
  #[error("DOI {0} not found")]
  DoiNotFound(String),

  /// A BibTeX record was empty, or was the `failed` marker from an earlier stage.
  #[error("BibTeX record is empty")]
  EmptyRecord,

  /// A BibTeX record could not be split into an entry type, a key and fields.
  #[error("Malformed BibTeX record: {0}")]
  MalformedRecord(String),

  /// A BibTeX record had no `@type{key,` declaration to re-key.
  #[error("No key found in BibTeX record")]
  MissingKey,

  /// The language model is not configured, so title lookup is unavailable.
  #[error("No language model configured (missing API key)")]
  Unconfigured,

  /// The language model could not produce a title.
  ///
  /// Holds whatever the model said, which begins with `Failed` by convention.
  #[error("Title extraction failed: {0}")]
  TitleExtraction(String),

  /// The input path given to a batch run is neither a PDF file nor a directory.
  #[error("File or directory not found: {0}")]
  InputNotFound(String),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// PDF parsing or text extraction failed in `lopdf`.
  #[error(transparent)]
  Lopdf(#[from] lopdf::Error),

  /// A JSON body could not be parsed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A TOML configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// A glob pattern built for directory scanning was invalid.
  #[error(transparent)]
  Pattern(#[from] glob::PatternError),

  /// The configuration is unusable.
  #[error("{0}")]
  Config(String),
}

/// Why a document ended in failure.
///
/// Every document either succeeds with a citation key or stops at the first stage that
/// reports one of these. The `Display` form is what ends up in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
  /// The PDF yielded no text from its leading pages.
  NoTextExtracted,
  /// No DOI in the text, and the title lookup was unavailable or failed.
  TitleUnavailable(String),
  /// A title was found, but the registry search found no DOI for it.
  DoiNotResolved(String),
  /// The DOI resolver returned no usable record.
  FetchFailed(String),
  /// The fetched record had no key to rewrite.
  MissingKey,
  /// Writing the bibliography or the note failed.
  Persistence(String),
}

impl std::fmt::Display for FailureReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::NoTextExtracted => write!(f, "no text extracted"),
      Self::TitleUnavailable(reason) => write!(f, "failed to extract title: {reason}"),
      Self::DoiNotResolved(title) => write!(f, "no DOI found for title: {title}"),
      Self::FetchFailed(reason) => write!(f, "failed to retrieve BibTeX: {reason}"),
      Self::MissingKey => write!(f, "no key found in BibTeX record"),
      Self::Persistence(reason) => write!(f, "failed to write output: {reason}"),
    }
  }
}
