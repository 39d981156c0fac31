//! Literature filing for academic PDFs.
//!
//! `litkeep` takes a PDF of a paper and turns it into three durable artifacts:
//!
//! - a re-keyed, column-aligned BibTeX entry appended to a shared bibliography file
//! - a reading note named after the entry's citation key
//! - the original PDF renamed to `<citation key>.pdf`
//!
//! # Pipeline
//!
//! Each document flows strictly forward through these stages:
//!
//! 1. [`pdf`]: pull text from the first pages of the document
//! 2. [`identifier`]: find a DOI in that text, or fall back to a title lookup through the
//!    [`llm`] and [`search`] collaborators
//! 3. [`fetch`]: resolve the DOI to a raw BibTeX record
//! 4. [`bibtex`]: parse the record, derive a deterministic [`CitationKey`], rewrite and align it
//! 5. [`note`]: render the reading note
//! 6. [`pipeline`]: persist everything and rename the PDF
//!
//! # Getting Started
//!
//! ```no_run
//! use litkeep::{configuration::Config, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let config = Config::load()?.with_output_dir("notes");
//!   let pipeline = Pipeline::from_config(&config)?;
//!
//!   let summary = pipeline.run_path("papers/").await?;
//!   println!("{}/{} papers filed", summary.succeeded, summary.total);
//!   Ok(())
//! }
//! ```
//!
//! # Citation keys
//!
//! Keys have the form `<first author surname><year><first meaningful title word>`, for
//! example `kirilyuk2006complex`. They are a pure function of the parsed record, so running the
//! tool twice over the same paper always produces the same file names.

#![warn(missing_docs)]

use std::{
  fmt::Display,
  path::{Path, PathBuf},
  time::Duration,
};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod bibtex;
pub mod configuration;
pub mod error;
pub mod fetch;
pub mod identifier;
pub mod llm;
pub mod note;
pub mod paper;
pub mod pdf;
pub mod pipeline;
pub mod search;

pub use crate::{bibtex::CitationKey, identifier::Doi, paper::PaperInfo};
use crate::{configuration::*, error::*};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use litkeep::{pipeline::Pipeline, prelude::*};
///
/// async fn example(pipeline: &Pipeline) -> Result<(), LitkeepError> {
///   let outcome = pipeline.process("paper.pdf").await;
///   println!("{outcome}");
///   Ok(())
/// }
/// ```
pub mod prelude {
  pub use crate::{
    error::{FailureReason, LitkeepError},
    llm::LanguageModel,
    pdf::TextExtractor,
  };
}
