//! Document processing pipeline.
//!
//! Every document moves strictly forward through
//!
//! ```text
//! extract text → resolve DOI → fetch record → normalize → append to bibliography → write note → rename PDF
//! ```
//!
//! and stops at the first stage that fails. Stage failures are values ([`FailureReason`]), never
//! panics, and they end only the document at hand: a batch always runs to completion. The rename
//! is best effort since the bibliography and note are already written by then.
//!
//! Documents are processed one after another. The bibliography file is the only state shared
//! between them and is opened in append mode for each write.

use tokio::io::AsyncWriteExt;
use tracing::{Instrument, Span};

use super::*;
use crate::{
  bibtex::{normalize, NormalizedRecord},
  fetch::DoiResolver,
  identifier::{find_doi, IdentifierResolver},
  llm::TitleExtractor,
  note::NoteRenderer,
  pdf::{PdfTextExtractor, TextExtractor},
  search::RegistrySearch,
};

/// A document that made it through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FiledPaper {
  /// The PDF as it was found
  pub source:     PathBuf,
  /// Citation key of the stored record
  pub key:        CitationKey,
  /// The written note
  pub note_path:  PathBuf,
  /// New location of the PDF, if it was renamed
  pub renamed_to: Option<PathBuf>,
}

/// A document that stopped at some stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDocument {
  /// The PDF as it was found
  pub source: PathBuf,
  /// The stage failure
  pub reason: FailureReason,
}

impl FailedDocument {
  /// File name of the document, as listed in the failure report.
  pub fn file_name(&self) -> String {
    self.source.file_name().map_or_else(
      || self.source.display().to_string(),
      |name| name.to_string_lossy().into_owned(),
    )
  }
}

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
  /// Record stored and note written
  Filed(FiledPaper),
  /// Stopped at the first failing stage
  Failed(FailedDocument),
}

impl ProcessingOutcome {
  /// Whether the document was filed.
  pub fn is_success(&self) -> bool { matches!(self, Self::Filed(_)) }
}

impl Display for ProcessingOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Filed(paper) => write!(f, "{} filed as {}", paper.source.display(), paper.key),
      Self::Failed(failure) => write!(f, "{} failed: {}", failure.source.display(), failure.reason),
    }
  }
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
  /// Documents attempted
  pub total:     usize,
  /// Documents filed
  pub succeeded: usize,
  /// Documents that failed, in processing order
  pub failures:  Vec<FailedDocument>,
  /// Documents that were filed, in processing order
  pub filed:     Vec<FiledPaper>,
}

impl RunSummary {
  /// Percentage of documents filed; `0.0` for an empty batch.
  pub fn success_rate(&self) -> f64 {
    if self.total == 0 {
      return 0.0;
    }
    self.succeeded as f64 / self.total as f64 * 100.0
  }

  fn record(&mut self, outcome: ProcessingOutcome) {
    self.total += 1;
    match outcome {
      ProcessingOutcome::Filed(paper) => {
        self.succeeded += 1;
        self.filed.push(paper);
      },
      ProcessingOutcome::Failed(failure) => self.failures.push(failure),
    }
  }
}

/// Takes PDFs from raw files to filed records and notes.
pub struct Pipeline {
  extractor:         Box<dyn TextExtractor>,
  identifiers:       IdentifierResolver,
  fetcher:           DoiResolver,
  notes:             NoteRenderer,
  output_dir:        PathBuf,
  bibliography_file: String,
  note_extension:    String,
  failure_report:    String,
  excerpt_chars:     usize,
  /// Parent of every document span
  span:              Span,
}

impl Pipeline {
  /// Builds a pipeline and its network clients from configuration.
  ///
  /// # Errors
  ///
  /// Fails only when an HTTP client cannot be constructed.
  pub fn from_config(config: &Config) -> Result<Self> {
    let titles = TitleExtractor::from_config(&config.llm, config.registry.timeout());
    let search = RegistrySearch::from_config(&config.registry)?;

    Ok(Self {
      extractor:         Box::new(PdfTextExtractor::new(config.page_limit)),
      identifiers:       IdentifierResolver::new(titles, search),
      fetcher:           DoiResolver::from_config(&config.registry)?,
      notes:             NoteRenderer::new(config.template.clone()),
      output_dir:        config.output_dir.clone(),
      bibliography_file: config.bibliography_file.clone(),
      note_extension:    config.note_extension.clone(),
      failure_report:    config.failure_report.clone(),
      excerpt_chars:     config.title_excerpt_chars,
      span:              tracing::info_span!("pipeline", output = %config.output_dir.display()),
    })
  }

  /// Replaces the text extractor.
  pub fn with_extractor(mut self, extractor: impl TextExtractor + 'static) -> Self {
    self.extractor = Box::new(extractor);
    self
  }

  /// Replaces the DOI discovery fallback.
  pub fn with_identifier_resolver(mut self, identifiers: IdentifierResolver) -> Self {
    self.identifiers = identifiers;
    self
  }

  /// Path of the bibliography file records are appended to.
  pub fn bibliography_path(&self) -> PathBuf { self.output_dir.join(&self.bibliography_file) }

  /// Path of the failure report.
  pub fn failure_report_path(&self) -> PathBuf { self.output_dir.join(&self.failure_report) }

  /// Processes one document.
  pub async fn process(&self, path: impl AsRef<Path>) -> ProcessingOutcome {
    let path = path.as_ref();
    let span = tracing::info_span!(parent: &self.span, "document", file = %path.display());

    async {
      match self.file_document(path).await {
        Ok(paper) => {
          info!("Successfully processed: {}", paper.note_path.display());
          ProcessingOutcome::Filed(paper)
        },
        Err(reason) => {
          error!("Failed to process {}: {}", path.display(), reason);
          ProcessingOutcome::Failed(FailedDocument { source: path.to_path_buf(), reason })
        },
      }
    }
    .instrument(span)
    .await
  }

  /// Processes documents one after another, then writes the failure report and logs a summary.
  pub async fn run<I, P>(&self, documents: I) -> RunSummary
  where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>, {
    let mut summary = RunSummary::default();
    for document in documents {
      summary.record(self.process(document).await);
    }

    async {
      if !summary.failures.is_empty() {
        if let Err(e) = self.write_failure_report(&summary.failures).await {
          error!("Failed to write failed list: {}", e);
        }
      }

      if summary.total == 0 {
        warn!("No PDF files to process");
      } else if summary.failures.is_empty() {
        info!("All {} files processed successfully", summary.total);
      } else {
        error!(
          "Processing completed: {}/{} successful ({:.1}%)",
          summary.succeeded,
          summary.total,
          summary.success_rate()
        );
      }
    }
    .instrument(self.span.clone())
    .await;
    summary
  }

  /// Processes a single `.pdf` file, or every `.pdf` file below a directory.
  ///
  /// # Errors
  ///
  /// Returns [`LitkeepError::InputNotFound`] when `input` is neither a PDF file nor a directory.
  /// Failures of individual documents are reported in the summary instead.
  pub async fn run_path(&self, input: impl AsRef<Path>) -> Result<RunSummary> {
    let input = input.as_ref();
    let documents = if input.is_file() && is_pdf(input) {
      vec![input.to_path_buf()]
    } else if input.is_dir() {
      find_documents(input)?
    } else {
      error!("File or directory not found: {}", input.display());
      return Err(LitkeepError::InputNotFound(input.display().to_string()));
    };

    debug!("Found {} PDF files under {}", documents.len(), input.display());
    Ok(self.run(documents).await)
  }

  async fn file_document(&self, path: &Path) -> std::result::Result<FiledPaper, FailureReason> {
    let text = self.extractor.extract_text(path);
    if text.trim().is_empty() {
      return Err(FailureReason::NoTextExtracted);
    }

    let doi = match find_doi(&text) {
      Some(doi) => {
        debug!("Found DOI {} in text", doi);
        doi
      },
      None => {
        debug!("No DOI in text, looking up the title");
        let excerpt = self.extractor.first_page_excerpt(path, self.excerpt_chars);
        self.identifiers.resolve_by_title(&excerpt).await?
      },
    };

    let raw = self
      .fetcher
      .fetch_by_doi(&doi)
      .await
      .map_err(|e| FailureReason::FetchFailed(e.to_string()))?;

    let record = normalize(&raw).map_err(|e| match e {
      LitkeepError::MissingKey => FailureReason::MissingKey,
      e => FailureReason::FetchFailed(e.to_string()),
    })?;

    self
      .append_record(&record.text)
      .await
      .map_err(|e| FailureReason::Persistence(format!("bibliography: {e}")))?;
    let note_path = self
      .write_note(&record)
      .await
      .map_err(|e| FailureReason::Persistence(format!("note: {e}")))?;
    let renamed_to = rename_pdf(path, &record.key).await;

    Ok(FiledPaper { source: path.to_path_buf(), key: record.key, note_path, renamed_to })
  }

  async fn append_record(&self, record: &str) -> Result<()> {
    tokio::fs::create_dir_all(&self.output_dir).await?;
    let path = self.bibliography_path();
    let mut file =
      tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
    file.write_all(format!("{record}\n").as_bytes()).await?;
    file.flush().await?;
    trace!("Appended record to {}", path.display());
    Ok(())
  }

  async fn write_note(&self, record: &NormalizedRecord) -> Result<PathBuf> {
    let path = self.output_dir.join(record.key.file_name(&self.note_extension));
    let note = self.notes.render_today(&record.text, &record.info.title);
    tokio::fs::write(&path, note).await?;
    Ok(path)
  }

  async fn write_failure_report(&self, failures: &[FailedDocument]) -> Result<()> {
    let mut report = String::from("Failed files:\n");
    for failure in failures {
      report.push_str(&format!("- {}\n", failure.file_name()));
    }

    tokio::fs::create_dir_all(&self.output_dir).await?;
    tokio::fs::write(self.failure_report_path(), report).await?;
    Ok(())
  }
}

/// Renames `path` to `<key>.pdf` in its own directory unless that name is taken.
async fn rename_pdf(path: &Path, key: &CitationKey) -> Option<PathBuf> {
  let target = path.with_file_name(key.file_name("pdf"));

  match tokio::fs::try_exists(&target).await {
    Ok(false) => {},
    Ok(true) => {
      debug!("{} already exists, not renaming {}", target.display(), path.display());
      return None;
    },
    Err(e) => {
      warn!("Failed to rename PDF file {}: {}", path.display(), e);
      return None;
    },
  }

  match tokio::fs::rename(path, &target).await {
    Ok(()) => Some(target),
    Err(e) => {
      warn!("Failed to rename PDF file {}: {}", path.display(), e);
      None
    },
  }
}

fn is_pdf(path: &Path) -> bool { path.extension().is_some_and(|extension| extension == "pdf") }

/// Every `.pdf` file below `dir`, recursively, in path order.
fn find_documents(dir: &Path) -> Result<Vec<PathBuf>> {
  let pattern = format!("{}/**/*.pdf", glob::Pattern::escape(&dir.to_string_lossy()));
  let mut documents = Vec::new();
  for entry in glob::glob(&pattern)? {
    match entry {
      Ok(path) if path.is_file() => documents.push(path),
      Ok(_) => {},
      Err(e) => warn!("Skipping unreadable path: {}", e),
    }
  }
  Ok(documents)
}
