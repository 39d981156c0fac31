//! Run configuration.
//!
//! Every setting has a default, so a run needs no configuration file at all. When one exists it is
//! a TOML file where any subset of the settings may be given:
//!
//! ```toml
//! output_dir = "~/notes/papers"
//! bibliography_file = "library.bib"
//! template = "~/notes/templates/paper.md"
//!
//! [llm]
//! model = "gpt-4o-mini"
//!
//! [registry]
//! timeout_secs = 30
//! ```
//!
//! Command line flags are layered on top with the `with_*` builders.

use super::*;
use crate::{fetch::DEFAULT_DOI_URL, llm::DEFAULT_CHAT_URL, search::DEFAULT_SEARCH_URL};

/// Settings for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory receiving the bibliography, notes and failure report
  pub output_dir:          PathBuf,
  /// Bibliography file name inside `output_dir`
  pub bibliography_file:   String,
  /// Extension of note files
  pub note_extension:      String,
  /// Failure report file name inside `output_dir`
  pub failure_report:      String,
  /// Note template; the built-in template is used when unset or unreadable
  pub template:            Option<PathBuf>,
  /// Leading pages read from each PDF
  pub page_limit:          usize,
  /// Characters of the first page sent to the language model
  pub title_excerpt_chars: usize,
  /// Language model settings
  pub llm:                 LlmConfig,
  /// Bibliographic registry settings
  pub registry:            RegistryConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      output_dir:          PathBuf::from("."),
      bibliography_file:   "reference.bib".to_string(),
      note_extension:      "md".to_string(),
      failure_report:      "failed_list.md".to_string(),
      template:            None,
      page_limit:          3,
      title_excerpt_chars: 500,
      llm:                 LlmConfig::default(),
      registry:            RegistryConfig::default(),
    }
  }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
  /// Chat completions endpoint
  pub host:    String,
  /// Model name
  pub model:   String,
  /// API key; title lookup is disabled without one
  pub api_key: Option<String>,
}

impl Default for LlmConfig {
  fn default() -> Self {
    Self { host: DEFAULT_CHAT_URL.to_string(), model: "gpt-4o-mini".to_string(), api_key: None }
  }
}

/// Bibliographic registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
  /// Works search endpoint used for title lookups
  pub search_url:              String,
  /// DOI resolver used to fetch BibTeX
  pub doi_url:                 String,
  /// Timeout for every registry request, in seconds
  pub timeout_secs:            u64,
  /// Sleep after a rate limit response, in seconds
  pub rate_limit_backoff_secs: u64,
  /// User-Agent sent with search requests
  pub user_agent:              String,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      search_url:              DEFAULT_SEARCH_URL.to_string(),
      doi_url:                 DEFAULT_DOI_URL.to_string(),
      timeout_secs:            30,
      rate_limit_backoff_secs: 5,
      user_agent:              format!(
        "{}/{} (https://github.com/autoparallel/litkeep)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
      ),
    }
  }
}

impl RegistryConfig {
  /// Request timeout.
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  /// Backoff applied after a rate limit response.
  pub fn rate_limit_backoff(&self) -> Duration { Duration::from_secs(self.rate_limit_backoff_secs) }
}

impl Config {
  /// Default location of the configuration file.
  ///
  /// - On Unix: `~/.config/litkeep/config.toml`
  /// - On macOS: `~/Library/Application Support/litkeep/config.toml`
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("litkeep").join("config.toml")
  }

  /// Reads a configuration file.
  ///
  /// # Errors
  ///
  /// Fails when the file cannot be read or is not valid TOML for this structure.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
  }

  /// Reads the configuration at `path` if the file exists, otherwise returns the defaults.
  pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if path.is_file() {
      Self::from_file(path)
    } else {
      trace!("No configuration at {}, using defaults", path.display());
      Ok(Self::default())
    }
  }

  /// Reads the configuration at [`Config::default_path`] if present, otherwise the defaults.
  pub fn load() -> Result<Self> { Self::load_from(Self::default_path()) }

  /// Sets the output directory.
  pub fn with_output_dir(mut self, output_dir: impl AsRef<Path>) -> Self {
    self.output_dir = output_dir.as_ref().to_path_buf();
    self
  }

  /// Sets the bibliography file name.
  pub fn with_bibliography_file(mut self, name: &str) -> Self {
    self.bibliography_file = name.to_string();
    self
  }

  /// Sets the note template path.
  pub fn with_template(mut self, template: impl AsRef<Path>) -> Self {
    self.template = Some(template.as_ref().to_path_buf());
    self
  }

  /// Sets the language model API key.
  pub fn with_api_key(mut self, api_key: &str) -> Self {
    self.llm.api_key = Some(api_key.to_string());
    self
  }

  /// Sets the note file extension.
  pub fn with_note_extension(mut self, extension: &str) -> Self {
    self.note_extension = extension.trim_start_matches('.').to_string();
    self
  }

  /// Full path of the bibliography file.
  pub fn bibliography_path(&self) -> PathBuf { self.output_dir.join(&self.bibliography_file) }

  /// Full path of the failure report.
  pub fn failure_report_path(&self) -> PathBuf { self.output_dir.join(&self.failure_report) }
}
