//! Client for OpenAI-compatible chat completion services, used to read paper titles.
//!
//! Title lookup is a capability that is either present or not: [`TitleExtractor`] is decided
//! once, from configuration, when the pipeline is built. Without an API key it is
//! [`TitleExtractor::Unconfigured`] and every lookup fails fast with
//! [`LitkeepError::Unconfigured`], leaving direct DOI matching as the only way to resolve a paper.
//!
//! # Examples
//!
//! ```no_run
//! use litkeep::llm::{ChatRequest, Model};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ChatRequest::new()
//!   .with_host("https://api.openai.com/v1/chat/completions")
//!   .with_model(Model::Gpt4oMini)
//!   .with_system("Answer in one word.")
//!   .with_message("What is the capital of France?");
//!
//! let response = request.send("sk-...").await?;
//! println!("Response: {}", response.content().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use reqwest::Url;

use super::*;

/// Default chat completions endpoint.
pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Instruction sent with every title request.
pub const TITLE_SYSTEM_PROMPT: &str =
  "You are a helpful assistant that extracts text from PDF files, only return pure text of the \
   title.";

/// Prefix a model (or this client) uses to signal that no title could be read.
pub const FAILURE_SENTINEL: &str = "Failed";

/// Available chat models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Model {
  /// OpenAI's small GPT-4o variant
  #[default]
  #[serde(rename = "gpt-4o-mini")]
  Gpt4oMini,
  /// Any other model name understood by the service
  #[serde(untagged)]
  Custom(String),
}

impl Display for Model {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Model::Gpt4oMini => write!(f, "gpt-4o-mini"),
      Model::Custom(name) => write!(f, "{name}"),
    }
  }
}

impl From<&str> for Model {
  fn from(name: &str) -> Self {
    match name {
      "gpt-4o-mini" => Self::Gpt4oMini,
      other => Self::Custom(other.to_string()),
    }
  }
}

/// Request builder for chat completions.
#[derive(Serialize, Default, Debug, Clone)]
pub struct ChatRequest {
  /// The model to use. Sending without one is an error.
  pub model: Option<Model>,

  /// Conversation messages in order. Must contain at least one message before sending.
  pub messages: Vec<Message>,

  /// The endpoint URL. Defaults to [`DEFAULT_CHAT_URL`] with a warning. Skipped during
  /// serialization.
  #[serde(skip)]
  pub url: Option<Url>,

  /// Request timeout. Skipped during serialization.
  #[serde(skip)]
  pub timeout: Option<Duration>,
}

/// A single chat message.
///
/// ```
/// use litkeep::llm::Message;
///
/// let message = Message { role: "user".to_string(), content: "Hello".to_string() };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  /// `system`, `user` or `assistant`
  pub role:    String,
  /// Message text
  pub content: String,
}

/// Response body of a chat completion.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
  /// Completion candidates; the first one is used
  #[serde(default)]
  pub choices: Vec<Choice>,
}

/// One completion candidate.
#[derive(Debug, Deserialize)]
pub struct Choice {
  /// The generated message
  pub message: Message,
}

impl ChatResponse {
  /// Text of the first completion candidate.
  pub fn content(&self) -> Option<&str> {
    self.choices.first().map(|choice| choice.message.content.as_str())
  }
}

impl ChatRequest {
  /// Creates a new request with builder-style API with default settings.
  pub fn new() -> Self { Self::default() }

  /// Sets the full endpoint URL for the request.
  pub fn with_host(mut self, host: &str) -> Self {
    self.url = Url::parse(host).ok();
    if self.url.is_none() {
      warn!("Invalid chat endpoint {:?}, falling back to default", host);
    }
    self
  }

  /// Sets the model to use for the request.
  pub fn with_model(mut self, model: Model) -> Self {
    self.model.replace(model);
    self
  }

  /// Adds a system instruction to the conversation.
  pub fn with_system(mut self, content: &str) -> Self {
    self.messages.push(Message { role: "system".to_string(), content: content.to_string() });
    self
  }

  /// Adds a user message to the conversation.
  pub fn with_message(mut self, content: &str) -> Self {
    self.messages.push(Message { role: "user".to_string(), content: content.to_string() });
    self
  }

  /// Sets the request timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// Sends the request, authenticating with `api_key` as a bearer token.
  ///
  /// # Errors
  ///
  /// This function will return an error if:
  /// - No model or no message is set
  /// - The network request fails or returns a non-success status
  /// - The response cannot be parsed
  pub async fn send(&self, api_key: &str) -> Result<ChatResponse> {
    let url = match &self.url {
      Some(url) => url.clone(),
      None => {
        warn!("No URL set, using {}", DEFAULT_CHAT_URL);
        Url::parse(DEFAULT_CHAT_URL).map_err(|e| LitkeepError::Config(e.to_string()))?
      },
    };

    if self.model.is_none() {
      return Err(LitkeepError::Config("No model was chosen for the chat request".to_string()));
    }

    if self.messages.is_empty() {
      return Err(LitkeepError::Config("No messages were supplied to the chat request".to_string()));
    }

    let mut request = reqwest::Client::new().post(url).bearer_auth(api_key).json(&self);
    if let Some(timeout) = self.timeout {
      request = request.timeout(timeout);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(LitkeepError::ApiError(format!("chat completion returned {status}: {body}")));
    }

    Ok(response.json().await?)
  }
}

/// A text completion service.
///
/// Implemented by [`ChatClient`]; tests supply their own implementations.
#[async_trait]
pub trait LanguageModel: Send + Sync {
  /// Completes a conversation of one system instruction and one user prompt.
  async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Chat completion client holding its credentials.
#[derive(Debug, Clone)]
pub struct ChatClient {
  /// Full chat completions endpoint URL
  url:     String,
  /// Model name sent with every request
  model:   Model,
  /// Bearer token
  api_key: String,
  /// Per-request timeout
  timeout: Duration,
}

impl ChatClient {
  /// Creates a client for the given endpoint and model.
  pub fn new(url: &str, model: Model, api_key: &str, timeout: Duration) -> Self {
    Self { url: url.to_string(), model, api_key: api_key.to_string(), timeout }
  }
}

#[async_trait]
impl LanguageModel for ChatClient {
  async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
    let response = ChatRequest::new()
      .with_host(&self.url)
      .with_model(self.model.clone())
      .with_system(system)
      .with_message(prompt)
      .with_timeout(self.timeout)
      .send(&self.api_key)
      .await?;

    response
      .content()
      .map(|content| content.trim().to_string())
      .ok_or_else(|| LitkeepError::ApiError("chat completion returned no choices".to_string()))
  }
}

/// Title lookup capability.
pub enum TitleExtractor {
  /// A language model is available.
  Configured(Box<dyn LanguageModel>),
  /// No credentials were configured; title lookup is disabled.
  Unconfigured,
}

impl TitleExtractor {
  /// Resolves the capability from configuration: configured exactly when an API key is set.
  pub fn from_config(config: &LlmConfig, timeout: Duration) -> Self {
    match config.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty()) {
      Some(api_key) => Self::Configured(Box::new(ChatClient::new(
        &config.host,
        Model::from(config.model.as_str()),
        api_key,
        timeout,
      ))),
      None => {
        info!("No API key configured, title lookup disabled");
        Self::Unconfigured
      },
    }
  }

  /// Asks the language model for the title in a first-page excerpt.
  ///
  /// # Errors
  ///
  /// - [`LitkeepError::Unconfigured`] when no language model is available
  /// - [`LitkeepError::TitleExtraction`] for an empty excerpt, or when the model's answer is empty
  ///   or begins with [`FAILURE_SENTINEL`]
  /// - whatever the model's client returns when the request itself fails
  pub async fn extract_title(&self, excerpt: &str) -> Result<String> {
    let Self::Configured(model) = self else {
      return Err(LitkeepError::Unconfigured);
    };

    if excerpt.trim().is_empty() {
      return Err(LitkeepError::TitleExtraction(
        "Failed to extract text from the PDF.".to_string(),
      ));
    }

    let prompt = format!("Please extract the title of the article from this {excerpt}");
    let title = model.complete(TITLE_SYSTEM_PROMPT, &prompt).await?;
    let title = title.trim();
    if title.is_empty() || title.starts_with(FAILURE_SENTINEL) {
      return Err(LitkeepError::TitleExtraction(title.to_string()));
    }
    Ok(title.to_string())
  }
}
