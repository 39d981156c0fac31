//! Title based DOI lookup against the Crossref works API.
//!
//! The search is fuzzy: the registry ranks works by similarity to the query and only the top hit
//! is considered. A rate limit response costs one fixed backoff and is then reported as "no
//! result"; retrying is left to the caller.

use serde_json::Value;

use super::*;

/// Crossref works search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://api.crossref.org/works";

/// Client for the registry's title search.
#[derive(Debug, Clone)]
pub struct RegistrySearch {
  client:  reqwest::Client,
  /// Works search endpoint
  url:     String,
  /// Sleep applied once after a `429` response
  backoff: Duration,
}

impl RegistrySearch {
  /// Creates a search client from the registry configuration.
  pub fn from_config(config: &RegistryConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(config.user_agent.as_str())
      .timeout(config.timeout())
      .build()?;
    Ok(Self { client, url: config.search_url.clone(), backoff: config.rate_limit_backoff() })
  }

  /// Searches for a DOI by title, optionally narrowed by an author name.
  ///
  /// Returns the DOI of the first returned work, or `None` when the registry returned no works,
  /// the first work carries no DOI, or the registry rate limited us.
  ///
  /// # Errors
  ///
  /// Returns an error when the request fails, the registry answers with another error status, or
  /// the body is not the expected JSON.
  pub async fn search_doi_by_title(&self, title: &str, author: Option<&str>) -> Result<Option<Doi>> {
    let mut query = vec![("query.title", title), ("rows", "1")];
    if let Some(author) = author.filter(|author| !author.is_empty()) {
      query.push(("query.author", author));
    }

    debug!("Searching {} for title {:?}", self.url, title);
    let response = self
      .client
      .get(&self.url)
      .header(reqwest::header::ACCEPT, "application/json")
      .query(&query)
      .send()
      .await?;

    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
      error!("Rate limit triggered, backing off for {:?}", self.backoff);
      tokio::time::sleep(self.backoff).await;
      return Ok(None);
    }

    if !response.status().is_success() {
      return Err(LitkeepError::ApiError(format!(
        "registry search returned status {}",
        response.status()
      )));
    }

    let body: Value = response.json().await?;
    trace!("Registry search response: {}", body);
    Ok(first_doi(&body))
  }
}

/// DOI of the first work in a works response (`message.items[0].DOI`).
fn first_doi(body: &Value) -> Option<Doi> {
  body
    .get("message")?
    .get("items")?
    .as_array()?
    .first()?
    .get("DOI")?
    .as_str()
    .filter(|doi| !doi.trim().is_empty())
    .map(Doi::new)
}
