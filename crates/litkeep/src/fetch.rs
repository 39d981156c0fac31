//! BibTeX retrieval from the DOI resolver.
//!
//! The resolver does content negotiation: asking for `application/x-bibtex` returns the record in
//! BibTeX syntax. An unknown DOI is not always signalled by status code; the resolver may serve
//! its HTML "DOI Not Found" page with a `200`, so the body is inspected as well.

use super::*;

/// Default DOI resolver.
pub const DEFAULT_DOI_URL: &str = "http://dx.doi.org";

/// Marker embedded in the resolver's "unknown DOI" page.
const NOT_FOUND_MARKER: &str = "DOI Not Found";

/// Client for the DOI resolver.
#[derive(Debug, Clone)]
pub struct DoiResolver {
  client:   reqwest::Client,
  /// Resolver base URL, without trailing slash
  base_url: String,
}

impl DoiResolver {
  /// Creates a resolver client from the registry configuration.
  pub fn from_config(config: &RegistryConfig) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
    Ok(Self { client, base_url: config.doi_url.trim_end_matches('/').to_string() })
  }

  /// Fetches the raw BibTeX record for `doi`. One attempt, no retries.
  ///
  /// # Errors
  ///
  /// - [`LitkeepError::DoiNotFound`] when the body is the resolver's "DOI Not Found" page,
  ///   whatever the status code
  /// - [`LitkeepError::ApiError`] for any other error status or an empty body
  /// - [`LitkeepError::Network`] when the request fails
  pub async fn fetch_by_doi(&self, doi: &Doi) -> Result<String> {
    let url = format!("{}/{}", self.base_url, doi);
    debug!("Fetching BibTeX via {}", url);

    let response =
      self.client.get(&url).header(reqwest::header::ACCEPT, "application/x-bibtex").send().await?;
    let status = response.status();
    let body = response.text().await?;
    trace!("DOI resolver response ({}): {}", status, body);

    if body.contains(NOT_FOUND_MARKER) {
      error!("DOI {} not found", doi);
      return Err(LitkeepError::DoiNotFound(doi.to_string()));
    }

    if !status.is_success() {
      return Err(LitkeepError::ApiError(format!("DOI resolver returned status {status}")));
    }

    if body.trim().is_empty() {
      return Err(LitkeepError::ApiError("DOI resolver returned an empty record".to_string()));
    }

    Ok(body)
  }
}
