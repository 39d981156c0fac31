//! DOI discovery.
//!
//! A DOI is looked for directly in the extracted text first. Only when none is found does the
//! [`IdentifierResolver`] go the long way round: ask the language model for the paper's title,
//! then ask the registry which DOI belongs to that title.
//!
//! # Examples
//!
//! ```
//! use litkeep::identifier::find_doi;
//!
//! let text = "Published online. https://doi.org/10.1007/s10701-006-9079-2. All rights reserved";
//! assert_eq!(find_doi(text).unwrap().as_str(), "10.1007/s10701-006-9079-2");
//! assert!(find_doi("no identifier in here").is_none());
//! ```

use super::*;
use crate::{llm::TitleExtractor, search::RegistrySearch};

lazy_static! {
  /// `10.<registrant>(.<sub>)*/<suffix>`, matched greedily.
  ///
  /// The suffix class contains every ASCII letter, so a greedy match can never end right before
  /// one; a DOI glued to the next word by PDF layout collapse is taken whole rather than split.
  static ref DOI_PATTERN: Regex =
    Regex::new(r"10\.[0-9]{4,}(?:\.[0-9]+)*/[-._;()/:a-zA-Z0-9]+").unwrap();
  static ref TRAILING_PUNCTUATION: Regex = Regex::new(r"[^\w/-]+$").unwrap();
}

/// A Digital Object Identifier, e.g. `10.1145/1327452.1327492`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Doi(String);

impl Doi {
  /// Wraps a DOI string as returned by a registry, trimming surrounding whitespace.
  pub fn new(doi: impl Into<String>) -> Self { Self(doi.into().trim().to_string()) }

  /// The DOI as a string slice.
  pub fn as_str(&self) -> &str { &self.0 }
}

impl Display for Doi {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// Finds the first DOI in `text`.
///
/// Trailing punctuation picked up from the surrounding prose (a closing parenthesis, a full stop)
/// is stripped from the match.
pub fn find_doi(text: &str) -> Option<Doi> {
  let found = DOI_PATTERN.find(text)?;
  let doi = TRAILING_PUNCTUATION.replace(found.as_str(), "");
  trace!("Matched DOI {:?} (cleaned to {:?})", found.as_str(), doi);
  Some(Doi(doi.into_owned()))
}

/// Finds a DOI for a document whose text does not contain one.
pub struct IdentifierResolver {
  /// Title lookup capability, resolved once at construction
  titles: TitleExtractor,
  /// Registry used to map titles to DOIs
  search: RegistrySearch,
}

impl IdentifierResolver {
  /// Creates a resolver from its two collaborators.
  pub fn new(titles: TitleExtractor, search: RegistrySearch) -> Self { Self { titles, search } }

  /// Looks up a DOI from a first-page excerpt: title via the language model, then DOI via the
  /// registry.
  ///
  /// There is no further fallback: an unconfigured or failing language model ends the lookup,
  /// and so does an empty, failed or rate limited registry search.
  pub async fn resolve_by_title(&self, excerpt: &str) -> std::result::Result<Doi, FailureReason> {
    let title = self.titles.extract_title(excerpt).await.map_err(|e| {
      error!("Failed to extract title: {}", e);
      FailureReason::TitleUnavailable(e.to_string())
    })?;
    debug!("Language model suggested title {:?}", title);

    match self.search.search_doi_by_title(&title, None).await {
      Ok(Some(doi)) => {
        info!("Found DOI {} for title {:?}", doi, title);
        Ok(doi)
      },
      Ok(None) => {
        error!("No DOI found for title: {}", title);
        Err(FailureReason::DoiNotResolved(title))
      },
      Err(e) => {
        error!("DOI search failed for title {:?}: {}", title, e);
        Err(FailureReason::DoiNotResolved(title))
      },
    }
  }
}
