//! Paper metadata as read back from a BibTeX record.
//!
//! [`PaperInfo`] is produced once by [`bibtex::parse_record`](crate::bibtex::parse_record) and is
//! never mutated afterwards. It is the input to citation key derivation and to note rendering.
//!
//! # Examples
//!
//! ```
//! use litkeep::bibtex::parse_record;
//!
//! let info = parse_record("@article{x, title = {Complex Structure}, year = {2006}}");
//! assert_eq!(info.title, "Complex Structure");
//! assert_eq!(info.year, "2006");
//! assert!(info.authors.is_empty());
//! assert!(info.keywords.is_none());
//! ```

use super::*;

/// Bibliographic metadata for a single paper.
///
/// Missing fields are represented as empty strings or an empty author list, never as errors:
/// key derivation has explicit fallbacks for every one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperInfo {
  /// The paper's title with BibTeX protection braces removed
  pub title:         String,
  /// Authors in record order, each as written in the record (e.g. `Kirilyuk, A.`)
  pub authors:       Vec<String>,
  /// Four digit publication year, or empty when the record has none
  pub year:          String,
  /// The raw record this information was parsed from
  pub bibtex:        String,
  /// Keywords, present only when the record carries a `keywords` field
  pub keywords:      Option<Vec<String>>,
  /// Abstract text, empty when the record carries none
  pub abstract_text: String,
}

impl PaperInfo {
  /// Derives the citation key for this paper.
  ///
  /// Shorthand for [`CitationKey::derive`] over this paper's title, authors and year.
  pub fn citation_key(&self) -> CitationKey {
    CitationKey::derive(&self.title, &self.authors, &self.year)
  }
}
