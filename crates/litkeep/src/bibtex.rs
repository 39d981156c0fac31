//! BibTeX parsing, re-keying and alignment.
//!
//! Records fetched from the DOI resolver carry a temporary key (e.g. `Kirilyuk_2006`) and are
//! usually laid out on a single line. This module turns them into stable, diff-friendly entries:
//!
//! 1. [`parse_record`] reads title, authors and year (plus abstract and keywords when present)
//! 2. [`CitationKey::derive`] builds `<surname><year><title word>` from them
//! 3. [`rewrite_key`] swaps the temporary key for the derived one
//! 4. [`format_record`] puts one field per line with names aligned to a fixed width
//!
//! [`normalize`] runs all four and is what the pipeline uses.
//!
//! # Examples
//!
//! ```
//! use litkeep::bibtex::normalize;
//!
//! let raw = "@article{tmp123, title={Complex Structure}, author={Kirilyuk, A. and Smith, B.}, \
//!            year={2006}}";
//! let normalized = normalize(raw)?;
//!
//! assert_eq!(normalized.key.as_str(), "kirilyuk2006complex");
//! assert_eq!(normalized.text.lines().next(), Some("@article{kirilyuk2006complex,"));
//! # Ok::<(), litkeep::error::LitkeepError>(())
//! ```

use super::*;

/// Width that field names are padded to before the `=`.
pub const FIELD_NAME_WIDTH: usize = 12;

/// Key reported by [`RekeyedRecord::key_label`] when a record has no key declaration.
pub const NO_KEY_FOUND: &str = "No key found";

/// Marker an upstream stage may hand over in place of a record.
pub const FAILED_MARKER: &str = "failed";

/// Fallback for a citation key component that cannot be derived.
const UNKNOWN: &str = "unknown";

/// Title words never used as the key's title component.
///
/// Changing this list changes generated keys, and therefore file names, for existing libraries.
const STOP_WORDS: [&str; 9] = ["a", "an", "the", "of", "in", "on", "for", "with", "to"];

lazy_static! {
  static ref KEY_DECLARATION: Regex = Regex::new(r"@\w+\{([^,]+),").unwrap();
  static ref YEAR_DIGITS: Regex = Regex::new(r"\d{4}").unwrap();
  static ref AUTHOR_SEPARATOR: Regex = Regex::new(r"\s+and\s+").unwrap();
  static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// A citation key of the form `<surname><year><title word>`.
///
/// Keys only ever contain lowercase ASCII letters and digits, and are a pure function of the
/// title, author list and year they were derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitationKey(String);

impl CitationKey {
  /// Derives a key from a paper's title, authors and year.
  ///
  /// - Surname: text before the first comma of the first author, or that author's last word
  ///   when there is no comma. Non-letters are dropped. Falls back to `unknown`.
  /// - Year: the digits of `year`, possibly empty.
  /// - Title word: the first word of the title that is not a stop word. Falls back to `unknown`.
  ///
  /// # Examples
  ///
  /// ```
  /// use litkeep::CitationKey;
  ///
  /// let authors = vec!["A. Kirilyuk".to_string()];
  /// let key = CitationKey::derive("The Complex Structure of Things", &authors, "2006");
  /// assert_eq!(key.as_str(), "kirilyuk2006complex");
  /// ```
  pub fn derive(title: &str, authors: &[String], year: &str) -> Self {
    let year: String = year.chars().filter(char::is_ascii_digit).collect();
    Self(format!("{}{}{}", surname(authors), year, title_word(title)))
  }

  /// The key as a string slice.
  pub fn as_str(&self) -> &str { &self.0 }

  /// File name for this key with the given extension, e.g. `kirilyuk2006complex.md`.
  pub fn file_name(&self, extension: &str) -> String {
    format!("{}.{}", self.0, extension.trim_start_matches('.'))
  }
}

impl Display for CitationKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

fn surname(authors: &[String]) -> String {
  let Some(first) = authors.first() else {
    return UNKNOWN.to_string();
  };

  let name = match first.split_once(',') {
    Some((family, _)) => family,
    None => first.split_whitespace().last().unwrap_or_default(),
  };

  let surname: String =
    name.chars().filter(char::is_ascii_alphabetic).map(|c| c.to_ascii_lowercase()).collect();
  if surname.is_empty() {
    UNKNOWN.to_string()
  } else {
    surname
  }
}

fn title_word(title: &str) -> String {
  title
    .to_lowercase()
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| !word.is_empty() && !STOP_WORDS.contains(word))
    .map(|word| word.chars().filter(char::is_ascii_alphanumeric).collect::<String>())
    .find(|word| !word.is_empty())
    .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Parses the metadata needed for key derivation and note rendering out of a raw record.
///
/// Field names are matched case-insensitively against the record's top-level fields only, so a
/// `title=` inside some other value (a URL query, say) is never mistaken for the title. Nothing
/// here fails: a field that is missing, or a record that cannot be split, comes back empty.
pub fn parse_record(raw: &str) -> PaperInfo {
  let fields = record_fields(raw);
  let field = |name: &str| {
    fields
      .iter()
      .find(|(field, _)| field.eq_ignore_ascii_case(name))
      .map(|(_, value)| clean_value(unwrap_value(value)))
  };

  let title = field("title").unwrap_or_default();

  let authors = field("author")
    .map(|value| {
      AUTHOR_SEPARATOR
        .split(&value)
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty())
        .collect()
    })
    .unwrap_or_default();

  let year = field("year")
    .and_then(|value| YEAR_DIGITS.find(&value).map(|m| m.as_str().to_string()))
    .unwrap_or_default();

  let abstract_text = field("abstract").unwrap_or_default();

  let keywords = field("keywords").map(|value| {
    value
      .split([',', ';'])
      .map(|keyword| keyword.trim().to_string())
      .filter(|keyword| !keyword.is_empty())
      .collect()
  });

  PaperInfo { title, authors, year, bibtex: raw.to_string(), keywords, abstract_text }
}

/// Top-level fields of a record, with or without a key declaration.
fn record_fields(raw: &str) -> Vec<(String, String)> {
  let body = match KEY_DECLARATION.find(raw) {
    Some(declaration) => &raw[declaration.end()..],
    None => raw
      .trim_start()
      .strip_prefix('@')
      .and_then(|rest| rest.split_once('{'))
      .map_or(raw, |(_, body)| body),
  };
  split_fields(body).unwrap_or_default()
}

/// Strips one level of `{...}` or `"..."` around a field value.
fn unwrap_value(value: &str) -> &str {
  let value = value.trim();
  value
    .strip_prefix('{')
    .and_then(|inner| inner.strip_suffix('}'))
    .or_else(|| value.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')))
    .unwrap_or(value)
}

/// Drops protective braces and collapses whitespace in a field value.
fn clean_value(value: &str) -> String {
  let unbraced = value.replace(['{', '}'], "");
  WHITESPACE.replace_all(unbraced.trim(), " ").into_owned()
}

/// A record whose temporary key has been looked at, and replaced when there was one.
#[derive(Debug, Clone)]
pub struct RekeyedRecord {
  /// The record text, re-keyed when a key declaration was found, untouched otherwise
  pub record: String,
  /// The derived key, or `None` when the record had no key declaration
  pub key:    Option<CitationKey>,
  /// Metadata parsed from the original record
  pub info:   PaperInfo,
}

impl RekeyedRecord {
  /// The derived key, or [`NO_KEY_FOUND`] when there was none.
  pub fn key_label(&self) -> &str { self.key.as_ref().map_or(NO_KEY_FOUND, CitationKey::as_str) }
}

/// Replaces a record's temporary key with its derived [`CitationKey`].
///
/// The original key is read from the first `@type{key,` declaration, and every occurrence of it
/// in the record is replaced, since registry records sometimes repeat their own key. A record
/// without a declaration is returned unmodified with `key` set to `None`.
///
/// # Errors
///
/// Returns [`LitkeepError::EmptyRecord`] for an empty record or the `failed` marker, without
/// attempting to parse it.
pub fn rewrite_key(raw: &str) -> Result<RekeyedRecord> {
  if is_failed(raw) {
    return Err(LitkeepError::EmptyRecord);
  }

  let info = parse_record(raw);
  let Some(original) = KEY_DECLARATION.captures(raw).and_then(|captures| captures.get(1)) else {
    warn!("No key declaration in record titled {:?}", info.title);
    return Ok(RekeyedRecord { record: raw.to_string(), key: None, info });
  };

  let key = info.citation_key();
  debug!("Re-keying {} as {}", original.as_str(), key);
  let record = raw.replace(original.as_str(), key.as_str());
  Ok(RekeyedRecord { record, key: Some(key), info })
}

fn is_failed(raw: &str) -> bool {
  let raw = raw.trim();
  raw.is_empty() || raw == FAILED_MARKER
}

/// A BibTeX entry split into its parts.
///
/// Values are kept verbatim, delimiters included (`{...}`, `"..."` or a bare word such as
/// `jan`), with runs of whitespace collapsed to single spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibtexEntry {
  /// Entry type without the `@`, e.g. `article`
  pub entry_type: String,
  /// Citation key
  pub key:        String,
  /// Field name and value pairs in record order
  pub fields:     Vec<(String, String)>,
}

impl BibtexEntry {
  /// Splits a record into entry type, key and fields.
  ///
  /// Fields are separated by commas at brace depth zero, so a `},` inside a nested value never
  /// splits a field. Anything after the entry's closing brace is ignored.
  ///
  /// # Errors
  ///
  /// - [`LitkeepError::EmptyRecord`] for an empty record or the `failed` marker
  /// - [`LitkeepError::MalformedRecord`] when there is no `@type{key` opening or a field has no `=`
  pub fn parse(raw: &str) -> Result<Self> {
    if is_failed(raw) {
      return Err(LitkeepError::EmptyRecord);
    }

    let start =
      raw.find('@').ok_or_else(|| LitkeepError::MalformedRecord("missing '@'".to_string()))?;
    let body = &raw[start + 1..];
    let open = body
      .find('{')
      .ok_or_else(|| LitkeepError::MalformedRecord("missing opening brace".to_string()))?;
    let entry_type = body[..open].trim().to_string();

    let body = &body[open + 1..];
    let key_end = body.find([',', '}']).unwrap_or(body.len());
    let key = body[..key_end].trim().to_string();
    if entry_type.is_empty() || key.is_empty() {
      return Err(LitkeepError::MalformedRecord("missing entry type or key".to_string()));
    }

    let fields = split_fields(body.get(key_end..).unwrap_or_default())?;
    Ok(Self { entry_type, key, fields })
  }

  /// Renders the entry with one field per line and names padded to [`FIELD_NAME_WIDTH`].
  ///
  /// ```text
  /// @article{kirilyuk2006complex,
  ///   title        = {Complex Structure},
  ///   year         = {2006}
  /// }
  /// ```
  pub fn to_aligned_string(&self) -> String {
    let mut lines = vec![format!("@{}{{{},", self.entry_type, self.key)];
    let last = self.fields.len().saturating_sub(1);
    for (index, (name, value)) in self.fields.iter().enumerate() {
      let separator = if index == last { "" } else { "," };
      lines.push(format!("  {name:<FIELD_NAME_WIDTH$} = {value}{separator}"));
    }
    lines.push("}".to_string());
    lines.join("\n")
  }
}

/// Splits `name = value` pairs separated by commas, up to the entry's closing brace.
fn split_fields(mut rest: &str) -> Result<Vec<(String, String)>> {
  let mut fields = Vec::new();
  loop {
    rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    if rest.is_empty() || rest.starts_with('}') {
      return Ok(fields);
    }

    let equals = rest.find('=').ok_or_else(|| {
      LitkeepError::MalformedRecord(format!("field without '=': {}", rest.trim()))
    })?;
    let name = rest[..equals].trim().to_string();
    if name.is_empty() || name.contains(['{', '}', ',']) {
      return Err(LitkeepError::MalformedRecord(format!("invalid field name: {name:?}")));
    }

    let value_text = &rest[equals + 1..];
    let value_end = value_end(value_text);
    let value = WHITESPACE.replace_all(value_text[..value_end].trim(), " ").into_owned();
    fields.push((name, value));
    rest = &value_text[value_end..];
  }
}

/// Byte index where a field value starts at `text` ends: the first comma or closing brace at
/// depth zero outside of a quoted string.
fn value_end(text: &str) -> usize {
  let mut depth = 0usize;
  let mut quoted = false;
  for (index, c) in text.char_indices() {
    match c {
      '"' if depth == 0 => quoted = !quoted,
      _ if quoted => {},
      '{' => depth += 1,
      '}' if depth == 0 => return index,
      '}' => depth -= 1,
      ',' if depth == 0 => return index,
      _ => {},
    }
  }
  text.len()
}

/// Aligns a record for storage: one field per line, names padded to [`FIELD_NAME_WIDTH`].
///
/// Every field line but the last ends with a comma and the closing brace sits on its own line.
/// Formatting is idempotent: formatting already formatted text returns it unchanged.
///
/// # Errors
///
/// See [`BibtexEntry::parse`].
pub fn format_record(raw: &str) -> Result<String> {
  Ok(BibtexEntry::parse(raw)?.to_aligned_string())
}

/// A record ready to be stored: re-keyed and aligned.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
  /// Aligned record text
  pub text: String,
  /// The record's citation key
  pub key:  CitationKey,
  /// Metadata parsed from the fetched record
  pub info: PaperInfo,
}

/// Re-keys and aligns a raw record in one go.
///
/// # Errors
///
/// - [`LitkeepError::EmptyRecord`] for an empty record or the `failed` marker
/// - [`LitkeepError::MissingKey`] when the record has no key declaration
/// - [`LitkeepError::MalformedRecord`] when the re-keyed record cannot be split into fields
pub fn normalize(raw: &str) -> Result<NormalizedRecord> {
  let rekeyed = rewrite_key(raw)?;
  let Some(key) = rekeyed.key.clone() else {
    error!("Cannot file record titled {:?}: {}", rekeyed.info.title, rekeyed.key_label());
    return Err(LitkeepError::MissingKey);
  };
  let RekeyedRecord { record, info, .. } = rekeyed;
  let text = format_record(&record)?;
  trace!("Normalized record:\n{}", text);
  Ok(NormalizedRecord { text, key, info })
}
