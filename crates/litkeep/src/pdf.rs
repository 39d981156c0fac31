//! Plain text extraction from PDF documents.
//!
//! Only the front matter is interesting: title, DOI and abstract almost always sit on the first
//! pages, so extraction stops after a fixed number of leading pages. Extraction never fails
//! loudly. An unreadable document yields empty text and an error log, and callers treat empty
//! text as the end of the road for that document.

use lopdf::Document;

use super::*;

/// Number of leading pages read by default.
pub const DEFAULT_PAGE_LIMIT: usize = 3;

/// Source of plain text for a document.
pub trait TextExtractor: Send + Sync {
  /// Text of the leading pages of the document at `path`, in page order.
  ///
  /// Returns an empty string when the document cannot be read or holds no text.
  fn extract_text(&self, path: &Path) -> String;

  /// At most `chars` characters from the start of the first page.
  fn first_page_excerpt(&self, path: &Path, chars: usize) -> String;
}

/// [`TextExtractor`] backed by `lopdf`.
#[derive(Debug, Clone, Copy)]
pub struct PdfTextExtractor {
  page_limit: usize,
}

impl Default for PdfTextExtractor {
  fn default() -> Self { Self { page_limit: DEFAULT_PAGE_LIMIT } }
}

impl PdfTextExtractor {
  /// Creates an extractor reading at most `page_limit` pages (at least one).
  pub fn new(page_limit: usize) -> Self { Self { page_limit: page_limit.max(1) } }

  fn read_pages(&self, path: &Path, limit: usize) -> Result<String> {
    let document = Document::load(path)?;
    let pages: Vec<u32> = document.get_pages().keys().take(limit).copied().collect();
    trace!("Reading pages {:?} of {}", pages, path.display());
    Ok(document.extract_text(&pages)?)
  }
}

impl TextExtractor for PdfTextExtractor {
  fn extract_text(&self, path: &Path) -> String {
    match self.read_pages(path, self.page_limit) {
      Ok(text) => {
        debug!("Extracted {} characters from {}", text.len(), path.display());
        text
      },
      Err(e) => {
        error!("Failed to extract text from {}: {}", path.display(), e);
        String::new()
      },
    }
  }

  fn first_page_excerpt(&self, path: &Path, chars: usize) -> String {
    match self.read_pages(path, 1) {
      Ok(text) => text.chars().take(chars).collect(),
      Err(e) => {
        error!("Failed to read first page of {}: {}", path.display(), e);
        String::new()
      },
    }
  }
}

/// Writes a minimal text PDF with one page per entry of `pages`.
#[cfg(test)]
pub(crate) fn write_test_pdf(path: &Path, pages: &[&str]) -> Result<()> {
  use lopdf::{
    content::{Content, Operation},
    dictionary, Object, Stream,
  };

  let mut document = Document::with_version("1.5");
  let pages_id = document.new_object_id();
  let font_id = document.add_object(dictionary! {
    "Type" => "Font",
    "Subtype" => "Type1",
    "BaseFont" => "Courier",
  });
  let resources_id = document.add_object(dictionary! {
    "Font" => dictionary! { "F1" => font_id },
  });

  let mut kids = Vec::new();
  for text in pages {
    let content = Content {
      operations: vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
        Operation::new("Tj", vec![Object::string_literal(*text)]),
        Operation::new("ET", vec![]),
      ],
    };
    let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = document.add_object(dictionary! {
      "Type" => "Page",
      "Parent" => pages_id,
      "Contents" => content_id,
      "Resources" => resources_id,
      "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    kids.push(Object::from(page_id));
  }

  let count = kids.len() as i64;
  document.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => kids,
      "Count" => count,
    }),
  );
  let catalog_id = document.add_object(dictionary! {
    "Type" => "Catalog",
    "Pages" => pages_id,
  });
  document.trailer.set("Root", catalog_id);
  document.save(path)?;
  Ok(())
}
