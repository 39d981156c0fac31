//! Reading notes.
//!
//! A note is a markdown skeleton pre-filled with the paper's title, its formatted BibTeX record and
//! the date the note was started. Users may bring their own template using the `{{title}}`,
//! `{{bibtex}}` and `{{date}}` placeholders; every occurrence of each is replaced.

use chrono::{Datelike, Local, NaiveDate};

use super::*;

/// Placeholder replaced by the paper title.
pub const TITLE_PLACEHOLDER: &str = "{{title}}";
/// Placeholder replaced by the formatted BibTeX record.
pub const BIBTEX_PLACEHOLDER: &str = "{{bibtex}}";
/// Placeholder replaced by the note date.
pub const DATE_PLACEHOLDER: &str = "{{date}}";

const BUILT_IN_TEMPLATE: &str = "---
start date: {{date}}
end date: //
tags:
  -
---
# {{title}}

```bibtex
{{bibtex}}
```

## Background, Motivation and Objectives

### Background

### Motivation

### Objectives

## Literature Review

## Research Questions

## Methods

### Materials

### Experimental Design

### Measurements

## Results

## Discussion
";

/// Date as `YYYY/M/D`, without zero padding.
pub fn format_date(date: NaiveDate) -> String {
  format!("{}/{}/{}", date.year(), date.month(), date.day())
}

/// Renders notes from a user template or the built-in one.
#[derive(Debug, Clone, Default)]
pub struct NoteRenderer {
  template: Option<PathBuf>,
}

impl NoteRenderer {
  /// Creates a renderer using the template at `template`, if any.
  pub fn new(template: Option<PathBuf>) -> Self { Self { template } }

  /// Renders the note for a record, dated `date`.
  ///
  /// An unreadable template is logged and the built-in template is used instead.
  pub fn render(&self, record: &str, title: &str, date: NaiveDate) -> String {
    let template = self.template.as_deref().and_then(|path| match std::fs::read_to_string(path) {
      Ok(template) => Some(template),
      Err(e) => {
        error!("Failed to read template file {}: {}", path.display(), e);
        None
      },
    });

    template
      .as_deref()
      .unwrap_or(BUILT_IN_TEMPLATE)
      .replace(TITLE_PLACEHOLDER, title)
      .replace(BIBTEX_PLACEHOLDER, record)
      .replace(DATE_PLACEHOLDER, &format_date(date))
  }

  /// Renders the note dated today, in local time.
  pub fn render_today(&self, record: &str, title: &str) -> String {
    self.render(record, title, Local::now().date_naive())
  }
}
