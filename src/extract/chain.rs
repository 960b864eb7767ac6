//! Ordered fallback strategies per field.
//!
//! Every source renders the same logical field under different markup
//! depending on template version. A [`FieldChain`] lists the candidates
//! most reliable first and keeps the first one that yields a non-empty,
//! trimmed string.
//!
//! ```
//! use rust_media_scraper::extract::FieldChain;
//! use scraper::Html;
//!
//! let doc = Html::parse_document(r#"<div class="entry-title">Naruto</div>"#);
//! let title = FieldChain::new("title")
//!     .text("h1.entry-title")
//!     .text("div.entry-title")
//!     .resolve_doc(&doc);
//! assert_eq!(title, "Naruto");
//! ```

use super::text::{clean_text, element_text};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

type Strategy = Box<dyn for<'a> Fn(ElementRef<'a>) -> Option<String> + Send + Sync>;

fn parse_selector(field: &str, selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            log::warn!("Skipping invalid selector {:?} for {}: {:?}", selector, field, e);
            None
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let s = clean_text(&s);
    (!s.is_empty()).then_some(s)
}

pub struct FieldChain {
    field: &'static str,
    strategies: Vec<(String, Strategy)>,
    default: String,
}

impl FieldChain {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
            default: String::new(),
        }
    }

    /// Text content of the first element matching `selector`
    pub fn text(self, selector: &str) -> Self {
        let Some(sel) = parse_selector(self.field, selector) else {
            return self;
        };
        self.push(selector.to_string(), move |scope| {
            scope.select(&sel).map(element_text).find(|t| !t.is_empty())
        })
    }

    /// First non-empty value of `attr` on elements matching `selector`
    pub fn attr(self, selector: &str, attr: &'static str) -> Self {
        self.attrs(selector, &[attr])
    }

    /// Like [`attr`](Self::attr) but tries several attributes per element,
    /// e.g. lazy-loaded images carrying `data-src` before `src`.
    pub fn attrs(self, selector: &str, attrs: &[&'static str]) -> Self {
        let Some(sel) = parse_selector(self.field, selector) else {
            return self;
        };
        let attrs = attrs.to_vec();
        let label = format!("{}@{}", selector, attrs.join("|"));
        self.push(label, move |scope| {
            scope.select(&sel).find_map(|el| {
                attrs
                    .iter()
                    .filter_map(|a| el.value().attr(a))
                    .map(|v| v.trim().to_string())
                    .find(|v| !v.is_empty())
            })
        })
    }

    /// Value of a `Label: value` row, e.g. `<span><b>Status:</b> Ongoing</span>`.
    /// `labels` are matched case-insensitively against the text before the colon.
    pub fn labelled(self, row_selector: &str, labels: &[&'static str]) -> Self {
        let Some(sel) = parse_selector(self.field, row_selector) else {
            return self;
        };
        let labels = labels.to_vec();
        let label = format!("{}[{}]", row_selector, labels.join("|"));
        self.push(label, move |scope| {
            scope.select(&sel).find_map(|row| {
                let text = element_text(row);
                let (key, value) = text.split_once(':')?;
                let key = key.trim().to_lowercase();
                labels
                    .iter()
                    .any(|l| key == *l)
                    .then(|| value.trim().to_string())
            })
        })
    }

    /// Arbitrary strategy for values that need more than one selector.
    pub fn with_fn<F>(self, label: &str, f: F) -> Self
    where
        F: for<'a> Fn(ElementRef<'a>) -> Option<String> + Send + Sync + 'static,
    {
        self.push(label.to_string(), f)
    }

    /// Value returned when every strategy comes up empty
    pub fn or_default(mut self, default: &str) -> Self {
        self.default = default.to_string();
        self
    }

    fn push<F>(mut self, label: String, f: F) -> Self
    where
        F: for<'a> Fn(ElementRef<'a>) -> Option<String> + Send + Sync + 'static,
    {
        self.strategies.push((label, Box::new(f)));
        self
    }

    pub fn find(&self, scope: ElementRef<'_>) -> Option<String> {
        for (label, strategy) in &self.strategies {
            if let Some(value) = strategy(scope).and_then(non_empty) {
                log::debug!("{} resolved by {}", self.field, label);
                return Some(value);
            }
        }
        None
    }

    pub fn resolve(&self, scope: ElementRef<'_>) -> String {
        self.find(scope).unwrap_or_else(|| self.default.clone())
    }

    pub fn find_doc(&self, doc: &Html) -> Option<String> {
        self.find(doc.root_element())
    }

    pub fn resolve_doc(&self, doc: &Html) -> String {
        self.resolve(doc.root_element())
    }
}

/// Ordered selectors for multi-valued fields such as genres. The first
/// selector that matches anything wins; values are de-duplicated.
pub struct ListChain {
    field: &'static str,
    selectors: Vec<(String, Selector)>,
}

impl ListChain {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            selectors: Vec::new(),
        }
    }

    pub fn text(mut self, selector: &str) -> Self {
        if let Some(sel) = parse_selector(self.field, selector) {
            self.selectors.push((selector.to_string(), sel));
        }
        self
    }

    pub fn resolve(&self, scope: ElementRef<'_>) -> Vec<String> {
        for (label, sel) in &self.selectors {
            let mut seen = HashSet::new();
            let values: Vec<String> = scope
                .select(sel)
                .map(element_text)
                .filter(|t| !t.is_empty() && seen.insert(t.clone()))
                .collect();
            if !values.is_empty() {
                log::debug!("{} resolved by {}", self.field, label);
                return values;
            }
        }
        Vec::new()
    }

    pub fn resolve_doc(&self, doc: &Html) -> Vec<String> {
        self.resolve(doc.root_element())
    }
}
