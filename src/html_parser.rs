//! The `HtmlParser` collaborator interface and its default `scraper`-backed
//! implementation.

use std::sync::Arc;

use scraper::Html;

use crate::error::Error;

/// An opaque parsed HTML document.
///
/// Wraps `scraper::Html` behind `Arc` so cloning a [`crate::Entry`] carrying
/// a parsed document (the output of `follow`) is cheap, and so the document
/// can be shared across tasks without re-parsing.
#[derive(Clone)]
pub struct DocumentHandle(Arc<Html>);

impl DocumentHandle {
    #[must_use]
    pub fn inner(&self) -> &Html {
        &self.0
    }

    #[must_use]
    pub fn root_text(&self) -> String {
        self.0.root_element().text().collect::<Vec<_>>().join("")
    }
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle").finish_non_exhaustive()
    }
}

impl PartialEq for DocumentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.html() == other.0.html()
    }
}

/// The HTML parsing collaborator the Follow operator delegates to.
///
/// Implementations MUST wrap any recoverable parse failure as
/// [`Error::Decoding`]; `scraper::Html::parse_document` itself never
/// returns an `Err` (malformed HTML degrades gracefully per the HTML5
/// parsing algorithm), so the default implementation below cannot fail in
/// practice but the trait still returns a `Result` for implementations
/// backed by stricter parsers.
pub trait HtmlParser: Send + Sync {
    fn parse(&self, html: &str) -> Result<DocumentHandle, Error>;
}

/// Default [`HtmlParser`] backed by `scraper` (html5ever under the hood).
///
/// `scraper::Html` is built from owned input and holds no borrowed state,
/// so this implementation is inherently safe to call concurrently from
/// multiple Follow tasks without any internal locking, matching the
/// thread-safety the default implementation needs to provide.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperHtmlParser;

impl ScraperHtmlParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HtmlParser for ScraperHtmlParser {
    fn parse(&self, html: &str) -> Result<DocumentHandle, Error> {
        Ok(DocumentHandle(Arc::new(Html::parse_document(html))))
    }
}
