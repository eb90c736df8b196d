//! Per-pipeline configuration (`Context`).

use std::sync::{Arc, Mutex};

use crate::hosts::AllowedHosts;
use crate::html_parser::HtmlParser;
use crate::http_client::HttpClient;

pub(crate) const DEFAULT_CHUNK_SIZE: u32 = 255;
pub(crate) const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Declarative per-request caching intent communicated to the [`HttpClient`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CachePolicy {
    /// Defer entirely to the HTTP client's own default behaviour.
    #[default]
    Default,
    /// Always fetch fresh; never read or write a cache.
    NoCache,
    /// Serve only from cache; fail rather than perform a network request.
    CacheOnly,
    /// Serve from cache if present, otherwise fetch and populate it.
    CacheElseLoad,
    /// Fine-grained override.
    Custom {
        max_age: Option<std::time::Duration>,
        ignore_server_cache_control: bool,
    },
}

/// Per-pipeline configuration bundle.
///
/// `http_client`/`html_parser` are
/// reference-shared (`Arc`) and never mutated by the pipeline; `allowed_hosts`
/// is the one field that is conceptually copy-on-write across an operator
/// chain — cloning a `Context` clones the `AllowedHosts` set by value, so a
/// child pipeline's `allow()` calls never reach back into the parent's set.
#[derive(Clone)]
pub struct Context {
    pub(crate) chunk_size: u32,
    pub(crate) cache_policy: CachePolicy,
    pub(crate) sheet_name: Option<String>,
    pub(crate) max_concurrency: usize,
    pub(crate) allowed_hosts: AllowedHosts,
    pub(crate) http_client: Arc<dyn HttpClient>,
    pub(crate) html_parser: Arc<dyn HtmlParser>,
    total: Arc<Mutex<Option<u64>>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("chunk_size", &self.chunk_size)
            .field("cache_policy", &self.cache_policy)
            .field("sheet_name", &self.sheet_name)
            .field("max_concurrency", &self.max_concurrency)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("total", &self.total())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub(crate) fn new(http_client: Arc<dyn HttpClient>, html_parser: Arc<dyn HtmlParser>) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_policy: CachePolicy::default(),
            sheet_name: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            allowed_hosts: AllowedHosts::new(),
            http_client,
            html_parser,
            total: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    #[must_use]
    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    #[must_use]
    pub fn cache_policy(&self) -> &CachePolicy {
        &self.cache_policy
    }

    #[must_use]
    pub fn allowed_hosts(&self) -> &AllowedHosts {
        &self.allowed_hosts
    }

    /// Last `total` observed from the server during streaming, if any.
    ///
    /// Backed by a shared cell so every `Context` cloned from the same
    /// pipeline (the paged producer's owned copy included) observes the
    /// same value; a fresh [`Context::new`] always starts with its own.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        *self.total.lock().expect("total mutex is never poisoned")
    }

    /// Records the most recently observed `total` from a page response.
    pub(crate) fn set_total(&self, total: u64) {
        *self.total.lock().expect("total mutex is never poisoned") = Some(total);
    }
}
