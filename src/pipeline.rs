//! The immutable, chainable [`Pipeline`] handle.

use std::sync::Arc;

use futures_util::{Stream, StreamExt, TryStreamExt};
use url::Url;

use crate::context::{CachePolicy, Context};
use crate::entry::Entry;
use crate::error::Error;
use crate::follow::follow_stream;
use crate::html_parser::{HtmlParser, ScraperHtmlParser};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::producer::paged_stream;
use crate::url_policy::{ValidationContext, parse_absolute};

type BoxedStream = std::pin::Pin<Box<dyn Stream<Item = Result<Entry, Error>> + Send>>;

/// The not-yet-executed, re-runnable handle at the centre of the crate.
///
/// A `Pipeline` owns its source URL, an independent [`Context`], and an
/// optional already-constructed upstream stream. Every operator
/// (`map`/`filter`/`limit`/`skip`/`slice`/`chunks`/`sheet`/`cache`/`allow`/
/// `follow`) consumes `self` by value and returns a new `Pipeline` —
/// nothing about the receiver is mutated, so `P.op(...)` never observably
/// alters `P`. Materialisation (page fetches, follow dispatch)
/// happens only inside the terminal collectors (`first`/`all`/`count`/
/// `for_each`); constructing or chaining a `Pipeline` performs no I/O.
pub struct Pipeline {
    base_url: Url,
    context: Context,
    upstream: Option<BoxedStream>,
}

impl Pipeline {
    /// Validates and constructs a `Pipeline` with default collaborators
    /// (`ReqwestHttpClient`, `ScraperHtmlParser`) and default `Context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` fails the validator.
    pub fn open(url: impl AsRef<str>) -> Result<Self, Error> {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let html_parser: Arc<dyn HtmlParser> = Arc::new(ScraperHtmlParser::new());
        Self::open_with(url, http_client, html_parser)
    }

    /// Same as [`Pipeline::open`] but with caller-supplied collaborators —
    /// the seam tests use to swap in fakes.
    pub fn open_with(
        url: impl AsRef<str>,
        http_client: Arc<dyn HttpClient>,
        html_parser: Arc<dyn HtmlParser>,
    ) -> Result<Self, Error> {
        let raw = url.as_ref();
        let parsed = parse_absolute(raw)?;
        let mut context = Context::new(http_client, html_parser);
        context.allowed_hosts = crate::hosts::AllowedHosts::from_initial_url(&parsed);
        Ok(Self {
            base_url: parsed,
            context,
            upstream: None,
        })
    }

    /// Constructs a `Pipeline` from an already-parsed URL.
    pub fn open_url(
        url: Url,
        http_client: Arc<dyn HttpClient>,
        html_parser: Arc<dyn HtmlParser>,
    ) -> Result<Self, Error> {
        parse_absolute(url.as_str())?;
        let mut context = Context::new(http_client, html_parser);
        context.allowed_hosts = crate::hosts::AllowedHosts::from_initial_url(&url);
        Ok(Self {
            base_url: url,
            context,
            upstream: None,
        })
    }

    /// Replaces `self`'s context, keeping `base_url`/`upstream` as-is. Every
    /// operator that only touches configuration (`chunks`/`sheet`/`cache`/
    /// `allow`/`max_concurrency`) goes through this instead of hand-building
    /// a new `Self`.
    fn with_context(self, context: Context) -> Self {
        Self { context, ..self }
    }

    /// Returns the pipeline's base URL, context, and upstream, attaching the
    /// paged producer first if no upstream is bound yet. Consumes `self`.
    /// The base URL is always handed back alongside the stream so a
    /// subsequent operator (in particular `follow`, which needs it to
    /// resolve relative targets) never loses it.
    fn materialize(self) -> (Url, Context, BoxedStream) {
        let Self {
            base_url,
            context,
            upstream,
        } = self;
        let stream =
            upstream.unwrap_or_else(|| Box::pin(paged_stream(base_url.clone(), context.clone())));
        (base_url, context, stream)
    }

    // ---- Stream operators ------------------------------------------------

    /// Applies `f` to every entry. Errors returned by `f` terminate the
    /// stream (wrapped as [`Error::OperationFailed`] if not already an
    /// [`Error`]).
    #[must_use]
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(Entry) -> Result<Entry, Error> + Send + Sync + 'static,
    {
        let (base_url, context, upstream) = self.materialize();
        let mapped = upstream.and_then(move |entry| {
            let result = f(entry);
            async move { result }
        });
        Self {
            base_url,
            context,
            upstream: Some(Box::pin(mapped)),
        }
    }

    /// Retains entries for which `p` returns true. Preserves relative
    /// order of retained entries.
    #[must_use]
    pub fn filter<F>(self, p: F) -> Self
    where
        F: Fn(&Entry) -> bool + Send + Sync + 'static,
    {
        let (base_url, context, upstream) = self.materialize();
        let filtered = upstream.try_filter(move |entry| {
            let keep = p(entry);
            async move { keep }
        });
        Self {
            base_url,
            context,
            upstream: Some(Box::pin(filtered)),
        }
    }

    /// Emits at most `n` entries. `n == 0` is an argument error.
    ///
    /// # Errors
    ///
    /// None directly — an `n == 0` call fails lazily: the returned
    /// pipeline's terminal collector will yield a single
    /// [`Error::OperationFailed`] item and stop.
    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        if n == 0 {
            return self.fail_lazily(Error::invalid_argument("limit(0) is not allowed; n must be >= 1"));
        }
        let (base_url, context, upstream) = self.materialize();
        let limited = upstream.take(n);
        Self {
            base_url,
            context,
            upstream: Some(Box::pin(limited)),
        }
    }

    /// Drops the first `n` entries.
    #[must_use]
    pub fn skip(self, n: usize) -> Self {
        let (base_url, context, upstream) = self.materialize();
        let skipped = upstream.skip(n);
        Self {
            base_url,
            context,
            upstream: Some(Box::pin(skipped)),
        }
    }

    /// Equivalent to `skip(start).limit(end - start)`. `start >= end` is an
    /// argument error.
    #[must_use]
    pub fn slice(self, start: usize, end: usize) -> Self {
        if start >= end {
            return self.fail_lazily(Error::invalid_argument(format!(
                "slice({start}, {end}) requires start < end"
            )));
        }
        self.skip(start).limit(end - start)
    }

    /// Sets the requested page size. Only affects the paged producer if no
    /// upstream is bound yet.
    #[must_use]
    pub fn chunks(self, size: u32) -> Self {
        if size == 0 {
            return self.fail_lazily(Error::invalid_argument("chunks(0) is not allowed; size must be >= 1"));
        }
        let mut context = self.context.clone();
        context.chunk_size = size;
        self.with_context(context)
    }

    /// Sets the `sheet=<name>` query parameter appended to every page
    /// request. Pure configuration.
    #[must_use]
    pub fn sheet(self, name: impl Into<String>) -> Self {
        let mut context = self.context.clone();
        context.sheet_name = Some(name.into());
        self.with_context(context)
    }

    /// Replaces the cache policy.
    #[must_use]
    pub fn cache(self, policy: CachePolicy) -> Self {
        let mut context = self.context.clone();
        context.cache_policy = policy;
        self.with_context(context)
    }

    /// Shortcut for `cache(CachePolicy::NoCache)`.
    #[must_use]
    pub fn no_cache(self) -> Self {
        self.cache(CachePolicy::NoCache)
    }

    /// Extends the allow-list with a single host token.
    #[must_use]
    pub fn allow(self, token: impl Into<String>) -> Self {
        let mut context = self.context.clone();
        context.allowed_hosts.allow_one(token);
        self.with_context(context)
    }

    /// Extends the allow-list with several host tokens at once.
    #[must_use]
    pub fn allow_many<I, S>(self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut context = self.context.clone();
        context.allowed_hosts.allow_many(tokens);
        self.with_context(context)
    }

    /// Shortcut for `allow("*")`.
    #[must_use]
    pub fn allow_all(self) -> Self {
        let mut context = self.context.clone();
        context.allowed_hosts.allow_wildcard();
        self.with_context(context)
    }

    /// Caps follow concurrency.
    #[must_use]
    pub fn max_concurrency(self, n: usize) -> Self {
        let mut context = self.context.clone();
        context.max_concurrency = n.max(1);
        self.with_context(context)
    }

    /// Enriches each entry with the fetched-and-parsed document referenced
    /// by `src_field`, writing the result to `dst_field` (default:
    /// `src_field`) or `<dst_field>_error` on failure.
    #[must_use]
    pub fn follow(self, src_field: impl Into<String>) -> Self {
        self.follow_into_field(src_field.into(), None)
    }

    /// Same as [`Pipeline::follow`] but writes the document to a field
    /// named `dst_field` instead of reusing `src_field`.
    #[must_use]
    pub fn follow_as(self, src_field: impl Into<String>, dst_field: impl Into<String>) -> Self {
        self.follow_into_field(src_field.into(), Some(dst_field.into()))
    }

    fn follow_into_field(self, src_field: String, dst_field: Option<String>) -> Self {
        let (base_url, context, upstream) = self.materialize();
        let followed = follow_stream(upstream, base_url.clone(), context.clone(), src_field, dst_field);
        Self {
            base_url,
            context,
            upstream: Some(Box::pin(followed)),
        }
    }

    fn fail_lazily(self, error: Error) -> Self {
        let base_url = self.base_url.clone();
        let context = self.context.clone();
        let stream = futures_util::stream::once(async move { Err(error) });
        Self {
            base_url,
            context,
            upstream: Some(Box::pin(stream)),
        }
    }

    // ---- Terminal collectors ----------------------------------------------

    /// Returns the first emitted entry, or `None` if the stream is empty.
    /// Stops the stream after one value — no further pages are fetched
    /// than necessary to produce it.
    pub async fn first(self) -> Result<Option<Entry>, Error> {
        let (_, _, mut stream) = self.materialize();
        match stream.next().await {
            Some(item) => Ok(Some(item?)),
            None => Ok(None),
        }
    }

    /// Collects every emitted entry into an ordered `Vec`.
    pub async fn all(self) -> Result<Vec<Entry>, Error> {
        let (_, _, stream) = self.materialize();
        stream.try_collect().await
    }

    /// Consumes the stream fully, returning the count of emitted entries.
    pub async fn count(self) -> Result<usize, Error> {
        let (_, _, mut stream) = self.materialize();
        let mut count = 0;
        while let Some(item) = stream.next().await {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Cooperative consumption loop; returns when the stream ends or
    /// `action` returns an error (which propagates as the stream error).
    pub async fn for_each<F>(self, mut action: F) -> Result<(), Error>
    where
        F: FnMut(Entry) -> Result<(), Error>,
    {
        let (_, _, mut stream) = self.materialize();
        while let Some(item) = stream.next().await {
            action(item?)?;
        }
        Ok(())
    }
}
