//! Bounded-concurrency, order-preserving per-entry document enrichment.

use std::sync::Arc;

use futures_util::stream::FuturesOrdered;
use futures_util::{Stream, StreamExt};
use tokio::sync::Semaphore;
use url::Url;

use crate::context::Context;
use crate::entry::{Entry, EntryValue};
use crate::error::Error;
use crate::url_policy::resolve_follow_url;

/// Wraps `upstream` with the Follow operator.
///
/// Concurrency is bounded by a [`Semaphore`] sized to
/// `context.max_concurrency()`; ordering is preserved by
/// [`FuturesOrdered`], which buffers out-of-order completions and releases
/// them strictly in the order their futures were pushed: bounded
/// out-of-order completion, buffered, then released in dispatch order.
/// Dropping the returned stream (consumer cancellation) drops every
/// in-flight task still held by the `FuturesOrdered`, which cancels their
/// underlying HTTP requests; no further entries are produced and nothing
/// not yet started is reported as an error.
pub fn follow_stream(
    upstream: impl Stream<Item = Result<Entry, Error>> + Send + 'static,
    base_url: Url,
    context: Context,
    src_field: String,
    dst_field: Option<String>,
) -> impl Stream<Item = Result<Entry, Error>> + Send {
    let dst_field = dst_field.unwrap_or_else(|| src_field.clone());
    let semaphore = Arc::new(Semaphore::new(context.max_concurrency().max(1)));
    let base_url = Arc::new(base_url);
    let context = Arc::new(context);

    async_stream::try_stream! {
        let mut pending: FuturesOrdered<_> = FuturesOrdered::new();
        tokio::pin!(upstream);
        let mut upstream_exhausted = false;

        loop {
            // Keep the in-flight window full: pull from upstream whenever the
            // queue has room, else drain one completed follow from the front.
            // The queue cap bounds how far ahead of the semaphore we buffer;
            // the semaphore itself is what actually bounds concurrent fetches.
            if !upstream_exhausted && pending.len() < context.max_concurrency() {
                match upstream.next().await {
                    Some(Ok(entry)) => {
                        let permit_src = Arc::clone(&semaphore);
                        let base_url = Arc::clone(&base_url);
                        let context = Arc::clone(&context);
                        let src_field = src_field.clone();
                        let dst_field = dst_field.clone();
                        pending.push_back(async move {
                            let _permit = permit_src
                                .acquire_owned()
                                .await
                                .expect("semaphore is never closed");
                            dispatch(entry, &base_url, &context, &src_field, &dst_field).await
                        });
                        continue;
                    }
                    Some(Err(e)) => {
                        Err(e)?;
                    }
                    None => {
                        upstream_exhausted = true;
                    }
                }
            }

            match pending.next().await {
                Some(entry) => yield entry,
                None if upstream_exhausted => break,
                None => continue,
            }
        }
    }
}

/// Resolves, validates, fetches and parses the document referenced by
/// `entry[src_field]`, producing a new entry carrying either the parsed
/// document or a documented error string.
async fn dispatch(
    entry: Entry,
    base_url: &Url,
    context: &Context,
    src_field: &str,
    dst_field: &str,
) -> Entry {
    let error_field = format!("{dst_field}_error");

    let Some(raw_url) = entry.get_string(src_field) else {
        return entry.with(error_field, EntryValue::String("Missing or invalid URL".to_string()));
    };

    let Some(target) = resolve_follow_url(base_url, &raw_url) else {
        return entry.with(
            error_field,
            EntryValue::String(format!("Could not resolve URL: {raw_url}")),
        );
    };

    if !context.allowed_hosts().allows(&target) {
        let host = target.host_str().unwrap_or("").to_string();
        return entry.with(
            error_field,
            EntryValue::String(format!(
                "Host '{host}' is not allowed for document following. Use allow() to permit additional hostnames."
            )),
        );
    }

    tracing::trace!(url = %target, "follow: dispatching fetch");

    let (body, meta) = match context
        .http_client
        .fetch(target.as_str(), context.cache_policy())
        .await
    {
        Ok(pair) => pair,
        Err(Error::Network(detail)) => {
            tracing::warn!(url = %target, detail, "follow: network error");
            return entry.with(error_field, EntryValue::String(format!("Network error: {detail}")));
        }
        Err(Error::DocumentNotFound) => {
            tracing::warn!(url = %target, "follow: document not found");
            return entry.with(error_field, EntryValue::String("Document not found".to_string()));
        }
        Err(other) => {
            tracing::warn!(url = %target, error = %other, "follow: fetch failed");
            return entry.with(error_field, EntryValue::String(other.to_string()));
        }
    };

    if !meta.is_success() {
        return entry.with(
            error_field,
            EntryValue::String(format!("HTTP error {}", meta.status_code)),
        );
    }

    match context.html_parser.parse(&body) {
        Ok(doc) => entry.with(dst_field, EntryValue::Document(doc)),
        Err(e) => {
            tracing::warn!(url = %target, error = %e, "follow: HTML parse error");
            entry.with(error_field, EntryValue::String(format!("HTML parsing error: {e}")))
        }
    }
}
