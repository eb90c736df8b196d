//! Converts `(url, chunk_size, sheet)` into a lazy entry stream via
//! sequential `offset`/`limit` pagination.

use futures_util::Stream;
use url::Url;

use crate::context::Context;
use crate::decode::decode_page;
use crate::entry::Entry;
use crate::error::Error;

/// Builds the page-fetch URL: the base URL plus `offset`/`limit`[`/sheet`]
/// query parameters, merged with any query string the base already carries
/// by normalising through `url::Url` rather than blind string concatenation.
fn page_url(base: &Url, offset: u64, chunk_size: u32, sheet_name: Option<&str>) -> Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("offset", &offset.to_string());
        pairs.append_pair("limit", &chunk_size.to_string());
        if let Some(sheet) = sheet_name {
            pairs.append_pair("sheet", sheet);
        }
    }
    url
}

/// Produces the lazy, stopping sequence of decoded entries across pages.
///
/// Pagination is strictly sequential: the next page's request is not built,
/// let alone issued, until the current page has been fetched and decoded.
/// Each page's `total` is recorded on `context` via [`Context::set_total`]
/// as soon as it is decoded, so `context.total()` reflects the most
/// recently observed value for the remainder of the run.
pub fn paged_stream(
    base_url: Url,
    context: Context,
) -> impl Stream<Item = Result<Entry, Error>> + Send {
    async_stream::try_stream! {
        let mut offset: u64 = 0;
        loop {
            let url = page_url(&base_url, offset, context.chunk_size(), context.sheet_name());
            let (body, meta) = context
                .http_client
                .fetch(url.as_str(), context.cache_policy())
                .await?;

            if !meta.is_success() {
                Err(Error::InvalidResponse(format!(
                    "page request to {url} failed with status {}",
                    meta.status_code
                )))?;
            }

            let page = decode_page(&body)?;
            context.set_total(page.total);
            if page.limit != u64::from(context.chunk_size()) {
                tracing::warn!(
                    requested = context.chunk_size(),
                    echoed = page.limit,
                    "server echoed a different page size than requested"
                );
            }

            let returned = page.data.len() as u64;
            for entry in page.data {
                yield entry;
            }

            if returned == 0 || offset + u64::from(context.chunk_size()) >= page.total {
                break;
            }
            offset += u64::from(context.chunk_size());
        }
    }
}
