//! A lazy, chainable client for paginated JSON index endpoints (as produced
//! by AEM-style content delivery platforms), with an optional
//! document-follow stage that resolves, fetches, and parses HTML documents
//! referenced by entry fields.
//!
//! ```no_run
//! use aem_index_client::Pipeline;
//!
//! # async fn run() -> Result<(), aem_index_client::Error> {
//! let entries = Pipeline::open("https://example.com/content.json")?
//!     .chunks(100)
//!     .filter(|e| e.get_string("status").as_deref() == Some("published"))
//!     .all()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The pipeline is built from five pieces, each its own module: URL/host
//! security policy ([`url_policy`], [`hosts`]), the two swappable
//! collaborators ([`http_client`], [`html_parser`]), the wire-format
//! decoder ([`decode`]), the sequential page fetcher ([`producer`]), and the
//! bounded-concurrency enrichment stage ([`follow`]) — all composed behind
//! [`Pipeline`].

mod context;
mod decode;
mod entry;
mod error;
mod follow;
mod hosts;
mod html_parser;
mod http_client;
mod pipeline;
mod producer;
mod url_policy;

pub use context::CachePolicy;
pub use entry::{Entry, EntryValue};
pub use error::{Error, Result};
pub use html_parser::{DocumentHandle, HtmlParser, ScraperHtmlParser};
pub use hosts::AllowedHosts;
pub use http_client::{HttpClient, ReqwestHttpClient, ResponseMeta};
pub use pipeline::Pipeline;
