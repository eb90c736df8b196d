//! Host allow-list for the Follow operator.

use std::collections::BTreeSet;

use url::Url;

const WILDCARD: &str = "*";

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Set of host tokens permitted for document following.
///
/// Tokens are either `"*"` (wildcard), a bare hostname (matches the
/// scheme's default port only), or `"hostname:port"` (matches exactly that
/// pair). Cheap to clone; a child [`crate::Context`] starts from the
/// parent's set and mutations on the child never affect the parent (the
/// copy-on-write semantics fall naturally out of `Clone` on a `BTreeSet`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedHosts {
    tokens: BTreeSet<String>,
}

impl AllowedHosts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the set with the host of `url`, using the `hostname:port` form
    /// iff the URL carries an explicit non-default port.
    #[must_use]
    pub fn from_initial_url(url: &Url) -> Self {
        let mut set = Self::new();
        if let Some(host) = url.host_str() {
            let scheme_default = default_port(url.scheme());
            let needs_port = match (url.port(), scheme_default) {
                (Some(p), Some(d)) => p != d,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if needs_port {
                set.tokens.insert(format!("{host}:{}", url.port().unwrap()));
            } else {
                set.tokens.insert(host.to_string());
            }
        }
        set
    }

    pub fn allow_one(&mut self, token: impl Into<String>) {
        self.tokens.insert(token.into());
    }

    pub fn allow_many<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for t in tokens {
            self.allow_one(t);
        }
    }

    pub fn allow_wildcard(&mut self) {
        self.tokens.insert(WILDCARD.to_string());
    }

    /// Decision procedure for whether `url`'s host is permitted.
    #[must_use]
    pub fn allows(&self, url: &Url) -> bool {
        if self.tokens.contains(WILDCARD) {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let default = default_port(url.scheme());
        let port = url.port();
        let uses_default = match (port, default) {
            (Some(p), Some(d)) => p == d,
            (None, _) => true,
            (Some(_), None) => false,
        };
        if uses_default {
            self.tokens.contains(host)
        } else {
            let candidate = format!("{host}:{}", port.expect("non-default port implies Some"));
            self.tokens.contains(&candidate)
        }
    }
}
