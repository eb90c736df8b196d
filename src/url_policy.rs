//! URL validation and the Follow operator's reference resolver.
//!
//! Two distinct checks live here: "is this string usable as a URL at all"
//! (the validator) and "what absolute URL does this entry field refer to,
//! given a base" (the resolver, Follow-only).

use url::Url;

use crate::error::{Error, Result};

/// Which caller is running the validator — only the Follow operator is
/// allowed to pass an absolute path with no scheme, because only it has a
/// base URL to resolve one against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext {
    Construction,
    Follow,
}

/// Rejects URL strings before any I/O is attempted.
pub fn validate(input: &str, ctx: ValidationContext) -> Result<()> {
    // 1. empty or whitespace-only
    if input.trim().is_empty() {
        return Err(Error::invalid_url(input));
    }
    // 2. javascript: pseudo-scheme (case-insensitive)
    if input.to_lowercase().starts_with("javascript:") {
        return Err(Error::invalid_url(input));
    }
    // 3. literal sentinels / bare scheme separator
    if input == "://missing-scheme" || input == "http://" || input.starts_with("://") {
        return Err(Error::invalid_url(input));
    }
    let has_scheme_sep = input.contains("://");
    let is_absolute_path = input.starts_with('/');
    // 4. neither absolute-URL nor absolute-path
    if !has_scheme_sep && !is_absolute_path {
        return Err(Error::invalid_url(input));
    }
    // 5. embedded whitespace
    if input.chars().any(char::is_whitespace) {
        return Err(Error::invalid_url(input));
    }
    // 6. scheme must be http/https, unless Follow + absolute path
    if has_scheme_sep {
        let scheme = &input[..input.find("://").expect("has_scheme_sep checked above")];
        if scheme != "http" && scheme != "https" {
            return Err(Error::invalid_url(input));
        }
    } else if ctx != ValidationContext::Follow {
        return Err(Error::invalid_url(input));
    }
    Ok(())
}

/// Parses a validated, already-absolute URL string.
pub fn parse_absolute(input: &str) -> Result<Url> {
    validate(input, ValidationContext::Construction)?;
    Url::parse(input).map_err(|e| Error::invalid_url(format!("{input}: {e}")))
}

/// Resolves an entry's raw URL field against the Pipeline's base URL.
///
/// Reuses `url::Url::join`'s RFC 3986 reference-resolution for all three
/// reference forms (absolute URL, absolute path, relative path) rather than
/// branching on them by hand: `join` already treats an
/// absolute `http(s)://…` string as replacing the base outright, `/x` as
/// replacing the base's path, and `a/b` as relative to the base's
/// directory. Only the scheme of the *result* needs checking afterwards.
#[must_use]
pub fn resolve_follow_url(base: &Url, raw: &str) -> Option<Url> {
    if raw.trim().is_empty() {
        return None;
    }
    if raw.chars().any(char::is_whitespace) {
        return None;
    }
    if raw.to_lowercase().starts_with("javascript:") {
        return None;
    }
    let resolved = base.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_canonical_invalid_strings() {
        for s in [
            "",
            "   ",
            "javascript:alert(1)",
            "JavaScript:alert(1)",
            "://missing-scheme",
            "http://",
            "://x",
            "not-a-url",
            "ht tp://x.test",
            "ftp://x.test",
        ] {
            assert!(
                validate(s, ValidationContext::Construction).is_err(),
                "expected {s:?} to be rejected"
            );
        }
    }

    #[test]
    fn accepts_canonical_valid_strings() {
        for s in [
            "http://x.test",
            "https://x.test/path",
            "https://x.test:8443/path?q=1",
        ] {
            assert!(validate(s, ValidationContext::Construction).is_ok());
        }
    }

    #[test]
    fn absolute_path_only_valid_for_follow() {
        assert!(validate("/a/b", ValidationContext::Follow).is_ok());
        assert!(validate("/a/b", ValidationContext::Construction).is_err());
    }

    #[test]
    fn resolver_handles_all_three_forms() {
        let base = Url::parse("https://x.test/dir/index.json").unwrap();
        assert_eq!(
            resolve_follow_url(&base, "https://y.test/doc").unwrap().as_str(),
            "https://y.test/doc"
        );
        assert_eq!(
            resolve_follow_url(&base, "/abs/doc").unwrap().as_str(),
            "https://x.test/abs/doc"
        );
        assert_eq!(
            resolve_follow_url(&base, "rel/doc").unwrap().as_str(),
            "https://x.test/dir/rel/doc"
        );
        assert!(resolve_follow_url(&base, "javascript:alert(1)").is_none());
        assert!(resolve_follow_url(&base, "").is_none());
    }

    #[test]
    fn resolver_rejects_non_http_schemes() {
        let base = Url::parse("https://x.test/").unwrap();
        assert!(resolve_follow_url(&base, "mailto:a@b.test").is_none());
    }

    proptest::proptest! {
        #[test]
        fn empty_or_whitespace_strings_are_always_rejected(s in "[ \t]{0,8}") {
            proptest::prop_assert!(validate(&s, ValidationContext::Construction).is_err());
        }
    }
}
