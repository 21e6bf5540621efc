//! Host and path normalization for counter keys
//!
//! Malformed input never fails here: it maps to the `invalid-host` /
//! `invalid-path` sentinel buckets so the counting endpoint stays available.

use reqwest::Url;
use thiserror::Error;

use crate::core::constants::{DEFAULT_PATH_MAX_LEN, INVALID_HOST, INVALID_PATH};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlError {
    #[error("url is not a valid absolute URL: {0}")]
    Unparseable(String),
}

/// A page event target after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    /// Normalized host (counter key component)
    pub host: String,
    /// Normalized path (counter key component)
    pub path: String,
    /// Scheme and authority as the page reported them, for legacy referers
    pub origin: String,
}

impl PageTarget {
    /// Referer for the legacy provider, optionally with a trailing slash
    pub fn referer(&self, trailing_slash: bool) -> String {
        match (self.path.as_str(), trailing_slash) {
            ("/", true) => format!("{}/", self.origin),
            ("/", false) => self.origin.clone(),
            (path, true) => format!("{}{}/", self.origin, path),
            (path, false) => format!("{}{}", self.origin, path),
        }
    }
}

/// Parse a page URL reported by an embedding page
///
/// Returns `Ok(None)` for URLs that parse but cannot be counted (non-HTTP(S)
/// scheme, empty host). Those degrade to a zero response upstream.
pub fn parse_page_url(raw: &str, path_max_len: usize) -> Result<Option<PageTarget>, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Unparseable(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Ok(None);
    }

    let Some(raw_host) = url.host_str().filter(|h| !h.is_empty()) else {
        return Ok(None);
    };

    let host = normalize_host(raw_host);
    if host == INVALID_HOST {
        return Ok(None);
    }

    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), raw_host, port),
        None => format!("{}://{}", url.scheme(), raw_host),
    };

    Ok(Some(PageTarget {
        host,
        path: normalize_path_with_limit(url.path(), path_max_len),
        origin,
    }))
}

/// Strip scheme, credentials, `www.`, port, path, query and fragment; lower-case
pub fn normalize_host(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let rest = lowered
        .split_once("://")
        .map_or(lowered.as_str(), |(_, rest)| rest);

    let authority = rest
        .split(['/', '?', '#', '\\'])
        .next()
        .unwrap_or_default();
    let authority = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    let host = if let Some(v6) = authority.strip_prefix('[') {
        v6.split(']').next().unwrap_or_default()
    } else {
        authority.split(':').next().unwrap_or_default()
    };

    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = host.trim_end_matches('.');

    if host.is_empty() {
        INVALID_HOST.to_string()
    } else {
        host.to_string()
    }
}

/// Normalize a path with the default length cap
pub fn normalize_path(input: &str) -> String {
    normalize_path_with_limit(input, DEFAULT_PATH_MAX_LEN)
}

/// Normalize a path for keying
///
/// Leading slash enforced, query and fragment dropped, truncated to `max_len`
/// bytes on a char boundary, then trailing slash and `/index` /
/// `/index.html` suffixes stripped so a cut path keys like its slash-less form.
pub fn normalize_path_with_limit(input: &str, max_len: usize) -> String {
    let trimmed = input.trim();

    if is_local_file_path(trimmed) {
        return INVALID_PATH.to_string();
    }

    let path = trimmed.split(['?', '#']).next().unwrap_or_default();

    let mut normalized = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(path);

    truncate_on_char_boundary(&mut normalized, max_len.max(1));
    strip_terminal_segments(&mut normalized);
    normalized
}

/// Drive-letter prefixes (`C:\`, `c:/`, `/C:/`) and `file:` URLs
fn is_local_file_path(path: &str) -> bool {
    if path
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file:"))
    {
        return true;
    }
    let bytes = path.strip_prefix('/').unwrap_or(path).as_bytes();
    matches!(bytes, [letter, b':', rest @ ..]
        if letter.is_ascii_alphabetic() && (rest.is_empty() || matches!(rest[0], b'/' | b'\\')))
}

/// Drop trailing slashes and an `/index` suffix; the root stays `/`
fn strip_terminal_segments(path: &mut String) {
    let trimmed = path.trim_end_matches('/');
    let trimmed = trimmed
        .strip_suffix("/index.html")
        .or_else(|| trimmed.strip_suffix("/index"))
        .unwrap_or(trimmed);
    let end = trimmed.trim_end_matches('/').len();
    path.truncate(end.max(1));
}

fn truncate_on_char_boundary(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host_full_url() {
        assert_eq!(normalize_host("https://www.Example.com:8080/foo"), "example.com");
    }

    #[test]
    fn test_normalize_host_variants() {
        assert_eq!(normalize_host("example.com/"), "example.com");
        assert_eq!(normalize_host("WWW.blog.example.com"), "blog.example.com");
        assert_eq!(normalize_host("http://user:pw@a.com:81?q=1"), "a.com");
        assert_eq!(normalize_host("http://[::1]:8080/"), "::1");
    }

    #[test]
    fn test_normalize_host_empty_is_sentinel() {
        assert_eq!(normalize_host(""), INVALID_HOST);
        assert_eq!(normalize_host("https:///path"), INVALID_HOST);
        assert_eq!(normalize_host("www."), INVALID_HOST);
    }

    #[test]
    fn test_normalize_path_basic() {
        assert_eq!(normalize_path("page"), "/page");
        assert_eq!(normalize_path("/page/"), "/page");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("//"), "/");
    }

    #[test]
    fn test_normalize_path_index_suffix() {
        assert_eq!(normalize_path("/blog/index"), "/blog");
        assert_eq!(normalize_path("/blog/index.html"), "/blog");
        assert_eq!(normalize_path("/index"), "/");
        assert_eq!(normalize_path("/indexes"), "/indexes");
    }

    #[test]
    fn test_normalize_path_drops_query_and_fragment() {
        assert_eq!(normalize_path("/a/?utm=x#top"), "/a");
    }

    #[test]
    fn test_normalize_path_truncates_deterministically() {
        let long = format!("/{}", "a".repeat(500));
        let first = normalize_path(&long);
        assert_eq!(first.len(), DEFAULT_PATH_MAX_LEN);
        assert_eq!(first, normalize_path(&long));
        assert!(long.starts_with(&first));
    }

    #[test]
    fn test_normalize_path_truncates_on_char_boundary() {
        let path = format!("/{}", "é".repeat(10));
        let truncated = normalize_path_with_limit(&path, 4);
        assert_eq!(truncated, "/é");
    }

    #[test]
    fn test_normalize_path_truncation_never_leaves_trailing_slash() {
        let path = format!("/{}/b", "a".repeat(198));
        let normalized = normalize_path(&path);
        assert_eq!(normalized, format!("/{}", "a".repeat(198)));
        assert_eq!(normalized, normalize_path(&format!("/{}", "a".repeat(198))));

        let path = format!("/{}/index/more", "a".repeat(193));
        assert_eq!(normalize_path(&path), format!("/{}", "a".repeat(193)));
    }

    #[test]
    fn test_normalize_path_multibyte_input() {
        assert_eq!(normalize_path("/abcé"), "/abcé");
        assert_eq!(normalize_path("é"), "/é");
        assert_eq!(normalize_path("/日本語/"), "/日本語");
        assert_eq!(normalize_path("fileé"), "/fileé");
    }

    #[test]
    fn test_local_file_paths_are_sentinel() {
        assert_eq!(normalize_path("C:\\Users\\me\\page.html"), INVALID_PATH);
        assert_eq!(normalize_path("d:/site/index.html"), INVALID_PATH);
        assert_eq!(normalize_path("/C:/site/page"), INVALID_PATH);
        assert_eq!(normalize_path("file:///home/me/page.html"), INVALID_PATH);
        assert_eq!(normalize_path("/ab:c"), "/ab:c");
    }

    #[test]
    fn test_parse_page_url() {
        let target = parse_page_url("https://www.A.com/x/?ref=1", 200)
            .unwrap()
            .unwrap();
        assert_eq!(target.host, "a.com");
        assert_eq!(target.path, "/x");
        assert_eq!(target.origin, "https://www.a.com");
        assert_eq!(target.referer(false), "https://www.a.com/x");
        assert_eq!(target.referer(true), "https://www.a.com/x/");
    }

    #[test]
    fn test_parse_page_url_keeps_port_in_origin() {
        let target = parse_page_url("http://a.com:8080/", 200).unwrap().unwrap();
        assert_eq!(target.host, "a.com");
        assert_eq!(target.path, "/");
        assert_eq!(target.referer(false), "http://a.com:8080");
        assert_eq!(target.referer(true), "http://a.com:8080/");
    }

    #[test]
    fn test_parse_page_url_unsupported_is_none() {
        assert_eq!(parse_page_url("ftp://a.com/x", 200), Ok(None));
        assert_eq!(parse_page_url("file:///C:/site/x.html", 200), Ok(None));
        assert_eq!(parse_page_url("mailto:me@a.com", 200), Ok(None));
    }

    #[test]
    fn test_parse_page_url_unparseable_is_error() {
        assert!(parse_page_url("not a url", 200).is_err());
        assert!(parse_page_url("/relative/path", 200).is_err());
    }
}
