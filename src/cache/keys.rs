//! Cache key normalization.

use std::fmt;

use axum::http::Uri;

/// Normalized request target used as the identity of a cached page.
///
/// Query pairs are sorted as raw, still-encoded text so that
/// `/search?b=2&a=1` and `/search?a=1&b=2` share an entry while any two
/// targets that differ in more than pair order stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_uri(uri: &Uri) -> Self {
        Self::from_parts(uri.path(), uri.query())
    }

    pub fn from_parts(path: &str, query: Option<&str>) -> Self {
        let path = if path.is_empty() { "/" } else { path };
        match query.map(normalize_query) {
            Some(query) if !query.is_empty() => Self(format!("{path}?{query}")),
            _ => Self(path.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize_query(query: &str) -> String {
    let mut pairs: Vec<&str> = query.split('&').filter(|pair| !pair.is_empty()).collect();
    pairs.sort_unstable();
    pairs.join("&")
}
