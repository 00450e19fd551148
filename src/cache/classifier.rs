//! Private route classification.
//!
//! A request target is private when it starts with any configured prefix.
//! Private routes never read from or write to the response store.

/// Ordered set of path prefixes that must bypass the response cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateRoutes {
    prefixes: Vec<String>,
}

impl PrivateRoutes {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `target` (path plus query string) is private.
    pub fn is_private(&self, target: &str) -> bool {
        is_private_route(target, &self.prefixes)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Case-sensitive prefix match; a target equal to a prefix matches.
pub fn is_private_route<S: AsRef<str>>(target: &str, prefixes: &[S]) -> bool {
    prefixes
        .iter()
        .any(|prefix| target.starts_with(prefix.as_ref()))
}
