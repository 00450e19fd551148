//! Cache configuration.
//!
//! Built once at startup from the resolved [`crate::config::CacheSettings`].

use std::time::Duration;

use super::classifier::PrivateRoutes;

const DEFAULT_TTL_SECS: u64 = 5 * 60;

pub const DEFAULT_PRIVATE_PREFIXES: [&str; 8] = [
    "/cart",
    "/checkout",
    "/profile",
    "/seller-dashboard",
    "/login",
    "/signup",
    "/forgot-pwd",
    "/admin",
];

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every request is rendered and passed through.
    pub enabled: bool,
    /// Freshness window shared by all entries.
    pub ttl: Duration,
    pub private_routes: PrivateRoutes,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            private_routes: PrivateRoutes::new(DEFAULT_PRIVATE_PREFIXES),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: settings.ttl,
            private_routes: PrivateRoutes::new(settings.private_prefixes.iter().cloned()),
        }
    }
}

impl CacheConfig {
    /// Returns true if `target` may be served from or written to the store.
    pub fn is_cacheable(&self, target: &str) -> bool {
        self.enabled && !self.private_routes.is_private(target)
    }
}
