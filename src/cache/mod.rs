//! Storefront SSR response cache.
//!
//! Rendered HTML for public pages is kept in memory for a fixed TTL. The
//! first visitor pays the render cost and later visitors get the stored page
//! until it goes stale. Routes under a private prefix are always rendered.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 300
//! private_prefixes = ["/cart", "/checkout", "/profile"]
//! ```

mod classifier;
mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use classifier::{PrivateRoutes, is_private_route};
pub use config::{CacheConfig, DEFAULT_PRIVATE_PREFIXES};
pub use keys::CacheKey;
pub use middleware::{CacheState, X_CACHE, render_pages};
pub use store::{CacheEntry, ResponseCache};
