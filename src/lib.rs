//! Storefront server-side render cache.
//!
//! Fronts the page renderer with an in-memory, TTL-bound response cache that
//! never stores private routes.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
