//! Application-level contracts shared by the HTTP pipeline and its adapters.

pub mod error;
pub mod render;
