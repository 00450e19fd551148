//! Page renderer contract.
//!
//! The rendering engine is opaque to the cache. It either produces a page,
//! declines the route, or fails.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, Uri},
};
use thiserror::Error;

/// Snapshot of the incoming request handed to the renderer.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RenderRequest {
    pub fn from_request(request: &Request<Body>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }

    /// Raw request target (path plus query string) as received.
    pub fn target(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|value| value.as_str())
            .unwrap_or("/")
    }
}

/// A rendered document with the renderer's status and headers.
#[derive(Debug)]
pub struct RenderedPage {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

#[derive(Debug)]
pub enum RenderOutcome {
    Page(RenderedPage),
    /// The renderer has no content for this URL; the next stage decides.
    Unhandled,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer request failed: {0}")]
    Upstream(String),
    #[error("renderer responded with status {0}")]
    Status(StatusCode),
    #[error("failed to read rendered body: {0}")]
    Body(String),
}

impl RenderError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutcome, RenderError>;
}
