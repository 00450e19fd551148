//! Public HTTP surface.
//!
//! Requests flow through static asset serving, then the SSR cache stage,
//! and finally a 404 handler for routes the renderer declines.

mod middleware;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use std::sync::Arc;

use axum::{
    Router,
    http::{StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::error::HttpError,
    cache::{CacheState, render_pages},
    infra::assets::{StaticAssets, serve_static_assets},
};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct AppState {
    pub cache: CacheState,
    pub assets: Arc<StaticAssets>,
}

pub fn build_router(state: AppState) -> Router {
    let pipeline = Router::new()
        .fallback(not_found)
        .layer(from_fn_with_state(state.cache, render_pages))
        .layer(from_fn_with_state(state.assets, serve_static_assets));

    Router::new()
        .route("/_health", get(health))
        .fallback_service(pipeline)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found(uri: Uri) -> Response {
    HttpError::new(
        "infra::http::not_found",
        StatusCode::NOT_FOUND,
        "Page not found",
        format!("no page rendered for `{uri}`"),
    )
    .into_response()
}
