//! SSR response cache stage.
//!
//! Sits after static asset serving. Cacheable GET requests are answered from
//! the store while fresh; everything else goes to the renderer. Private
//! routes and non-GET requests never touch the store.

use std::{sync::Arc, time::Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use metrics::{counter, histogram};
use tracing::{debug, instrument};

use crate::application::{
    error::HttpError,
    render::{RenderError, RenderOutcome, RenderRequest, RenderedPage, Renderer},
};

use super::{CacheConfig, CacheKey, ResponseCache};

/// Diagnostic header carrying `HIT` or `MISS` on cacheable routes.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Shared state for the render stage.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseCache>,
    pub renderer: Arc<dyn Renderer>,
}

impl CacheState {
    /// Build state with a fresh, empty store.
    pub fn new(config: CacheConfig, renderer: Arc<dyn Renderer>) -> Self {
        let store = Arc::new(ResponseCache::new(config.ttl));
        Self {
            config,
            store,
            renderer,
        }
    }
}

/// Middleware serving rendered pages through the response cache.
///
/// When the renderer reports a route as unhandled the original request is
/// forwarded to `next`.
#[instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
pub async fn render_pages(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let render_request = RenderRequest::from_request(&request);
    let cacheable =
        request.method() == Method::GET && cache.config.is_cacheable(render_request.target());

    if !cacheable {
        counter!("storefront_ssr_cache_bypass_total").increment(1);
        debug!(cache = "ssr", outcome = "bypass", "rendering without cache");

        return match render(&cache, &render_request).await {
            Ok(RenderOutcome::Page(page)) => passthrough_response(page),
            Ok(RenderOutcome::Unhandled) => next.run(request).await,
            Err(err) => HttpError::from(err).into_response(),
        };
    }

    let key = CacheKey::from_uri(request.uri());

    if let Some(entry) = cache.store.get_fresh(&key) {
        counter!("storefront_ssr_cache_hit_total").increment(1);
        debug!(cache = "ssr", outcome = "hit", key = %key, "serving cached page");
        return hit_response(entry.body);
    }

    counter!("storefront_ssr_cache_miss_total").increment(1);
    debug!(cache = "ssr", outcome = "miss", key = %key, "cache miss, rendering");

    match render(&cache, &render_request).await {
        Ok(RenderOutcome::Page(page)) => fill_and_respond(&cache, key, page).await,
        Ok(RenderOutcome::Unhandled) => {
            debug!(cache = "ssr", key = %key, "renderer declined route");
            next.run(request).await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn render(
    cache: &CacheState,
    request: &RenderRequest,
) -> Result<RenderOutcome, RenderError> {
    let started = Instant::now();
    let result = cache.renderer.render(request).await;
    histogram!("storefront_ssr_render_ms").record(started.elapsed().as_secs_f64() * 1000.0);

    if let Err(err) = &result {
        counter!("storefront_ssr_render_failure_total").increment(1);
        debug!(cache = "ssr", error = %err, "render failed");
    }
    result
}

/// Buffer the rendered body, store it when successful and emit a MISS.
async fn fill_and_respond(cache: &CacheState, key: CacheKey, page: RenderedPage) -> Response {
    let RenderedPage {
        status,
        mut headers,
        body,
    } = page;

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            counter!("storefront_ssr_render_failure_total").increment(1);
            return HttpError::from(RenderError::Body(err.to_string())).into_response();
        }
    };

    // Entries carry no status, so only pages a hit may replay as 200 are kept.
    if status.is_success() {
        cache.store.insert(key.clone(), bytes.clone());
        debug!(cache = "ssr", key = %key, bytes = bytes.len(), "stored rendered page");
    } else {
        debug!(
            cache = "ssr",
            key = %key,
            status = status.as_u16(),
            "not storing unsuccessful render"
        );
    }

    headers.remove(CONTENT_LENGTH);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    headers.insert(X_CACHE, HeaderValue::from_static("MISS"));

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn hit_response(body: Bytes) -> Response {
    (
        [(CONTENT_TYPE, HTML_CONTENT_TYPE), (X_CACHE, "HIT")],
        body,
    )
        .into_response()
}

fn passthrough_response(page: RenderedPage) -> Response {
    let mut response = Response::new(page.body);
    *response.status_mut() = page.status;
    *response.headers_mut() = page.headers;
    response
}
