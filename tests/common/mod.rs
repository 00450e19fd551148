#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use storefront::{
    application::render::{RenderError, RenderOutcome, RenderRequest, RenderedPage, Renderer},
    cache::{CacheConfig, CacheState, PrivateRoutes, ResponseCache},
    infra::{
        assets::StaticAssets,
        http::{AppState, build_router},
    },
};
use tower::ServiceExt;

/// What the scripted renderer does on its next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Page(StatusCode),
    Unhandled,
    Fail,
}

/// Renderer that counts calls and numbers each rendered body.
pub struct ScriptedRenderer {
    calls: AtomicUsize,
    script: Mutex<Script>,
}

impl ScriptedRenderer {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script),
        })
    }

    pub fn pages() -> Arc<Self> {
        Self::new(Script::Page(StatusCode::OK))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().expect("script lock") = script;
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutcome, RenderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let script = *self.script.lock().expect("script lock");

        match script {
            Script::Page(status) => {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
                headers.insert("x-rendered-by", HeaderValue::from_static("scripted"));
                Ok(RenderOutcome::Page(RenderedPage {
                    status,
                    headers,
                    body: Body::from(format!("<html>{} render #{call}</html>", request.target())),
                }))
            }
            Script::Unhandled => Ok(RenderOutcome::Unhandled),
            Script::Fail => Err(RenderError::upstream("renderer exploded")),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<ResponseCache>,
    pub renderer: Arc<ScriptedRenderer>,
}

pub struct AppBuilder {
    renderer: Arc<ScriptedRenderer>,
    ttl: Duration,
    prefixes: Vec<String>,
    enabled: bool,
    assets_dir: PathBuf,
}

impl AppBuilder {
    pub fn new(renderer: Arc<ScriptedRenderer>) -> Self {
        Self {
            renderer,
            ttl: Duration::from_secs(300),
            prefixes: vec!["/cart".to_string(), "/checkout".to_string()],
            enabled: true,
            assets_dir: PathBuf::from("/nonexistent/storefront-test-assets"),
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn prefixes(mut self, prefixes: &[&str]) -> Self {
        self.prefixes = prefixes.iter().map(|prefix| prefix.to_string()).collect();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn build(self) -> TestApp {
        let config = CacheConfig {
            enabled: self.enabled,
            ttl: self.ttl,
            private_routes: PrivateRoutes::new(self.prefixes),
        };
        let cache = CacheState::new(config, self.renderer.clone());
        let store = cache.store.clone();
        let assets = Arc::new(StaticAssets::new(self.assets_dir, Duration::from_secs(3600)));

        TestApp {
            router: build_router(AppState { cache, assets }),
            store,
            renderer: self.renderer,
        }
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri).await
    }

    pub async fn send(&self, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }
}

pub async fn body_bytes(response: Response) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
}

pub fn x_cache(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("x-cache")
        .and_then(|value| value.to_str().ok())
}
