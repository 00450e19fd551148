//! Static browser asset serving.
//!
//! Files under the browser build directory are served directly with a long
//! `Cache-Control` lifetime. Anything that is not a regular file falls
//! through to the next stage: no index files and no directory redirects.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::application::error::ErrorReport;
use crate::config::AssetSettings;

const SOURCE: &str = "infra::assets::serve_static_assets";

#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    cache_control: HeaderValue,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>, max_age: Duration) -> Self {
        let cache_control =
            HeaderValue::from_str(&format!("public, max-age={}", max_age.as_secs()))
                .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=0"));
        Self {
            root: root.into(),
            cache_control,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path to a file under the root, rejecting traversal.
    ///
    /// The path is percent-decoded first; undecodable paths fall through.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
        let candidate = decoded.trim_start_matches('/');
        if candidate.is_empty()
            || candidate.ends_with('/')
            || candidate.contains('\\')
            || candidate.contains('\0')
        {
            return None;
        }

        let relative = Path::new(candidate);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return None;
        }

        Some(self.root.join(relative))
    }

    async fn load(&self, request_path: &str) -> Result<Option<Response>, std::io::Error> {
        let Some(path) = self.resolve(request_path) else {
            return Ok(None);
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        }

        let contents = tokio::fs::read(&path).await?;
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Ok(Some(self.build_response(Bytes::from(contents), mime)))
    }

    fn build_response(&self, bytes: Bytes, mime: Mime) -> Response {
        let len = bytes.len();
        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());

        response
    }
}

impl From<&AssetSettings> for StaticAssets {
    fn from(settings: &AssetSettings) -> Self {
        Self::new(settings.directory.clone(), settings.max_age)
    }
}

/// Middleware serving files from the browser build before rendering.
pub async fn serve_static_assets(
    State(assets): State<Arc<StaticAssets>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    match assets.load(request.uri().path()).await {
        Ok(Some(response)) => response,
        Ok(None) => next.run(request).await,
        Err(err) => {
            debug!(path = %request.uri().path(), error = %err, "static asset read failed");
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
                .attach(&mut response);
            response
        }
    }
}
