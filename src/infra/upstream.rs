//! Renderer backed by an HTTP rendering service.
//!
//! The incoming request is replayed against the service. A 404 means the
//! service has no page for the route, a 5xx or transport failure is a render
//! failure, and everything else is a rendered page whose body is streamed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, StatusCode, header},
};
use reqwest::{Client, redirect::Policy};
use tracing::debug;
use url::Url;

use crate::application::render::{
    RenderError, RenderOutcome, RenderRequest, RenderedPage, Renderer,
};
use crate::config::RenderSettings;

use super::error::InfraError;

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

pub struct UpstreamRenderer {
    client: Client,
    base: Url,
}

impl UpstreamRenderer {
    pub fn new(settings: &RenderSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            base: settings.upstream_url.clone(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn target_url(&self, request: &RenderRequest) -> Url {
        let mut url = self.base.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}{}", request.uri.path()));
        url.set_query(request.uri.query());
        url
    }
}

#[async_trait]
impl Renderer for UpstreamRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutcome, RenderError> {
        let url = self.target_url(request);
        debug!(upstream = %url, "requesting render");

        let response = self
            .client
            .request(request.method.clone(), url)
            .headers(forwarded_request_headers(&request.headers))
            .send()
            .await
            .map_err(|err| RenderError::upstream(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(RenderOutcome::Unhandled);
        }
        if status.is_server_error() {
            return Err(RenderError::Status(status));
        }

        let headers = strip_hop_by_hop(response.headers().clone());
        let body = Body::from_stream(response.bytes_stream());

        Ok(RenderOutcome::Page(RenderedPage {
            status,
            headers,
            body,
        }))
    }
}

/// Request headers sent upstream. The body is always re-read in full on a
/// miss and replayed on a hit, so upstream must answer with identity
/// encoding.
fn forwarded_request_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(incoming.clone());
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::ACCEPT_ENCODING);
    headers
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers
}
