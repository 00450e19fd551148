mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode, header};
use storefront::cache::CacheKey;

use common::{AppBuilder, Script, ScriptedRenderer, body_bytes, x_cache};

#[tokio::test]
async fn second_request_within_ttl_is_a_hit_without_rendering() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    let first = app.get("/products/42").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(x_cache(&first), Some("MISS"));
    let first_body = body_bytes(first).await;

    let second = app.get("/products/42").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(x_cache(&second), Some("HIT"));
    assert_eq!(
        second.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(body_bytes(second).await, first_body);

    assert_eq!(app.renderer.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_rendered_again_and_replaced() {
    let app = AppBuilder::new(ScriptedRenderer::pages())
        .ttl(Duration::from_secs(300))
        .build();

    let first = body_bytes(app.get("/").await).await;
    assert!(String::from_utf8_lossy(&first).contains("render #1"));

    tokio::time::advance(Duration::from_secs(299)).await;
    let still_fresh = app.get("/").await;
    assert_eq!(x_cache(&still_fresh), Some("HIT"));

    tokio::time::advance(Duration::from_secs(1)).await;
    let expired = app.get("/").await;
    assert_eq!(x_cache(&expired), Some("MISS"));
    let refreshed = body_bytes(expired).await;
    assert!(String::from_utf8_lossy(&refreshed).contains("render #2"));

    let entry = app
        .store
        .peek(&CacheKey::from_parts("/", None))
        .expect("entry should be replaced");
    assert_eq!(entry.body, refreshed);
    assert_eq!(app.renderer.calls(), 2);
}

#[tokio::test]
async fn private_routes_always_render_and_never_store() {
    let app = AppBuilder::new(ScriptedRenderer::pages())
        .prefixes(&["/cart", "/checkout"])
        .build();

    for uri in ["/cart", "/cart", "/checkout/step-2", "/cartography"] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(x_cache(&response).is_none(), "{uri} must not carry X-Cache");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    }

    assert_eq!(app.renderer.calls(), 4);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn query_strings_are_part_of_the_key() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    assert_eq!(x_cache(&app.get("/search?q=shoes").await), Some("MISS"));
    assert_eq!(x_cache(&app.get("/search?q=hats").await), Some("MISS"));
    assert_eq!(x_cache(&app.get("/search?q=shoes").await), Some("HIT"));
    assert_eq!(x_cache(&app.get("/search").await), Some("MISS"));

    assert_eq!(app.renderer.calls(), 3);
    assert_eq!(app.store.len(), 3);
}

#[tokio::test]
async fn reordered_query_pairs_share_an_entry() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    assert_eq!(x_cache(&app.get("/list?page=2&sort=asc").await), Some("MISS"));
    assert_eq!(x_cache(&app.get("/list?sort=asc&page=2").await), Some("HIT"));
    assert_eq!(app.renderer.calls(), 1);
}

#[tokio::test]
async fn undecodable_queries_do_not_share_an_entry() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    assert_eq!(x_cache(&app.get("/search?q=%FF").await), Some("MISS"));
    let other = app.get("/search?q=%FE").await;
    assert_eq!(x_cache(&other), Some("MISS"));
    let body = body_bytes(other).await;
    assert!(String::from_utf8_lossy(&body).contains("/search?q=%FE"));

    assert_eq!(app.renderer.calls(), 2);
    assert_eq!(app.store.len(), 2);
}

#[tokio::test]
async fn render_failure_returns_500_and_stores_nothing() {
    let app = AppBuilder::new(ScriptedRenderer::new(Script::Fail)).build();

    let response = app.get("/products/7").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(x_cache(&response).is_none());
    assert!(app.store.is_empty());

    app.renderer.set_script(Script::Page(StatusCode::OK));
    let recovered = app.get("/products/7").await;
    assert_eq!(x_cache(&recovered), Some("MISS"));
    assert_eq!(app.renderer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_entry_survives_failed_refill() {
    let app = AppBuilder::new(ScriptedRenderer::pages())
        .ttl(Duration::from_secs(10))
        .build();

    let original = body_bytes(app.get("/deals").await).await;

    tokio::time::advance(Duration::from_secs(11)).await;
    app.renderer.set_script(Script::Fail);
    let failed = app.get("/deals").await;
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let entry = app
        .store
        .peek(&CacheKey::from_parts("/deals", None))
        .expect("stale entry is left in place");
    assert_eq!(entry.body, original);
}

#[tokio::test]
async fn unsuccessful_renders_are_served_but_not_stored() {
    let app = AppBuilder::new(ScriptedRenderer::new(Script::Page(StatusCode::SERVICE_UNAVAILABLE)))
        .build();

    let response = app.get("/maintenance").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(x_cache(&response), Some("MISS"));
    assert!(app.store.is_empty());

    app.get("/maintenance").await;
    assert_eq!(app.renderer.calls(), 2);
}

#[tokio::test]
async fn unhandled_routes_fall_through_to_not_found() {
    let app = AppBuilder::new(ScriptedRenderer::new(Script::Unhandled)).build();

    let response = app.get("/no-such-page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(x_cache(&response).is_none());
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn unhandled_private_routes_fall_through_to_not_found() {
    let app = AppBuilder::new(ScriptedRenderer::new(Script::Unhandled))
        .prefixes(&["/cart"])
        .build();

    let response = app.get("/cart/x").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(x_cache(&response).is_none());
    assert_eq!(app.renderer.calls(), 1);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn non_get_requests_bypass_the_store() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    app.get("/newsletter").await;
    let posted = app.send(Method::POST, "/newsletter").await;
    assert_eq!(posted.status(), StatusCode::OK);
    assert!(x_cache(&posted).is_none());

    assert_eq!(app.renderer.calls(), 2);
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn disabled_cache_renders_every_request() {
    let app = AppBuilder::new(ScriptedRenderer::pages())
        .enabled(false)
        .build();

    for _ in 0..3 {
        let response = app.get("/").await;
        assert!(x_cache(&response).is_none());
    }

    assert_eq!(app.renderer.calls(), 3);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn miss_keeps_renderer_headers_and_normalizes_content_type() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    let response = app.get("/about").await;
    assert_eq!(response.headers()["x-rendered-by"], "scripted");
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    let response = app.get("/").await;
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .expect("request id header");
    assert!(!request_id.is_empty());
}

#[tokio::test]
async fn health_route_skips_the_renderer() {
    let app = AppBuilder::new(ScriptedRenderer::pages()).build();

    let response = app.get("/_health").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.renderer.calls(), 0);
}

#[tokio::test]
async fn static_assets_are_served_before_rendering() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::create_dir(dir.path().join("assets")).expect("assets dir");
    std::fs::write(dir.path().join("styles-4c1d.css"), "body{margin:0}").expect("write css");
    std::fs::write(dir.path().join("assets/hero banner.svg"), "<svg/>").expect("write svg");

    let app = AppBuilder::new(ScriptedRenderer::pages())
        .assets_dir(dir.path())
        .build();

    let response = app.get("/styles-4c1d.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=3600"
    );
    assert!(x_cache(&response).is_none());
    assert_eq!(body_bytes(response).await.as_ref(), b"body{margin:0}");
    assert_eq!(app.renderer.calls(), 0);

    let escaped = app.get("/assets/hero%20banner.svg").await;
    assert_eq!(escaped.status(), StatusCode::OK);
    assert_eq!(escaped.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert_eq!(body_bytes(escaped).await.as_ref(), b"<svg/>");
    assert_eq!(app.renderer.calls(), 0);

    let directory = app.get("/assets").await;
    assert_eq!(x_cache(&directory), Some("MISS"));

    let missing = app.get("/missing.js").await;
    assert_eq!(x_cache(&missing), Some("MISS"));

    assert_eq!(app.renderer.calls(), 2);
}
