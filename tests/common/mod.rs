//! Shared setup for router-level tests
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use didgeridoo::{
    auth::issue_token,
    config::{HandleSource, ProbeConfig, ServerConfig},
    db,
    probe::SubdomainProbe,
    server::build_router,
    settings::StoredSettings,
    AppContext,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "integration_secret_that_is_32_chars";
pub const SITE: &str = "example.com";

pub async fn context(source: HandleSource) -> AppContext {
    let mut config = ServerConfig::for_site(SITE, SECRET);
    config.identity.handle_source = source;
    config.authentication.admin_subjects = vec!["1".to_string()];

    let pool = db::create_memory_pool().await.unwrap();
    AppContext::with_pool(config, pool).await.unwrap()
}

pub async fn seed(ctx: &AppContext, stored: StoredSettings) {
    ctx.settings.save(&stored).await.unwrap();
}

pub fn admin_token() -> String {
    issue_token(SECRET, "1", false, Duration::minutes(5)).unwrap()
}

pub fn user_token(subject: &str) -> String {
    issue_token(SECRET, subject, false, Duration::minutes(5)).unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

/// GET /.well-known/atproto-did for `host`, returning status and body text
pub async fn resolve(ctx: &AppContext, host: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .uri("/.well-known/atproto-did")
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(build_router(ctx.clone()), request).await;
    (status, String::from_utf8(body).unwrap())
}

pub async fn get_json(ctx: &AppContext, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let (status, body) = send(build_router(ctx.clone()), builder.body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

pub async fn post_json(
    ctx: &AppContext,
    uri: &str,
    token: Option<&str>,
    payload: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder.body(Body::from(payload.to_string())).unwrap();
    let (status, body) = send(build_router(ctx.clone()), request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

/// POST a raw body, returning status and parsed JSON (or null)
pub async fn post_raw(ctx: &AppContext, uri: &str, token: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(build_router(ctx.clone()), request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

/// Serve `router` from a loopback listener
pub async fn serve_local(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Point the self-test of `ctx` at `addr` for requests to `host`
pub fn route_self_test(ctx: &mut AppContext, host: &str, addr: SocketAddr) {
    let config = ProbeConfig {
        scheme: "http".to_string(),
        port: Some(addr.port()),
        timeout_secs: 2,
    };
    let client = SubdomainProbe::client_builder(&config)
        .resolve(host, addr)
        .no_proxy()
        .build()
        .unwrap();
    ctx.probe = Arc::new(SubdomainProbe::with_client(client, &config));
}
