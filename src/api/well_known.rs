/// /.well-known/atproto-did
///
/// Answers any method with the DID for the requested Host in plain text, or a
/// plain-text error line with the matching status.
use crate::{
    context::AppContext,
    directory::DidList,
    error::ResolutionError,
    metrics,
    resolver::{HostMatch, Resolution},
    validation::is_valid_handle,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::borrow::Cow;

/// Build well-known routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/.well-known/atproto-did", any(atproto_did))
}

/// Requested hostname: the Host header, else the request-target authority
fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
        .unwrap_or_default()
}

pub async fn atproto_did(State(ctx): State<AppContext>, headers: HeaderMap, uri: Uri) -> Response {
    let host = request_host(&headers, &uri);

    let outcome = resolve_host(&ctx, &host).await;
    let label = match &outcome {
        Ok(Resolution::Probe) => "probe",
        Ok(Resolution::Did(_)) => "did",
        Err(e) => e.as_str(),
    };
    metrics::record_resolution(label);
    tracing::debug!(host = %host, outcome = label, "atproto-did resolved");

    match outcome {
        Ok(resolution) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("{}\n", resolution.body()),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn resolve_host(ctx: &AppContext, host: &str) -> Result<Resolution, ResolutionError> {
    // Malformed hosts never touch storage
    if !is_valid_handle(host) {
        return Err(ResolutionError::InvalidHandle);
    }

    let config = ctx.settings.load().await?;

    let directory = match ctx.resolver.classify(host, &config)? {
        HostMatch::Member(_) => ctx.directory(&config).await?,
        _ => Cow::Owned(DidList::default()),
    };

    ctx.resolver.resolve(host, &config, &*directory)
}
