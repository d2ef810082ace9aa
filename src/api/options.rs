/// Settings API
///
/// Every endpoint here requires the admin capability.
use crate::{
    api::form_fields,
    auth::AdminAuthContext,
    context::AppContext,
    directory::{DidRecord, SortKey, SortOrder},
    error::{DidgeridooError, DidgeridooResult},
    metrics,
    settings::{
        update::{apply_update, validate_subdomain},
        KEY_SUBDOMAIN,
    },
    validation::field_str,
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Build settings routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/didgeridoo/v1/options", get(get_options).post(update_options))
        .route("/didgeridoo/v1/test-dns", post(test_dns))
        .route("/didgeridoo/v1/handles", get(list_handles))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub site_domain: String,
    pub didgeridoo_subdomain: String,
    pub didgeridoo_main_did: String,
    /// JSON-encoded handle list, as stored
    pub didgeridoo_did_list: String,
    pub didgeridoo_enable_org_mode: bool,
    pub handle_source: String,
}

/// Current settings
///
/// Reads raw storage so a corrupt handle list can still be inspected.
async fn get_options(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> DidgeridooResult<Json<OptionsResponse>> {
    let stored = ctx.settings.load_stored().await?;

    Ok(Json(OptionsResponse {
        site_domain: ctx.site_domain().to_string(),
        didgeridoo_subdomain: stored.subdomain.clone(),
        didgeridoo_main_did: stored.main_did.clone(),
        didgeridoo_enable_org_mode: stored.org_mode_enabled(),
        didgeridoo_did_list: stored.did_list,
        handle_source: ctx.handle_source().as_str().to_string(),
    }))
}

/// Validate and persist a settings form
async fn update_options(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    body: Result<Json<Value>, JsonRejection>,
) -> DidgeridooResult<Json<Value>> {
    let submitted = form_fields(body)?;
    let current = ctx.settings.load_stored().await?;

    let updated = match apply_update(&submitted, &current, Utc::now()) {
        Ok(updated) => updated,
        Err(errors) => {
            metrics::record_settings_update("options", false);
            tracing::info!(subject = %auth.subject, errors = %errors, "settings update rejected");
            return Err(DidgeridooError::Validation(errors));
        }
    };

    ctx.settings.save(&updated).await?;
    metrics::record_settings_update("options", true);
    tracing::info!(
        subject = %auth.subject,
        org_mode = updated.org_mode_enabled(),
        "settings saved"
    );

    Ok(Json(json!({ "message": "Settings saved." })))
}

/// Check that `didgeridoo-test[.<subdomain>].<site>` reaches this service
async fn test_dns(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    body: Result<Json<Value>, JsonRejection>,
) -> DidgeridooResult<Json<Value>> {
    let submitted = form_fields(body)?;
    let subdomain = field_str(&submitted, KEY_SUBDOMAIN);
    validate_subdomain(&subdomain, &submitted).map_err(DidgeridooError::Validation)?;

    let result = ctx.probe.check(&subdomain, ctx.site_domain()).await;
    metrics::record_dns_probe(result.is_ok());
    result?;

    Ok(Json(json!({ "message": "Subdomain is reachable." })))
}

#[derive(Debug, Deserialize)]
struct ListHandlesQuery {
    #[serde(default)]
    sort: Option<SortKey>,
    #[serde(default)]
    order: Option<SortOrder>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListHandlesResponse {
    pub handles: Vec<DidRecord>,
}

/// Enumerate the organization handle directory
async fn list_handles(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Query(query): Query<ListHandlesQuery>,
) -> DidgeridooResult<Json<ListHandlesResponse>> {
    let config = ctx.settings.load().await?;
    let directory = ctx.directory(&config).await?;

    let handles = directory
        .sorted(
            query.sort.unwrap_or(SortKey::Name),
            query.order.unwrap_or(SortOrder::Asc),
        )
        .into_inner();

    Ok(Json(ListHandlesResponse { handles }))
}
