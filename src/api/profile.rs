/// Per-user handle profile endpoints
use crate::{
    api::form_fields,
    auth::AuthContext,
    context::AppContext,
    error::{DidgeridooError, DidgeridooResult},
    metrics,
    profiles::{validate_profile, UserProfile},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

/// Build profile routes
pub fn routes() -> Router<AppContext> {
    Router::new().route(
        "/didgeridoo/v1/users/:user_id/profile",
        get(get_profile).post(update_profile),
    )
}

/// Profiles are only exposed while organization mode is enabled
async fn ensure_org_mode(ctx: &AppContext) -> DidgeridooResult<()> {
    if ctx.settings.load_stored().await?.org_mode_enabled() {
        Ok(())
    } else {
        Err(DidgeridooError::NotFound(
            "Organization mode is disabled".to_string(),
        ))
    }
}

fn ensure_can_edit(auth: &AuthContext, user_id: &str) -> DidgeridooResult<()> {
    if auth.can_edit_user(user_id) {
        Ok(())
    } else {
        tracing::warn!(subject = %auth.subject, user_id = %user_id, "profile access denied");
        Err(DidgeridooError::Unauthorized(
            "Cannot edit another user's profile".to_string(),
        ))
    }
}

async fn get_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> DidgeridooResult<Json<UserProfile>> {
    ensure_can_edit(&auth, &user_id)?;
    ensure_org_mode(&ctx).await?;

    let profile = ctx
        .profiles
        .get(&user_id)
        .await?
        .unwrap_or_else(|| UserProfile::empty(&user_id));

    Ok(Json(profile))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> DidgeridooResult<Json<Value>> {
    ensure_can_edit(&auth, &user_id)?;
    ensure_org_mode(&ctx).await?;
    let submitted = form_fields(body)?;

    let taken = ctx.profiles.labels_excluding(&user_id).await?;
    let (label, did) = validate_profile(&submitted, &taken).map_err(|errors| {
        metrics::record_settings_update("profile", false);
        DidgeridooError::Validation(errors)
    })?;

    ctx.profiles.save(&user_id, &label, &did).await?;
    metrics::record_settings_update("profile", true);
    tracing::info!(subject = %auth.subject, user_id = %user_id, "profile saved");

    Ok(Json(json!({ "message": "Profile saved." })))
}
