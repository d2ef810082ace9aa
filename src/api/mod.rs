/// API routes and handlers
pub mod health;
pub mod options;
pub mod profile;
pub mod well_known;

use crate::{
    context::AppContext,
    error::{DidgeridooError, DidgeridooResult},
    validation::{FieldErrors, Peers},
};
use axum::{extract::rejection::JsonRejection, Json, Router};
use serde_json::Value;

/// Field key for errors about the request body as a whole
pub const FIELD_BODY: &str = "body";
pub const MSG_BODY_INVALID: &str = "The request body must be a JSON object.";

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(well_known::routes())
        .merge(options::routes())
        .merge(profile::routes())
        .merge(health::routes())
}

/// Submitted form fields, or a 400 field map when the body is not a JSON object
pub fn form_fields(body: Result<Json<Value>, JsonRejection>) -> DidgeridooResult<Peers> {
    let reason = match body {
        Ok(Json(Value::Object(fields))) => return Ok(fields),
        Ok(Json(other)) => format!("expected an object, got {}", json_kind(&other)),
        Err(rejection) => rejection.body_text(),
    };

    tracing::debug!(reason = %reason, "request body rejected");
    let mut errors = FieldErrors::new();
    errors.add(FIELD_BODY, MSG_BODY_INVALID);
    Err(DidgeridooError::Validation(errors))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
