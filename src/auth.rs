/// Authentication extractors and utilities
use crate::{context::AppContext, error::DidgeridooError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Scope claim granting the admin capability
pub const ADMIN_SCOPE: &str = "admin";

/// Claims carried by bearer tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Verify signature and expiry of a bearer token
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<Claims, DidgeridooError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    DidgeridooError::Unauthorized("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    DidgeridooError::Unauthorized("Invalid token signature".to_string())
                }
                _ => DidgeridooError::Unauthorized(format!("Invalid token: {}", e)),
            }
        })
}

/// Mint a bearer token for `subject`
pub fn issue_token(
    jwt_secret: &str,
    subject: &str,
    admin: bool,
    ttl: Duration,
) -> Result<String, DidgeridooError> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        scope: admin.then(|| ADMIN_SCOPE.to_string()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| DidgeridooError::Internal(format!("Failed to sign token: {}", e)))
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
    pub is_admin: bool,
}

impl AuthContext {
    /// May the caller edit the profile of `user_id`
    pub fn can_edit_user(&self, user_id: &str) -> bool {
        self.is_admin || self.subject == user_id
    }
}

fn authenticate(parts: &Parts, state: &AppContext) -> Result<AuthContext, DidgeridooError> {
    let token = extract_bearer_token(&parts.headers)
        .ok_or_else(|| DidgeridooError::Unauthorized("Missing authorization header".to_string()))?;

    let claims = verify_jwt_token(&token, &state.config.authentication.jwt_secret)?;

    let is_admin = claims.scope.as_deref() == Some(ADMIN_SCOPE)
        || state
            .config
            .authentication
            .admin_subjects
            .iter()
            .any(|s| s == &claims.sub);

    Ok(AuthContext {
        subject: claims.sub,
        is_admin,
    })
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = DidgeridooError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
    }
}

/// Caller holding the admin capability
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub subject: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = DidgeridooError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = authenticate(parts, state)?;

        if !auth.is_admin {
            tracing::warn!(subject = %auth.subject, "admin capability required");
            return Err(DidgeridooError::Unauthorized("Admin role required".to_string()));
        }

        Ok(AdminAuthContext {
            subject: auth.subject,
        })
    }
}
