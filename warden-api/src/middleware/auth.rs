///! Authentication middleware
///!
///! Validates bearer tokens and attaches the caller's identity to the request

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warden_common::auth::CallerContext;

use crate::state::AppState;

/// Authentication error response
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user ID
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

impl From<Claims> for CallerContext {
    fn from(claims: Claims) -> Self {
        CallerContext {
            user_id: claims.sub,
            username: claims.username,
            groups: claims.groups,
        }
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError {
            error: "unauthorized".to_string(),
            message: "Authentication required. Provide a Bearer token.".to_string(),
        })?;

    let claims = validate_jwt_token(&state.auth.jwt_secret, token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AuthError {
            error: "invalid_token".to_string(),
            message: format!("Invalid JWT token: {}", e),
        }
    })?;

    request.extensions_mut().insert(CallerContext::from(claims));
    Ok(next.run(request).await)
}

/// Validate JWT token with signature verification
pub fn validate_jwt_token(secret: &str, token: &str) -> Result<Claims, String> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

/// Generate an HS256 token for `caller`, valid for `ttl_secs`
pub fn generate_jwt_token(
    secret: &str,
    caller: &CallerContext,
    ttl_secs: u64,
) -> Result<String, String> {
    let now = chrono::Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: caller.user_id.clone(),
        username: caller.username.clone(),
        groups: caller.groups.clone(),
        exp: now + ttl_secs as usize,
        iat: now,
    };

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::new(Algorithm::HS256);

    encode(&header, &claims, &encoding_key).map_err(|e| format!("Failed to generate JWT: {}", e))
}
