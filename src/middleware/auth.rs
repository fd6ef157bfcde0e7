use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, Validation};

use crate::db::users;
use crate::error::AppError;
use crate::routes::AppState;
use crate::services::auth_service::Claims;

const MISSING_TOKEN: &str = "No token, authorization denied";
const INVALID_TOKEN: &str = "Token is not valid";

/// The caller behind a valid bearer token. Taking this as a handler argument
/// makes the route require authentication.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized(MISSING_TOKEN.to_string()))?;

        let claims = decode_token(token, &state.config.jwt_secret).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            AppError::Unauthorized(INVALID_TOKEN.to_string())
        })?;

        // A token can outlive its account.
        if !users::exists(&state.pool, &claims.sub).await? {
            tracing::warn!("Token subject {} no longer exists", claims.sub);
            return Err(AppError::Unauthorized(INVALID_TOKEN.to_string()));
        }

        Ok(AuthenticatedUser {
            user_id: claims.sub,
        })
    }
}
