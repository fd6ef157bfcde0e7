use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::db::{self, users};
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::AuthenticatedUser;
use crate::models::{NewUser, Profile};
use crate::response::ApiResponse;
use crate::routes::AppState;
use crate::validation::Validator;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue_token(
    user_id: &str,
    email: &str,
    secret: &str,
    ttl_hours: i64,
) -> AppResult<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let exp = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Internal(format!("JWT lifetime of {} hours is out of range", ttl_hours))
        })?;
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("JWT error: {}", e)))?;
    Ok((token, exp))
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|_| AppError::Internal("Invalid password hash in database".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Profile,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl RegisterRequest {
    fn validate(self, password_hash: impl FnOnce(&str) -> AppResult<String>) -> AppResult<NewUser> {
        let mut v = Validator::new();
        let name = v.text(
            "name",
            self.name.as_deref(),
            2,
            50,
            "Name must be between 2 and 50 characters",
        );
        let email = self.email.as_deref().map(normalize_email).unwrap_or_default();
        v.check(EMAIL_RE.is_match(&email), "email", "Please provide a valid email");
        let password = self.password.unwrap_or_default();
        v.check(
            password.chars().count() >= MIN_PASSWORD_LEN,
            "password",
            "Password must be at least 6 characters",
        );
        let phone = v.optional_text("phone", self.phone.as_deref(), 30);
        let address = v.optional_text("address", self.address.as_deref(), 200);
        let city = v.optional_text("city", self.city.as_deref(), 100);
        let state = v.optional_text("state", self.state.as_deref(), 100);
        let zip_code = v.optional_text("zipCode", self.zip_code.as_deref(), 20);
        v.finish()?;

        Ok(NewUser {
            name: name.unwrap_or_default(),
            email,
            password_hash: password_hash(&password)?,
            phone,
            address,
            city,
            state,
            zip_code,
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, ApiResponse<AuthPayload>)> {
    let new_user = req.validate(hash_password)?;

    if users::find_by_email(&state.pool, &new_user.email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let user = users::insert(&state.pool, &new_user).await.map_err(|e| {
        if db::is_unique_violation(&e) {
            AppError::Conflict("User already exists".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    let (token, expires_at) = issue_token(
        &user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;
    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(AuthPayload {
            token,
            expires_at,
            user: user.profile(),
        })
        .with_message("User registered successfully"),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthPayload>> {
    let email = req.email.as_deref().map(normalize_email).unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let mut v = Validator::new();
    v.check(EMAIL_RE.is_match(&email), "email", "Please provide a valid email");
    v.check(!password.is_empty(), "password", "Password is required");
    v.finish()?;

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
    let user = users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&password, &user.password_hash)? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    let (token, expires_at) = issue_token(
        &user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    Ok(ApiResponse::ok(AuthPayload {
        token,
        expires_at,
        user: user.profile(),
    })
    .with_message("Login successful"))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> AppResult<ApiResponse<Profile>> {
    let user = users::find_by_id(&state.pool, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::ok(user.profile()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}
