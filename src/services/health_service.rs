use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{food, requests, users};
use crate::error::AppResult;
use crate::models::{FoodStatus, RequestStatus};
use crate::response::ApiResponse;
use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCounts {
    pub pending: i64,
    pub accepted: i64,
    pub declined: i64,
    pub completed: i64,
    pub total: i64,
}

/// Community totals for the landing page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    pub users: i64,
    pub available_listings: i64,
    pub completed_shares: i64,
    pub requests: RequestCounts,
}

pub async fn health(State(state): State<AppState>) -> AppResult<ApiResponse<HealthStatus>> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(ApiResponse::ok(HealthStatus {
        status: "ok",
        database: "connected",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    }))
}

pub async fn stats(State(state): State<AppState>) -> AppResult<ApiResponse<CommunityStats>> {
    let pool = &state.pool;

    let request_counts = RequestCounts {
        pending: requests::count_by_status(pool, RequestStatus::Pending).await?,
        accepted: requests::count_by_status(pool, RequestStatus::Accepted).await?,
        declined: requests::count_by_status(pool, RequestStatus::Declined).await?,
        completed: requests::count_by_status(pool, RequestStatus::Completed).await?,
        total: requests::count(pool).await?,
    };

    Ok(ApiResponse::ok(CommunityStats {
        users: users::count(pool).await?,
        available_listings: food::count_by_status(pool, FoodStatus::Available).await?,
        completed_shares: food::count_by_status(pool, FoodStatus::Completed).await?,
        requests: request_counts,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
}
