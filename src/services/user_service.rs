use axum::extract::State;
use axum::routing::{get, put};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::food::{self, HistoryKind};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthenticatedUser;
use crate::models::{FoodItem, FoodModel, GeoLocation, Profile, PublicProfile};
use crate::response::{ApiResponse, Page, PageQuery, Pagination, FOOD_PAGE_LIMIT};
use crate::routes::AppState;
use crate::validation::Validator;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: HistoryKind,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationBody {
    pub coordinates: Option<Vec<f64>>,
    pub address: Option<String>,
}

impl LocationBody {
    pub fn validate(self) -> AppResult<GeoLocation> {
        let mut v = Validator::new();
        let coordinates = v.coordinates("coordinates", self.coordinates.as_deref());
        let address = v.text(
            "address",
            self.address.as_deref(),
            5,
            200,
            "Address must be at least 5 characters",
        );
        v.finish()?;
        match (coordinates, address) {
            (Some(coordinates), Some(address)) => Ok(GeoLocation {
                coordinates,
                address,
            }),
            _ => Err(AppError::Internal("validated location is incomplete".to_string())),
        }
    }
}

fn listing_page(rows: Vec<FoodModel>, page: Page, total: i64) -> ApiResponse<Vec<FoodItem>> {
    let items = rows.iter().map(FoodModel::to_item).collect();
    ApiResponse::paginated(items, Pagination::new(page, total))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<PublicProfile>> {
    let user = users::find_by_id(&state.pool, &id.to_string())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::ok(user.public_profile()))
}

pub async fn get_user_food(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<ApiResponse<Vec<FoodItem>>> {
    let page = query.resolve(FOOD_PAGE_LIMIT)?;
    let id = id.to_string();
    if !users::exists(&state.pool, &id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    let (rows, total) = food::list_by_donor(&state.pool, &id, page).await?;
    Ok(listing_page(rows, page, total))
}

pub async fn saved_food(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<ApiResponse<Vec<FoodItem>>> {
    let page = query.resolve(FOOD_PAGE_LIMIT)?;
    let (rows, total) = food::list_saved(&state.pool, &auth.user_id, page).await?;
    Ok(listing_page(rows, page, total))
}

pub async fn history(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> AppResult<ApiResponse<Vec<FoodItem>>> {
    let page = Page::resolve(query.page, query.limit, FOOD_PAGE_LIMIT)?;
    let (rows, total) = food::list_history(&state.pool, &auth.user_id, query.kind, page).await?;
    Ok(listing_page(rows, page, total))
}

pub async fn update_location(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(body): ApiJson<LocationBody>,
) -> AppResult<ApiResponse<Profile>> {
    let location = body.validate()?;
    let [lng, lat] = location.coordinates;
    users::update_location(&state.pool, &auth.user_id, lng, lat, &location.address).await?;

    let user = users::find_by_id(&state.pool, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::ok(user.profile()).with_message("Location updated successfully"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/saved", get(saved_food))
        .route("/me/history", get(history))
        .route("/me/location", put(update_location))
        .route("/:id", get(get_user))
        .route("/:id/food", get(get_user_food))
}
