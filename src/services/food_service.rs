use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::food::{self, DeleteOutcome, FoodFilter, GeoFilter};
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthenticatedUser;
use crate::models::{
    Dietary, FoodCategory, FoodItem, FoodModel, FoodUpdate, GeoLocation, NewFood, Quantity,
    QuantityUnit,
};
use crate::response::{ApiResponse, Page, Pagination, FOOD_PAGE_LIMIT};
use crate::routes::AppState;
use crate::validation::Validator;

const MAX_IMAGES: usize = 10;
const MAX_TAGS: usize = 10;
const MAX_NOTES: usize = 500;
const MAX_PICKUP_INSTRUCTIONS: usize = 500;
const DEFAULT_RADIUS_KM: f64 = 10.0;
const MAX_RADIUS_KM: f64 = 50.0;

/// Parses a wire-format enum value such as `"prepared-meals"`.
fn parse_enum<T: DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string())).ok()
}

#[derive(Debug, Default, Deserialize)]
pub struct QuantityBody {
    pub amount: Option<i64>,
    pub unit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationBody {
    pub coordinates: Option<Vec<f64>>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityBody {
    pub available_from: Option<String>,
    pub available_until: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFoodRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<QuantityBody>,
    pub expiry_date: Option<String>,
    pub location: Option<LocationBody>,
    pub pickup_instructions: Option<String>,
    pub images: Option<Vec<String>>,
    pub availability: Option<AvailabilityBody>,
    pub dietary: Option<Dietary>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Fields outside the editable set are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFoodRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<QuantityBody>,
    pub availability: Option<AvailabilityBody>,
    pub dietary: Option<Dietary>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub is_halal: bool,
    #[serde(default)]
    pub is_kosher: bool,
    #[serde(default)]
    pub is_gluten_free: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveResult {
    pub saved: bool,
}

fn validate_title(v: &mut Validator, title: Option<&str>) -> Option<String> {
    v.text("title", title, 5, 100, "Title must be between 5 and 100 characters")
}

fn validate_description(v: &mut Validator, description: Option<&str>) -> Option<String> {
    v.text(
        "description",
        description,
        10,
        1000,
        "Description must be between 10 and 1000 characters",
    )
}

fn validate_quantity(v: &mut Validator, body: &QuantityBody) -> Option<Quantity> {
    let amount = body.amount.filter(|a| *a >= 1);
    v.check(amount.is_some(), "quantity.amount", "Quantity amount must be at least 1");
    let unit = body.unit.as_deref().and_then(parse_enum::<QuantityUnit>);
    v.check(unit.is_some(), "quantity.unit", "Invalid quantity unit");
    Some(Quantity {
        amount: amount?,
        unit: unit?,
    })
}

impl CreateFoodRequest {
    pub fn validate(self, donor_id: &str, now: DateTime<Utc>) -> AppResult<NewFood> {
        let mut v = Validator::new();

        let title = validate_title(&mut v, self.title.as_deref());
        let description = validate_description(&mut v, self.description.as_deref());

        let category = self.category.as_deref().and_then(parse_enum::<FoodCategory>);
        v.check(category.is_some(), "category", "Invalid category");

        let quantity = validate_quantity(&mut v, &self.quantity.unwrap_or_default());

        let location = self.location.unwrap_or_default();
        let coordinates = v.coordinates("location.coordinates", location.coordinates.as_deref());
        let address = v.text(
            "location.address",
            location.address.as_deref(),
            5,
            200,
            "Pickup address must be at least 5 characters",
        );

        let availability = self.availability.unwrap_or_default();
        let available_from = match availability.available_from.as_deref() {
            Some(raw) => v.timestamp(
                "availability.availableFrom",
                Some(raw),
                "Available from must be a valid date",
            ),
            None => Some(now),
        };
        let available_until = v.timestamp(
            "availability.availableUntil",
            availability.available_until.as_deref(),
            "Available until must be a valid date",
        );
        if let Some(until) = available_until {
            v.check(
                until > now,
                "availability.availableUntil",
                "Available until must be in the future",
            );
            if let Some(from) = available_from {
                v.check(
                    until > from,
                    "availability.availableUntil",
                    "Available until must be after available from",
                );
            }
        }

        let expiry_date = match self.expiry_date.as_deref() {
            Some(raw) => v.timestamp("expiryDate", Some(raw), "Expiry date must be a valid date"),
            None => None,
        };

        let pickup_instructions = v.optional_text(
            "pickupInstructions",
            self.pickup_instructions.as_deref(),
            MAX_PICKUP_INSTRUCTIONS,
        );
        let images = v.string_list("images", self.images, MAX_IMAGES);
        let notes = v.optional_text("notes", self.notes.as_deref(), MAX_NOTES);
        let tags = v.string_list("tags", self.tags, MAX_TAGS);

        v.finish()?;

        match (title, description, category, quantity, coordinates, address, available_from, available_until) {
            (
                Some(title),
                Some(description),
                Some(category),
                Some(quantity),
                Some(coordinates),
                Some(address),
                Some(available_from),
                Some(available_until),
            ) => Ok(NewFood {
                donor_id: donor_id.to_string(),
                title,
                description,
                category,
                quantity,
                expiry_date,
                location: GeoLocation {
                    coordinates,
                    address,
                },
                pickup_instructions,
                images,
                available_from,
                available_until,
                dietary: self.dietary.unwrap_or_default(),
                notes,
                tags,
            }),
            _ => Err(AppError::Internal("validated listing is incomplete".to_string())),
        }
    }
}

impl UpdateFoodRequest {
    /// Checks each present field the way create does. The window is checked
    /// against the listing's current bounds for whichever side is left out.
    pub fn validate(self, existing: &FoodModel, now: DateTime<Utc>) -> AppResult<FoodUpdate> {
        let mut v = Validator::new();
        let mut update = FoodUpdate::default();

        if self.title.is_some() {
            update.title = validate_title(&mut v, self.title.as_deref());
        }
        if self.description.is_some() {
            update.description = validate_description(&mut v, self.description.as_deref());
        }
        if let Some(quantity) = &self.quantity {
            update.quantity = validate_quantity(&mut v, quantity);
        }

        if let Some(availability) = &self.availability {
            if let Some(raw) = availability.available_from.as_deref() {
                update.available_from = v.timestamp(
                    "availability.availableFrom",
                    Some(raw),
                    "Available from must be a valid date",
                );
            }
            if let Some(raw) = availability.available_until.as_deref() {
                update.available_until = v.timestamp(
                    "availability.availableUntil",
                    Some(raw),
                    "Available until must be a valid date",
                );
                if let Some(until) = update.available_until {
                    v.check(
                        until > now,
                        "availability.availableUntil",
                        "Available until must be in the future",
                    );
                }
            }
            let from = update.available_from.unwrap_or(existing.available_from);
            let until = update.available_until.unwrap_or(existing.available_until);
            v.check(
                until > from,
                "availability.availableUntil",
                "Available until must be after available from",
            );
        }

        update.dietary = self.dietary;
        update.notes = v.optional_text("notes", self.notes.as_deref(), MAX_NOTES);
        if self.tags.is_some() {
            update.tags = Some(v.string_list("tags", self.tags, MAX_TAGS));
        }

        v.finish()?;
        Ok(update)
    }
}

impl FoodListQuery {
    pub fn into_filter(self) -> AppResult<(FoodFilter, Page)> {
        let page = Page::resolve(self.page, self.limit, FOOD_PAGE_LIMIT);
        let mut v = Validator::new();

        let category = match self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(raw) => {
                let parsed = parse_enum::<FoodCategory>(raw);
                v.check(parsed.is_some(), "category", "Invalid category");
                parsed
            }
            None => None,
        };

        let geo = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                let radius_km = self.radius.unwrap_or(DEFAULT_RADIUS_KM);
                v.check(
                    crate::geo::is_valid_coordinate(lng, lat),
                    "lat",
                    "Latitude and longitude are out of range",
                );
                v.check(
                    (1.0..=MAX_RADIUS_KM).contains(&radius_km),
                    "radius",
                    "Radius must be between 1 and 50 km",
                );
                Some(GeoFilter {
                    latitude: lat,
                    longitude: lng,
                    radius_km,
                })
            }
            (None, None) => None,
            _ => {
                v.error("lat", "Latitude and longitude must be provided together");
                None
            }
        };

        v.finish()?;
        let page = page?;

        let non_empty = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let filter = FoodFilter {
            category,
            city: non_empty(self.city),
            search: non_empty(self.search),
            dietary: Dietary {
                is_vegetarian: self.is_vegetarian,
                is_vegan: self.is_vegan,
                is_halal: self.is_halal,
                is_kosher: self.is_kosher,
                is_gluten_free: self.is_gluten_free,
            },
            geo,
        };
        Ok((filter, page))
    }
}

async fn load_owned(state: &AppState, id: &str, user_id: &str, action: &str) -> AppResult<FoodModel> {
    let food = food::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Food item not found".to_string()))?;
    if food.donor_id != user_id {
        return Err(AppError::Forbidden(format!(
            "Not authorized to {} this listing",
            action
        )));
    }
    Ok(food)
}

pub async fn list_food(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FoodListQuery>,
) -> AppResult<ApiResponse<Vec<FoodItem>>> {
    let (filter, page) = query.into_filter()?;
    let (rows, total) = food::list_available(&state.pool, &filter, page).await?;

    let items = rows
        .into_iter()
        .map(|(food, distance_km)| FoodItem {
            distance_km,
            ..food.to_item()
        })
        .collect();

    Ok(ApiResponse::paginated(items, Pagination::new(page, total)))
}

pub async fn categories() -> ApiResponse<Vec<FoodCategory>> {
    ApiResponse::ok(FoodCategory::ALL.to_vec())
}

pub async fn get_food(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FoodItem>> {
    let id = id.to_string();
    if food::increment_views(&state.pool, &id).await? == 0 {
        return Err(AppError::NotFound("Food item not found".to_string()));
    }
    let food = food::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Food item not found".to_string()))?;
    Ok(ApiResponse::ok(food.to_item()))
}

pub async fn create_food(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateFoodRequest>,
) -> AppResult<(StatusCode, ApiResponse<FoodItem>)> {
    let new_food = req.validate(&auth.user_id, Utc::now())?;
    let id = food::create(&state.pool, &new_food).await?;
    tracing::info!("User {} listed food {}", auth.user_id, id);

    let food = food::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("created listing {} not found", id)))?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(food.to_item()).with_message("Food listing created successfully"),
    ))
}

pub async fn update_food(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateFoodRequest>,
) -> AppResult<ApiResponse<FoodItem>> {
    let id = id.to_string();
    let existing = load_owned(&state, &id, &auth.user_id, "update").await?;
    let not_editable = || AppError::InvalidState("Cannot update listing that is not available".to_string());
    if !existing.status.is_editable() {
        return Err(not_editable());
    }

    let changes = req.validate(&existing, Utc::now())?;
    if food::update(&state.pool, &id, &changes).await? == 0 {
        return Err(not_editable());
    }

    let food = food::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Food item not found".to_string()))?;
    Ok(ApiResponse::ok(food.to_item()).with_message("Food listing updated successfully"))
}

pub async fn delete_food(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<()>> {
    let id = id.to_string();
    let existing = load_owned(&state, &id, &auth.user_id, "delete").await?;
    if !existing.status.is_deletable() {
        return Err(AppError::InvalidState(
            "Cannot delete reserved listing. Cancel the reservation first.".to_string(),
        ));
    }

    match food::delete(&state.pool, &existing).await? {
        DeleteOutcome::Deleted => {
            tracing::info!("Food {} deleted by donor {}", id, auth.user_id);
            Ok(ApiResponse::message("Food listing deleted successfully"))
        }
        DeleteOutcome::Cancelled { declined } => {
            tracing::info!(
                "Food {} cancelled by donor {}, {} pending requests declined",
                id,
                auth.user_id,
                declined
            );
            Ok(ApiResponse::message(
                "Food listing cancelled. It has request history and is kept as a record.",
            ))
        }
        DeleteOutcome::Retained => Err(AppError::InvalidState(
            "Listing has transaction history and cannot be deleted".to_string(),
        )),
    }
}

pub async fn toggle_save(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<SaveResult>> {
    let id = id.to_string();
    if food::find_by_id(&state.pool, &id).await?.is_none() {
        return Err(AppError::NotFound("Food item not found".to_string()));
    }

    let saved = food::toggle_save(&state.pool, &auth.user_id, &id).await?;
    let message = if saved {
        "Food item saved"
    } else {
        "Food item removed from saved"
    };
    Ok(ApiResponse::ok(SaveResult { saved }).with_message(message))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_food).post(create_food))
        .route("/categories", get(categories))
        .route("/:id", get(get_food).put(update_food).delete(delete_food))
        .route("/:id/save", post(toggle_save))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn body(value: serde_json::Value) -> CreateFoodRequest {
        serde_json::from_value(value).unwrap()
    }

    fn valid_body(until: DateTime<Utc>) -> serde_json::Value {
        json!({
            "title": "Fresh apples",
            "description": "A crate of apples from the garden",
            "category": "fruits",
            "quantity": { "amount": 5, "unit": "pounds" },
            "location": { "coordinates": [-122.4, 37.7], "address": "1 Market St" },
            "availability": { "availableUntil": until.to_rfc3339() },
            "dietary": { "isVegan": true },
            "tags": ["organic", "  "]
        })
    }

    fn fields(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_accepts_valid_listing() {
        let now = Utc::now();
        let food = body(valid_body(now + Duration::days(1)))
            .validate("donor", now)
            .unwrap();
        assert_eq!(food.category, FoodCategory::Fruits);
        assert_eq!(food.quantity.unit, QuantityUnit::Pounds);
        assert_eq!(food.available_from, now);
        assert!(food.dietary.is_vegan);
        assert_eq!(food.tags, vec!["organic".to_string()]);
    }

    #[test]
    fn test_create_collects_every_failure() {
        let now = Utc::now();
        let err = body(json!({
            "title": "abc",
            "category": "candy",
            "quantity": { "amount": 0, "unit": "pounds" },
            "location": { "coordinates": [200.0, 37.7], "address": "1 Market St" },
            "availability": { "availableUntil": (now - Duration::hours(1)).to_rfc3339() }
        }))
        .validate("donor", now)
        .unwrap_err();

        let fields = fields(err);
        for expected in [
            "title",
            "description",
            "category",
            "quantity.amount",
            "location.coordinates",
            "availability.availableUntil",
        ] {
            assert!(fields.iter().any(|f| f == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_create_rejects_window_ending_before_start() {
        let now = Utc::now();
        let mut value = valid_body(now + Duration::days(1));
        value["availability"]["availableFrom"] = json!((now + Duration::days(2)).to_rfc3339());
        let err = body(value).validate("donor", now).unwrap_err();
        assert_eq!(fields(err), vec!["availability.availableUntil"]);
    }

    #[test]
    fn test_create_limits_images() {
        let now = Utc::now();
        let mut value = valid_body(now + Duration::days(1));
        value["images"] = json!(vec!["img.png"; 11]);
        let err = body(value).validate("donor", now).unwrap_err();
        assert_eq!(fields(err), vec!["images"]);
    }

    #[test]
    fn test_list_query_pairs_coordinates() {
        let query = FoodListQuery {
            lat: Some(37.7),
            ..Default::default()
        };
        let err = query.into_filter().unwrap_err();
        assert_eq!(fields(err), vec!["lat"]);

        let query = FoodListQuery {
            lat: Some(37.7),
            lng: Some(-122.4),
            radius: Some(60.0),
            ..Default::default()
        };
        assert_eq!(fields(query.into_filter().unwrap_err()), vec!["radius"]);

        let query = FoodListQuery {
            lat: Some(37.7),
            lng: Some(-122.4),
            category: Some("dairy".to_string()),
            search: Some("  ".to_string()),
            ..Default::default()
        };
        let (filter, page) = query.into_filter().unwrap();
        assert_eq!(filter.geo.unwrap().radius_km, DEFAULT_RADIUS_KM);
        assert_eq!(filter.category, Some(FoodCategory::Dairy));
        assert!(filter.search.is_none());
        assert_eq!(page.limit, FOOD_PAGE_LIMIT);
    }
}
