use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::requests::{self, AcceptOutcome};
use crate::db::{self, food};
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthenticatedUser;
use crate::models::{FoodRequest, NewRequest, RequestModel, RequestStatus};
use crate::response::{ApiResponse, PageQuery, Pagination, REQUEST_PAGE_LIMIT};
use crate::routes::AppState;
use crate::validation::Validator;

const MAX_REQUEST_NOTE: usize = 500;
const MAX_MESSAGE: usize = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub food: Option<String>,
    pub message: Option<String>,
    pub requested_quantity: Option<i64>,
    pub pickup_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    pub message: Option<String>,
}

/// Shape-checked create payload; availability is checked against the store.
#[derive(Debug, PartialEq)]
pub struct RequestDraft {
    pub food_id: String,
    pub message: Option<String>,
    pub requested_quantity: i64,
    pub pickup_time: Option<DateTime<Utc>>,
}

impl CreateRequestBody {
    pub fn validate(self, now: DateTime<Utc>) -> AppResult<RequestDraft> {
        let mut v = Validator::new();

        let food_id = v.id("food", self.food.as_deref(), "Valid food ID is required");
        let message = v.optional_text("message", self.message.as_deref(), MAX_REQUEST_NOTE);
        let requested_quantity = self.requested_quantity.unwrap_or(1);
        v.check(
            requested_quantity >= 1,
            "requestedQuantity",
            "Requested quantity must be at least 1",
        );
        let pickup_time = match self.pickup_time.as_deref() {
            Some(raw) => {
                let parsed = v.timestamp("pickupTime", Some(raw), "Pickup time must be a valid date");
                if let Some(ts) = parsed {
                    v.check(ts > now, "pickupTime", "Pickup time must be in the future");
                }
                parsed
            }
            None => None,
        };

        v.finish()?;
        let food_id = food_id.ok_or_else(|| AppError::invalid_field("food", "Valid food ID is required"))?;

        Ok(RequestDraft {
            food_id,
            message,
            requested_quantity,
            pickup_time,
        })
    }
}

impl MessageBody {
    pub fn validate(self) -> AppResult<String> {
        let mut v = Validator::new();
        let body = v.text(
            "message",
            self.message.as_deref(),
            1,
            MAX_MESSAGE,
            "Message must be between 1 and 1000 characters",
        );
        v.finish()?;
        body.ok_or_else(|| AppError::invalid_field("message", "Message is required"))
    }
}

async fn load_request(state: &AppState, id: &str) -> AppResult<RequestModel> {
    requests::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Request not found".to_string()))
}

fn require_donor(request: &RequestModel, user_id: &str, action: &str) -> AppResult<()> {
    if request.donor_id != user_id {
        return Err(AppError::Forbidden(format!(
            "Not authorized to {} this request",
            action
        )));
    }
    Ok(())
}

fn require_participant(request: &RequestModel, user_id: &str) -> AppResult<()> {
    if !request.is_participant(user_id) {
        return Err(AppError::Forbidden(
            "Not authorized to access this request".to_string(),
        ));
    }
    Ok(())
}

async fn reload(state: &AppState, id: &str) -> AppResult<FoodRequest> {
    Ok(load_request(state, id).await?.to_request())
}

pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateRequestBody>,
) -> AppResult<(StatusCode, ApiResponse<FoodRequest>)> {
    let now = Utc::now();
    let draft = body.validate(now)?;

    let food = food::find_by_id(&state.pool, &draft.food_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Food item not found".to_string()))?;
    if !food.is_available(now) {
        return Err(AppError::InvalidState("Food item is not available".to_string()));
    }
    if food.donor_id == auth.user_id {
        return Err(AppError::InvalidState("Cannot request your own food".to_string()));
    }
    if draft.requested_quantity > food.quantity_amount {
        return Err(AppError::invalid_field(
            "requestedQuantity",
            &format!("Requested quantity cannot exceed {}", food.quantity_amount),
        ));
    }

    let duplicate = || AppError::InvalidState("You have already requested this food item".to_string());
    if requests::find_active(&state.pool, &food.id, &auth.user_id)
        .await?
        .is_some()
    {
        return Err(duplicate());
    }

    let id = requests::insert(
        &state.pool,
        &NewRequest {
            food_id: food.id.clone(),
            requester_id: auth.user_id.clone(),
            donor_id: food.donor_id.clone(),
            requested_quantity: draft.requested_quantity,
            pickup_time: draft.pickup_time,
            message: draft.message,
        },
    )
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            duplicate()
        } else {
            AppError::Database(e)
        }
    })?;
    tracing::info!("User {} requested food {} ({})", auth.user_id, food.id, id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(reload(&state, &id).await?).with_message("Request sent successfully"),
    ))
}

pub async fn sent_requests(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<ApiResponse<Vec<FoodRequest>>> {
    let page = query.resolve(REQUEST_PAGE_LIMIT)?;
    let (rows, total) = requests::list_sent(&state.pool, &auth.user_id, page).await?;
    let items = rows.iter().map(RequestModel::to_request).collect();
    Ok(ApiResponse::paginated(items, Pagination::new(page, total)))
}

pub async fn received_requests(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<ApiResponse<Vec<FoodRequest>>> {
    let page = query.resolve(REQUEST_PAGE_LIMIT)?;
    let (rows, total) = requests::list_received(&state.pool, &auth.user_id, page).await?;
    let items = rows.iter().map(RequestModel::to_request).collect();
    Ok(ApiResponse::paginated(items, Pagination::new(page, total)))
}

pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FoodRequest>> {
    let request = load_request(&state, &id.to_string()).await?;
    require_participant(&request, &auth.user_id)?;
    let messages = requests::list_messages(&state.pool, &request.id).await?;
    Ok(ApiResponse::ok(request.with_messages(messages)))
}

pub async fn accept_request(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FoodRequest>> {
    let request = load_request(&state, &id.to_string()).await?;
    require_donor(&request, &auth.user_id, "accept")?;

    let not_pending = || AppError::InvalidState("Request is not pending".to_string());
    if !request.status.can_transition_to(RequestStatus::Accepted) {
        return Err(not_pending());
    }

    match requests::accept(&state.pool, &request).await? {
        AcceptOutcome::Accepted { declined } => {
            tracing::info!(
                "Request {} accepted; food {} reserved for {}, {} other requests declined",
                request.id,
                request.food_id,
                request.requester_id,
                declined
            );
        }
        AcceptOutcome::FoodUnavailable => {
            return Err(AppError::InvalidState(
                "Food item is no longer available".to_string(),
            ));
        }
        AcceptOutcome::NotPending => return Err(not_pending()),
    }

    Ok(ApiResponse::ok(reload(&state, &request.id).await?)
        .with_message("Request accepted successfully"))
}

pub async fn decline_request(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FoodRequest>> {
    let request = load_request(&state, &id.to_string()).await?;
    require_donor(&request, &auth.user_id, "decline")?;

    if !request.status.can_transition_to(RequestStatus::Declined)
        || !requests::decline(&state.pool, &request.id).await?
    {
        return Err(AppError::InvalidState("Request is not pending".to_string()));
    }
    tracing::info!("Request {} declined", request.id);

    Ok(ApiResponse::ok(reload(&state, &request.id).await?).with_message("Request declined"))
}

pub async fn complete_request(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<FoodRequest>> {
    let request = load_request(&state, &id.to_string()).await?;
    require_participant(&request, &auth.user_id)?;

    if !request.status.can_transition_to(RequestStatus::Completed)
        || !requests::complete(&state.pool, &request).await?
    {
        return Err(AppError::InvalidState(
            "Request must be accepted before it can be completed".to_string(),
        ));
    }
    tracing::info!(
        "Request {} completed; food {} handed from {} to {}",
        request.id,
        request.food_id,
        request.donor_id,
        request.requester_id
    );

    Ok(ApiResponse::ok(reload(&state, &request.id).await?)
        .with_message("Transaction completed successfully"))
}

pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<MessageBody>,
) -> AppResult<(StatusCode, ApiResponse<FoodRequest>)> {
    let text = body.validate()?;
    let request = load_request(&state, &id.to_string()).await?;
    require_participant(&request, &auth.user_id)?;

    requests::add_message(&state.pool, &request.id, &auth.user_id, &text).await?;
    let request = load_request(&state, &request.id).await?;
    let messages = requests::list_messages(&state.pool, &request.id).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(request.with_messages(messages)).with_message("Message sent successfully"),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_request))
        .route("/sent", get(sent_requests))
        .route("/received", get(received_requests))
        .route("/:id", get(get_request))
        .route("/:id/accept", put(accept_request))
        .route("/:id/decline", put(decline_request))
        .route("/:id/complete", put(complete_request))
        .route("/:id/message", post(post_message))
}
