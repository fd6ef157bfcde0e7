use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::food::{FoodCategory, FoodStatus};
use crate::models::user::UserSummary;

/// Request lifecycle. Moves forward only:
/// `pending -> accepted | declined`, `accepted -> completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
}

impl RequestStatus {
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Accepted)
                | (RequestStatus::Pending, RequestStatus::Declined)
                | (RequestStatus::Accepted, RequestStatus::Completed)
        )
    }
}

/// A `food_requests` row joined with food, requester and donor display fields.
#[derive(Debug, Clone, FromRow)]
pub struct RequestModel {
    pub id: String,
    pub food_id: String,
    pub food_title: String,
    pub food_category: FoodCategory,
    pub food_status: FoodStatus,
    pub requester_id: String,
    pub requester_name: String,
    pub requester_profile_image: Option<String>,
    pub donor_id: String,
    pub donor_name: String,
    pub donor_profile_image: Option<String>,
    pub status: RequestStatus,
    pub requested_quantity: i64,
    pub pickup_time: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub food_id: String,
    pub requester_id: String,
    pub donor_id: String,
    pub requested_quantity: i64,
    pub pickup_time: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSummary {
    pub id: String,
    pub title: String,
    pub category: FoodCategory,
    pub status: FoodStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodRequest {
    pub id: String,
    pub food: FoodSummary,
    pub requester: UserSummary,
    pub donor: UserSummary,
    pub status: RequestStatus,
    pub requested_quantity: i64,
    pub pickup_time: Option<DateTime<Utc>>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<RequestMessage>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestModel {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.donor_id == user_id || self.requester_id == user_id
    }

    pub fn to_request(&self) -> FoodRequest {
        FoodRequest {
            id: self.id.clone(),
            food: FoodSummary {
                id: self.food_id.clone(),
                title: self.food_title.clone(),
                category: self.food_category,
                status: self.food_status,
            },
            requester: UserSummary {
                id: self.requester_id.clone(),
                name: self.requester_name.clone(),
                profile_image: self.requester_profile_image.clone(),
            },
            donor: UserSummary {
                id: self.donor_id.clone(),
                name: self.donor_name.clone(),
                profile_image: self.donor_profile_image.clone(),
            },
            status: self.status,
            requested_quantity: self.requested_quantity,
            pickup_time: self.pickup_time,
            message: self.message.clone(),
            messages: None,
            responded_at: self.responded_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn with_messages(&self, messages: Vec<RequestMessage>) -> FoodRequest {
        FoodRequest {
            messages: Some(messages),
            ..self.to_request()
        }
    }
}
