use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::user::{GeoLocation, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum FoodCategory {
    Fruits,
    Vegetables,
    Grains,
    Protein,
    Dairy,
    PreparedMeals,
    BakedGoods,
    Beverages,
    PantryItems,
    Other,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 10] = [
        FoodCategory::Fruits,
        FoodCategory::Vegetables,
        FoodCategory::Grains,
        FoodCategory::Protein,
        FoodCategory::Dairy,
        FoodCategory::PreparedMeals,
        FoodCategory::BakedGoods,
        FoodCategory::Beverages,
        FoodCategory::PantryItems,
        FoodCategory::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuantityUnit {
    Servings,
    Pounds,
    Kilograms,
    Pieces,
    Containers,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FoodStatus {
    Available,
    Reserved,
    Completed,
    Cancelled,
}

impl FoodStatus {
    /// Listings can only be edited before anyone has been promised them.
    pub fn is_editable(self) -> bool {
        self == FoodStatus::Available
    }

    pub fn is_deletable(self) -> bool {
        self != FoodStatus::Reserved
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FoodStatus::Completed | FoodStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dietary {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: i64,
    pub unit: QuantityUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
}

/// A `food_items` row joined with its donor's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct FoodModel {
    pub id: String,
    pub donor_id: String,
    pub donor_name: String,
    pub donor_profile_image: Option<String>,
    pub title: String,
    pub description: String,
    pub category: FoodCategory,
    pub quantity_amount: i64,
    pub quantity_unit: QuantityUnit,
    pub expiry_date: Option<DateTime<Utc>>,
    pub longitude: f64,
    pub latitude: f64,
    pub pickup_address: String,
    pub pickup_instructions: Option<String>,
    #[sqlx(json)]
    pub images: Vec<String>,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub is_halal: bool,
    pub is_kosher: bool,
    pub is_gluten_free: bool,
    pub notes: Option<String>,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub status: FoodStatus,
    pub reserved_by: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload, already validated.
#[derive(Debug, Clone)]
pub struct NewFood {
    pub donor_id: String,
    pub title: String,
    pub description: String,
    pub category: FoodCategory,
    pub quantity: Quantity,
    pub expiry_date: Option<DateTime<Utc>>,
    pub location: GeoLocation,
    pub pickup_instructions: Option<String>,
    pub images: Vec<String>,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    pub dietary: Dietary,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update over the donor-editable field set. `None` leaves a column as is.
#[derive(Debug, Clone, Default)]
pub struct FoodUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Quantity>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
    pub dietary: Option<Dietary>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: String,
    pub donor: UserSummary,
    pub title: String,
    pub description: String,
    pub category: FoodCategory,
    pub quantity: Quantity,
    pub expiry_date: Option<DateTime<Utc>>,
    pub location: GeoLocation,
    pub pickup_instructions: Option<String>,
    pub images: Vec<String>,
    pub availability: Availability,
    pub dietary: Dietary,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub status: FoodStatus,
    pub reserved_by: Option<String>,
    pub views: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FoodModel {
    /// Open for new requests: not yet promised and the pickup window is still open.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.status == FoodStatus::Available && self.available_until > now
    }

    pub fn to_item(&self) -> FoodItem {
        FoodItem {
            id: self.id.clone(),
            donor: UserSummary {
                id: self.donor_id.clone(),
                name: self.donor_name.clone(),
                profile_image: self.donor_profile_image.clone(),
            },
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category,
            quantity: Quantity {
                amount: self.quantity_amount,
                unit: self.quantity_unit,
            },
            expiry_date: self.expiry_date,
            location: GeoLocation {
                coordinates: [self.longitude, self.latitude],
                address: self.pickup_address.clone(),
            },
            pickup_instructions: self.pickup_instructions.clone(),
            images: self.images.clone(),
            availability: Availability {
                available_from: self.available_from,
                available_until: self.available_until,
            },
            dietary: Dietary {
                is_vegetarian: self.is_vegetarian,
                is_vegan: self.is_vegan,
                is_halal: self.is_halal,
                is_kosher: self.is_kosher,
                is_gluten_free: self.is_gluten_free,
            },
            notes: self.notes.clone(),
            tags: self.tags.clone(),
            status: self.status,
            reserved_by: self.reserved_by.clone(),
            views: self.views,
            distance_km: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
