use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub location_address: Option<String>,
    pub is_verified: bool,
    pub food_shared: i64,
    pub food_received: i64,
    pub active_listings: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub food_shared: i64,
    pub food_received: i64,
    pub active_listings: i64,
}

/// What anyone may see about a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<GeoLocation>,
    pub is_verified: bool,
    pub stats: UserStats,
    pub created_at: DateTime<Utc>,
}

/// The caller's own profile: public fields plus contact details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub public: PublicProfile,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
}

/// Compact user reference embedded in listings and requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub profile_image: Option<String>,
}

impl UserModel {
    pub fn location(&self) -> Option<GeoLocation> {
        match (self.longitude, self.latitude, &self.location_address) {
            (Some(lng), Some(lat), Some(address)) => Some(GeoLocation {
                coordinates: [lng, lat],
                address: address.clone(),
            }),
            _ => None,
        }
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            profile_image: self.profile_image.clone(),
            bio: self.bio.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            location: self.location(),
            is_verified: self.is_verified,
            stats: UserStats {
                food_shared: self.food_shared,
                food_received: self.food_received,
                active_listings: self.active_listings,
            },
            created_at: self.created_at,
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            public: self.public_profile(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            zip_code: self.zip_code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserModel {
        let now = Utc::now();
        UserModel {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$v=19$...".to_string(),
            phone: Some("555-0100".to_string()),
            address: None,
            city: Some("Springfield".to_string()),
            state: None,
            zip_code: None,
            profile_image: None,
            bio: None,
            longitude: Some(-122.4),
            latitude: Some(37.7),
            location_address: Some("1 Market St".to_string()),
            is_verified: false,
            food_shared: 2,
            food_received: 1,
            active_listings: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_public_profile_hides_credentials_and_contact() {
        let json = serde_json::to_value(sample_user().public_profile()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("email").is_none());
        assert!(json.get("phone").is_none());
        assert_eq!(json["stats"]["foodShared"], 2);
        assert_eq!(json["location"]["coordinates"][0], -122.4);
    }

    #[test]
    fn test_own_profile_includes_contact() {
        let json = serde_json::to_value(sample_user().profile()).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["name"], "Ada");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_location_requires_all_parts() {
        let mut user = sample_user();
        user.location_address = None;
        assert!(user.location().is_none());
    }
}
