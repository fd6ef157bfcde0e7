//! Field-level input checks that collect every failure before rejecting.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldError};
use crate::geo::is_valid_coordinate;

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.error(field, message);
        }
    }

    /// Trims and checks the length in characters. Returns the trimmed value
    /// when it passes.
    pub fn text(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
        message: &str,
    ) -> Option<String> {
        let trimmed = value.map(str::trim).unwrap_or_default();
        let len = trimmed.chars().count();
        if value.is_none() || len < min || len > max {
            self.error(field, message);
            return None;
        }
        Some(trimmed.to_string())
    }

    /// Like [`Validator::text`] for fields that may be left out; empty
    /// strings count as absent.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
        if trimmed.chars().count() > max {
            self.error(field, &format!("{} must be at most {} characters", field, max));
            return None;
        }
        Some(trimmed.to_string())
    }

    pub fn timestamp(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<DateTime<Utc>> {
        let parsed = value.and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok());
        match parsed {
            Some(ts) => Some(ts.with_timezone(&Utc)),
            None => {
                self.error(field, message);
                None
            }
        }
    }

    /// `[longitude, latitude]`
    pub fn coordinates(&mut self, field: &str, value: Option<&[f64]>) -> Option<[f64; 2]> {
        match value {
            Some([lng, lat]) if is_valid_coordinate(*lng, *lat) => Some([*lng, *lat]),
            _ => {
                self.error(
                    field,
                    "Coordinates must be an array of [longitude, latitude]",
                );
                None
            }
        }
    }

    pub fn id(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<String> {
        match value.and_then(|v| Uuid::parse_str(v.trim()).ok()) {
            Some(id) => Some(id.to_string()),
            None => {
                self.error(field, message);
                None
            }
        }
    }

    pub fn string_list(&mut self, field: &str, value: Option<Vec<String>>, max_items: usize) -> Vec<String> {
        let items: Vec<String> = value
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if items.len() > max_items {
            self.error(field, &format!("At most {} {} are allowed", max_items, field));
        }
        items
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}
