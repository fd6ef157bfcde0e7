//! The JSON envelope shared by every endpoint, plus pagination helpers.

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, FieldError};

pub const MAX_PAGE_LIMIT: i64 = 50;
pub const FOOD_PAGE_LIMIT: i64 = 12;
pub const REQUEST_PAGE_LIMIT: i64 = 10;
/// Deepest row a page may start at.
pub const MAX_OFFSET: i64 = 1_000_000;

/// `{ success, data?, message?, pagination? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: Some(pagination),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        axum::Json(self).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: (total + page.limit - 1) / page.limit,
        }
    }
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn resolve(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> AppResult<Self> {
        let mut errors = Vec::new();

        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);
        let limit_ok = (1..=MAX_PAGE_LIMIT).contains(&limit);

        if page < 1 {
            errors.push(FieldError::new("page", "Page must be a positive integer"));
        } else if limit_ok && (page - 1).checked_mul(limit).map_or(true, |o| o > MAX_OFFSET) {
            errors.push(FieldError::new("page", "Page is out of range"));
        }

        if !limit_ok {
            errors.push(FieldError::new(
                "limit",
                format!("Limit must be between 1 and {}", MAX_PAGE_LIMIT),
            ));
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Plain `?page=&limit=` query for list endpoints without extra filters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn resolve(&self, default_limit: i64) -> AppResult<Page> {
        Page::resolve(self.page, self.limit, default_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::resolve(None, None, FOOD_PAGE_LIMIT).unwrap();
        assert_eq!(page, Page { page: 1, limit: 12 });
        assert_eq!(page.offset(), 0);

        let page = Page::resolve(Some(3), None, REQUEST_PAGE_LIMIT).unwrap();
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_page_bounds() {
        assert!(Page::resolve(Some(0), None, 10).is_err());
        assert!(Page::resolve(None, Some(0), 10).is_err());
        assert!(Page::resolve(None, Some(51), 10).is_err());
        assert!(Page::resolve(None, Some(50), 10).is_ok());

        match Page::resolve(Some(-1), Some(100), 10) {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_page_past_offset_cap_is_rejected() {
        match Page::resolve(Some(i64::MAX), Some(10), 10) {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "page");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let last = MAX_OFFSET / 10 + 1;
        assert_eq!(Page::resolve(Some(last), Some(10), 10).unwrap().offset(), MAX_OFFSET);
        assert!(Page::resolve(Some(last + 1), Some(10), 10).is_err());
    }

    #[test]
    fn test_offset_saturates() {
        let page = Page {
            page: i64::MAX,
            limit: 50,
        };
        assert_eq!(page.offset(), i64::MAX);
    }

    #[test]
    fn test_pagination_page_count() {
        let page = Page { page: 1, limit: 12 };
        assert_eq!(Pagination::new(page, 0).pages, 0);
        assert_eq!(Pagination::new(page, 12).pages, 1);
        assert_eq!(Pagination::new(page, 13).pages, 2);
    }

    #[test]
    fn test_envelope_skips_empty_fields() {
        let json = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "message": "done" }));
    }
}
