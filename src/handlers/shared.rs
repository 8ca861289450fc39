use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

use crate::services::approval::ChangeOutcome;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    // Success with data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    // Success with message
    pub fn success_with_message(data: Option<T>, message: &str) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.to_string()),
        }
    }

    // Error with data (e.g., validation errors)
    pub fn error_with_data(data: T, message: &str) -> Self {
        Self {
            success: false,
            data: Some(data),
            message: Some(message.to_string()),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with data
    pub fn ok(data: T) -> HttpResponse {
        HttpResponse::Ok().json(Self::success(data))
    }

    /// 201 with data
    pub fn created(data: T) -> HttpResponse {
        HttpResponse::Created().json(Self::success(data))
    }

    /// 202 with data and message, used when a change is queued for review
    pub fn accepted(data: T, message: &str) -> HttpResponse {
        HttpResponse::Accepted().json(Self::success_with_message(Some(data), message))
    }
}

impl ApiResponse<()> {
    // Error response (no data)
    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn message(message: &str) -> HttpResponse {
        HttpResponse::Ok().json(Self::success_with_message(None, message))
    }
}

/// 200 when a sensitive change went through, 202 when it waits for review
pub fn change_response(outcome: ChangeOutcome, applied_message: &str) -> HttpResponse {
    match outcome {
        ChangeOutcome::Applied(data) => HttpResponse::Ok().json(ApiResponse::success_with_message(
            Some(data),
            applied_message,
        )),
        ChangeOutcome::Queued(request) => {
            ApiResponse::accepted(request, "Change submitted for approval")
        }
    }
}

/// Common pagination query parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::error("nope")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "nope");
        assert!(body["data"].is_null());
    }

    #[test]
    fn test_applied_change_is_ok() {
        let response = change_response(
            ChangeOutcome::Applied(serde_json::json!({"id": 1})),
            "Worker updated",
        );
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(p.limit(), Pagination::MAX_LIMIT);
        assert_eq!(p.offset(), 0);
        assert_eq!(Pagination::default().limit(), Pagination::DEFAULT_LIMIT);
    }
}
