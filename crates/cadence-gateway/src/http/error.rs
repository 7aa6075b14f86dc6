//! Error body shared by every control-surface route:
//! `{"error": "...", "code": "JOB_NOT_FOUND"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cadence_core::CadenceError;
use cadence_learner::LearnerError;
use cadence_scheduler::SchedulerError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "CAPACITY_EXCEEDED",
            message: message.into(),
        }
    }
}

impl From<CadenceError> for ApiError {
    fn from(e: CadenceError) -> Self {
        let status = match &e {
            CadenceError::Config(_) | CadenceError::Validation(_) => StatusCode::BAD_REQUEST,
            CadenceError::JobNotFound { .. } | CadenceError::TaskNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            CadenceError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Validation(msg) => CadenceError::Validation(msg).into(),
            SchedulerError::JobNotFound { id } => CadenceError::JobNotFound { id }.into(),
        }
    }
}

impl From<LearnerError> for ApiError {
    fn from(e: LearnerError) -> Self {
        match e {
            LearnerError::Validation(msg) => CadenceError::Validation(msg).into(),
            LearnerError::Store(inner) => inner.into(),
            LearnerError::Serialization(inner) => CadenceError::Serialization(inner).into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.message, "code": self.code })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_errors_map_to_status_and_code() {
        let e: ApiError = SchedulerError::JobNotFound { id: "x".into() }.into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);
        assert_eq!(e.code, "JOB_NOT_FOUND");

        let e: ApiError = SchedulerError::Validation("interval".into()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.code, "VALIDATION_ERROR");
    }
}
