use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Spin not eligible: {0}")]
    SpinNotEligible(String),

    #[error("No rewards configured: {0}")]
    NoRewardsConfigured(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 对外暴露的错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AppError::RestaurantNotFound(_) => "RESTAURANT_NOT_FOUND",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::SpinNotEligible(_) => "SPIN_NOT_ELIGIBLE",
            AppError::NoRewardsConfigured(_) => "NO_REWARDS_CONFIGURED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) | AppError::RestaurantNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidTransition(_) | AppError::SpinNotEligible(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                msg.clone()
            }
            AppError::SessionNotFound(id) => format!("Session {id} not found"),
            AppError::RestaurantNotFound(id) => format!("Restaurant {id} not found"),
            AppError::InvalidTransition(msg) => {
                log::warn!("Invalid transition: {msg}");
                msg.clone()
            }
            AppError::SpinNotEligible(msg) => {
                log::warn!("Spin rejected: {msg}");
                msg.clone()
            }
            AppError::NoRewardsConfigured(id) => {
                log::error!("No spinner slots configured for restaurant {id}");
                "No rewards configured".to_string()
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}
