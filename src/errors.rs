use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::error;
use thiserror::Error;

use crate::domain::discount::DiscountRejection;
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { message: String, code: &'static str },

    #[error("{message}")]
    Forbidden { message: String, code: &'static str },

    #[error("{message}")]
    NotFound { message: String, code: &'static str },

    #[error("{message}")]
    Conflict { message: String, code: &'static str },

    #[error("{message}")]
    Unprocessable { message: String, code: &'static str },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn missing_actor(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            code: "MISSING_ACTOR",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Unprocessable { code, .. } => code,
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::EmptyCart => AppError::BadRequest {
                message,
                code: "EMPTY_CART",
            },
            DomainError::InvalidInput(_) => AppError::BadRequest {
                message,
                code: "INVALID_INPUT",
            },
            DomainError::NotOrderOwner => AppError::Forbidden {
                message,
                code: "NOT_ORDER_OWNER",
            },
            DomainError::Forbidden => AppError::Forbidden {
                message,
                code: "FORBIDDEN",
            },
            DomainError::OrderNotFound => AppError::NotFound {
                message,
                code: "ORDER_NOT_FOUND",
            },
            DomainError::ProductNotFound(_) => AppError::NotFound {
                message,
                code: "PRODUCT_NOT_FOUND",
            },
            DomainError::Discount(DiscountRejection::NotFound) => AppError::NotFound {
                message,
                code: DiscountRejection::NotFound.code(),
            },
            DomainError::Discount(rejection) => AppError::Unprocessable {
                message,
                code: rejection.code(),
            },
            DomainError::InsufficientStock { .. } => AppError::Conflict {
                message,
                code: "INSUFFICIENT_STOCK",
            },
            DomainError::ProductInactive(_) => AppError::Conflict {
                message,
                code: "PRODUCT_INACTIVE",
            },
            DomainError::InvalidStateTransition { .. } => AppError::Conflict {
                message,
                code: "INVALID_STATE_TRANSITION",
            },
            DomainError::Conflict(_) => AppError::Conflict {
                message,
                code: "CONFLICT",
            },
            DomainError::NonPositiveTotal => AppError::Unprocessable {
                message,
                code: "NON_POSITIVE_TOTAL",
            },
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": message,
            "code": self.code()
        }))
    }
}
