use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    PayloadTooLarge,
    Internal,
}

/// JSON body of every non-2xx server response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::new(ErrorCode::Validation, value.to_string())
    }
}

/// Client-side field checks. Blocks submission; never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("item name must not be empty")]
    EmptyName,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("quantity must be a whole number, got {0:?}")]
    InvalidQuantity(String),
    #[error("price must be a number, got {0:?}")]
    InvalidPrice(String),
    #[error("quantity must not be negative")]
    NegativeQuantity,
    #[error("price must not be negative")]
    NegativePrice,
}
