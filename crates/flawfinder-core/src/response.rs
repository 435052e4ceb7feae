use serde::{Deserialize, Serialize};

use crate::error::FlawFinderError;

/// Standard envelope wrapped around every result handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::error(format!("{} not found", resource), "NOT_FOUND")
    }

    pub fn unauthorized() -> Self {
        Self::error("Unauthorized access", "UNAUTHORIZED")
    }

    pub fn forbidden() -> Self {
        Self::error("Access forbidden", "FORBIDDEN")
    }

    pub fn from_error(error: &FlawFinderError) -> Self {
        Self::error(error.to_string(), error.code())
    }
}
