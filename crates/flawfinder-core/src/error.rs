use thiserror::Error;

/// Why an uploaded workflow file could not be turned into steps.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("content is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Invalid JSON format: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("CSV header row is empty")]
    EmptyCsvHeader,

    #[error("Failed to parse CSV file: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors surfaced by the FlawFinder core and its persistence collaborator.
#[derive(Error, Debug)]
pub enum FlawFinderError {
    #[error("Failed to process file: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid file type '{0}'. Only CSV and JSON files are supported.")]
    UnsupportedContentType(String),

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Report already exists for workflow {workflow_id}")]
    AlreadyExists { workflow_id: u64 },

    #[error("You don't have permission to {action}")]
    Forbidden { action: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Only raised inside the external analyzer; callers always get the
    /// mock result instead.
    #[error("External analysis failed: {0}")]
    ExternalAnalysis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlawFinderError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        FlawFinderError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn forbidden(action: impl Into<String>) -> Self {
        FlawFinderError::Forbidden {
            action: action.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FlawFinderError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable code used in response envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            FlawFinderError::Parse(_) | FlawFinderError::UnsupportedContentType(_) => {
                "BAD_REQUEST"
            }
            FlawFinderError::NotFound { .. } => "NOT_FOUND",
            FlawFinderError::AlreadyExists { .. } => "ALREADY_EXISTS",
            FlawFinderError::Forbidden { .. } => "FORBIDDEN",
            FlawFinderError::Validation { .. } => "VALIDATION_ERROR",
            FlawFinderError::ExternalAnalysis(_)
            | FlawFinderError::Config(_)
            | FlawFinderError::Io(_)
            | FlawFinderError::Json(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, FlawFinderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FlawFinderError::not_found("Workflow").to_string(),
            "Workflow not found"
        );
        assert_eq!(
            FlawFinderError::AlreadyExists { workflow_id: 3 }.to_string(),
            "Report already exists for workflow 3"
        );
        assert_eq!(
            FlawFinderError::forbidden("view this report").to_string(),
            "You don't have permission to view this report"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(FlawFinderError::not_found("Flaw").code(), "NOT_FOUND");
        assert_eq!(
            FlawFinderError::Parse(ParseError::EmptyCsvHeader).code(),
            "BAD_REQUEST"
        );
        assert_eq!(
            FlawFinderError::ExternalAnalysis("boom".to_string()).code(),
            "INTERNAL_SERVER_ERROR"
        );
    }
}
