use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid workflow XML: {message}")]
    InvalidXml { message: String },

    #[error("Invalid query expression: {message}")]
    InvalidQuery { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_xml(message: impl Into<String>) -> Self {
        Self::InvalidXml {
            message: message.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Workflow 42 not found in bucket 1");
        assert_eq!(
            error.to_string(),
            "Not found: Workflow 42 not found in bucket 1"
        );
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Missing file part");
        assert_eq!(error.to_string(), "Validation error: Missing file part");
    }

    #[test]
    fn test_invalid_xml_error() {
        let error = DomainError::invalid_xml("mismatched end tag at position 12");
        assert_eq!(
            error.to_string(),
            "Invalid workflow XML: mismatched end tag at position 12"
        );
    }

    #[test]
    fn test_conflict_error() {
        let error = DomainError::conflict("Bucket 'tools' already exists");
        assert_eq!(error.to_string(), "Conflict: Bucket 'tools' already exists");
    }
}
