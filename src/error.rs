use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Classification handed to the transport layer. The core only classifies;
/// the HTTP surface decides what a kind means on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    NotFound,
    UnsupportedPath,
    TypeConversion,
    MissingRelationship,
    InvalidRequest,
    Conflict,
}

impl FailureKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            FailureKind::NotFound => StatusCode::NOT_FOUND,
            FailureKind::UnsupportedPath => StatusCode::NOT_IMPLEMENTED,
            FailureKind::TypeConversion => StatusCode::INTERNAL_SERVER_ERROR,
            FailureKind::MissingRelationship => StatusCode::INTERNAL_SERVER_ERROR,
            FailureKind::InvalidRequest => StatusCode::BAD_REQUEST,
            FailureKind::Conflict => StatusCode::CONFLICT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NotFound => "NotFound",
            FailureKind::UnsupportedPath => "UnsupportedPath",
            FailureKind::TypeConversion => "TypeConversionError",
            FailureKind::MissingRelationship => "MissingRelationship",
            FailureKind::InvalidRequest => "InvalidRequest",
            FailureKind::Conflict => "Conflict",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ODataError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnsupportedPath(String),

    /// A stored value could not be rendered under its declared type and facets.
    /// This is a data/schema mismatch, never a client error.
    #[error("cannot convert property '{property}': {reason}")]
    TypeConversion { property: String, reason: String },

    #[error("no relationship declared from '{source_type}' to '{target}'")]
    MissingRelationship { source_type: String, target: String },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Conflict(String),
}

impl ODataError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ODataError::NotFound(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        ODataError::UnsupportedPath(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ODataError::InvalidRequest(message.into())
    }

    pub fn conversion(property: &str, reason: impl Into<String>) -> Self {
        ODataError::TypeConversion {
            property: property.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ODataError::NotFound(_) => FailureKind::NotFound,
            ODataError::UnsupportedPath(_) => FailureKind::UnsupportedPath,
            ODataError::TypeConversion { .. } => FailureKind::TypeConversion,
            ODataError::MissingRelationship { .. } => FailureKind::MissingRelationship,
            ODataError::InvalidRequest(_) => FailureKind::InvalidRequest,
            ODataError::Conflict(_) => FailureKind::Conflict,
        }
    }
}

pub type ODataResult<T> = std::result::Result<T, ODataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_status_mapping() {
        assert_eq!(
            ODataError::not_found("x").kind().status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ODataError::unsupported("x").kind().status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ODataError::conversion("ID", "bad").kind().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let missing = ODataError::MissingRelationship {
            source_type: "Category".to_string(),
            target: "Supplier".to_string(),
        };
        assert_eq!(missing.kind(), FailureKind::MissingRelationship);
        assert_eq!(missing.kind().status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_messages() {
        let err = ODataError::conversion("Name", "exceeds max length 3");
        assert_eq!(
            err.to_string(),
            "cannot convert property 'Name': exceeds max length 3"
        );
        assert_eq!(err.kind().as_str(), "TypeConversionError");
    }
}
