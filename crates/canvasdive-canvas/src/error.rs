//! Error types for canvasdive-canvas
//!
//! This module provides error types for the canvas model, including
//! area-string parsing, lookups, layout validation and storage errors.

use thiserror::Error;
use uuid::Uuid;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed grid-area string
    #[error("invalid area string '{input}': {reason}")]
    AreaParse {
        /// The offending input
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Section not found
    #[error("section not found: {0}")]
    SectionNotFound(String),

    /// Item not found
    #[error("item not found: {0}")]
    ItemNotFound(Uuid),

    /// Canvas not found
    #[error("canvas not found: {0}")]
    CanvasNotFound(Uuid),

    /// Canvas type not found
    #[error("canvas type not found: {0}")]
    CanvasTypeNotFound(String),

    /// Section name already present on the canvas
    #[error("duplicate section: {0}")]
    DuplicateSection(String),

    /// Reorder request is not a permutation of the current sections
    #[error("invalid section order: {0}")]
    InvalidOrder(String),

    /// Grid template violates a layout invariant
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Rendering error
    #[error("rendering error: {0}")]
    Rendering(String),
}

impl Error {
    /// Create an area parse error
    #[must_use]
    pub fn area_parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AreaParse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid layout error
    #[must_use]
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    /// Create a database error
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Check if error is recoverable.
    ///
    /// Layout errors recover by falling back to the synthesized default layout.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AreaParse { .. } | Self::InvalidLayout(_))
    }

    /// Check if this is one of the not-found variants
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SectionNotFound(_)
                | Self::ItemNotFound(_)
                | Self::CanvasNotFound(_)
                | Self::CanvasTypeNotFound(_)
        )
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AreaParse { .. } => "area_parse_error",
            Self::SectionNotFound(_) => "section_not_found",
            Self::ItemNotFound(_) => "item_not_found",
            Self::CanvasNotFound(_) => "canvas_not_found",
            Self::CanvasTypeNotFound(_) => "canvas_type_not_found",
            Self::DuplicateSection(_) => "duplicate_section",
            Self::InvalidOrder(_) => "invalid_order",
            Self::InvalidLayout(_) => "invalid_layout",
            Self::Database(_) => "database_error",
            Self::Serialization(_) => "serialization_error",
            Self::Rendering(_) => "rendering_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::SectionNotFound("Key Partners".to_string());
        assert_eq!(err.code(), "section_not_found");

        let err = Error::area_parse("1 / 2", "expected 4 tokens");
        assert_eq!(err.code(), "area_parse_error");
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::area_parse("x", "bad").is_recoverable());
        assert!(Error::invalid_layout("overlap").is_recoverable());
        assert!(!Error::ItemNotFound(Uuid::nil()).is_recoverable());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(Error::CanvasNotFound(Uuid::nil()).is_not_found());
        assert!(Error::CanvasTypeNotFound("swot".into()).is_not_found());
        assert!(!Error::database("locked").is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = Error::area_parse("1 / 1 / 1 / 2", "rowEnd must exceed rowStart");
        let msg = err.to_string();
        assert!(msg.contains("invalid area string"));
        assert!(msg.contains("1 / 1 / 1 / 2"));
    }

    #[test]
    fn test_from_serde_error() {
        let result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        let err: Error = result.unwrap_err().into();
        assert_eq!(err.code(), "serialization_error");
    }
}
