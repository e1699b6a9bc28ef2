//! Error types for canvasdive-core
//!
//! Besides the error enum this module provides user-facing messages, so a
//! blocked dive shows an upgrade prompt rather than a stack of causes.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Canvas model or storage error
    #[error(transparent)]
    Canvas(#[from] canvasdive_canvas::Error),

    /// Provider error outside a generation boundary
    #[error("llm error: {0}")]
    Llm(#[from] canvasdive_llm::Error),

    /// No active entitlement for suggestion calls
    #[error("not entitled to generate suggestions")]
    NotEntitled,

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The suggestion collaborator failed or returned unusable output
    #[error("generation failed: {message}")]
    UpstreamGeneration {
        /// Human-readable failure
        message: String,
        /// Text streamed before the failure, if any
        partial: Option<String>,
    },

    /// Dive state machine rejected a transition
    #[error("invalid dive transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// A response arrived for a generation run that is no longer active
    #[error("generation run superseded")]
    StaleRun,

    /// Referenced canvas type is not in the catalog
    #[error("canvas type not found: {0}")]
    CanvasTypeNotFound(String),
}

impl Error {
    /// Create an upstream generation error without partial content
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamGeneration {
            message: message.into(),
            partial: None,
        }
    }

    /// Create an upstream generation error carrying streamed content
    #[must_use]
    pub fn upstream_with_partial(message: impl Into<String>, partial: impl Into<String>) -> Self {
        let partial = partial.into();
        Self::UpstreamGeneration {
            message: message.into(),
            partial: (!partial.is_empty()).then_some(partial),
        }
    }

    /// Create an invalid transition error
    #[must_use]
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether a referenced section, item, canvas or canvas type is missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Canvas(e) => e.is_not_found(),
            Self::CanvasTypeNotFound(_) => true,
            _ => false,
        }
    }

    /// Whether the error should surface as an upgrade or login prompt
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::NotEntitled | Self::Unauthorized(_))
    }

    /// Partial streamed content preserved by a failed generation
    #[must_use]
    pub fn partial(&self) -> Option<&str> {
        match self {
            Self::UpstreamGeneration { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Canvas(e) => e.code(),
            Self::Llm(_) => "llm_error",
            Self::NotEntitled => "not_entitled",
            Self::Unauthorized(_) => "unauthorized",
            Self::UpstreamGeneration { .. } => "upstream_generation",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::StaleRun => "stale_run",
            Self::CanvasTypeNotFound(_) => "canvas_type_not_found",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::NotEntitled => "Suggestions require an active subscription.".to_string(),
            Error::Unauthorized(_) => "You need to sign in to use suggestions.".to_string(),
            Error::UpstreamGeneration { message, .. } => {
                format!("Suggestion generation failed: {}", message)
            }
            Error::StaleRun => "This generation was replaced by a newer one.".to_string(),
            e if e.is_not_found() => format!("Not found: {}", e),
            e => e.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::NotEntitled => Some("Upgrade your plan to unlock AI suggestions.".to_string()),
            Error::Unauthorized(_) => Some("Log in and try again.".to_string()),
            Error::UpstreamGeneration { partial: Some(_), .. } => {
                Some("The text received so far was kept; retry to finish it.".to_string())
            }
            Error::UpstreamGeneration { .. } => Some("Retry in a moment.".to_string()),
            Error::Canvas(canvasdive_canvas::Error::AreaParse { .. }) => {
                Some("The default layout will be used instead.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    if let Some(suggestion) = error.suggestion() {
        output.push_str("\n\n");
        output.push_str(&suggestion);
    }
    output
}
