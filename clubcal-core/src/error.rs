//! Error types for the ClubCalendar engine.

use thiserror::Error;

/// Errors that can occur outside the (infallible) filter pipeline.
#[derive(Error, Debug)]
pub enum ClubCalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed event feed: {0}")]
    Feed(String),

    #[error("Event fetch failed: {0}")]
    Fetch(String),

    #[error("Unknown {axis} filter '{value}'")]
    InvalidFilter { axis: &'static str, value: String },

    #[error("ICS generation error: {0}")]
    Ics(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClubCalError {
    pub fn invalid_filter(axis: &'static str, value: &str) -> Self {
        ClubCalError::InvalidFilter {
            axis,
            value: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClubCalError {
    fn from(e: serde_json::Error) -> Self {
        ClubCalError::Feed(e.to_string())
    }
}

impl From<config::ConfigError> for ClubCalError {
    fn from(e: config::ConfigError) -> Self {
        ClubCalError::Config(e.to_string())
    }
}

/// Result type alias for ClubCalendar operations.
pub type ClubCalResult<T> = Result<T, ClubCalError>;
