//! Error types for tola-textdiff.
//!
//! A diff either completes or fails before any tokenization work starts.
//! Every error is raised while validating the configuration or the raw input.

use thiserror::Error;

use crate::split::Level;

/// Which of the two compared versions an input error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Old,
    New,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Old => "old",
            Side::New => "new",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid or unknown configuration options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A boundary pattern failed to compile
    #[error("invalid {level} pattern: {source}")]
    InvalidPattern {
        level: Level,
        #[source]
        source: Box<regex::Error>,
    },

    /// A boundary pattern matches the empty string and would never advance
    #[error("{level} pattern matches the empty string")]
    EmptyPatternMatch { level: Level },

    /// A limit that must be positive was zero
    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveLimit { field: &'static str, value: usize },

    /// A `min`/`max` pair is inverted
    #[error("{field}: min {min} exceeds max {max}")]
    InvertedRange {
        field: &'static str,
        min: usize,
        max: usize,
    },

    /// The configuration document could not be parsed (includes unknown keys)
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Input rejected before tokenization.
#[derive(Debug, Error)]
pub enum InputError {
    /// Input bytes are not valid UTF-8
    #[error("{side} text is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { side: Side, valid_up_to: usize },
}

/// Errors that can occur when computing a diff.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),
}

/// Result type alias for diff operations.
pub type DiffResult<T> = Result<T, DiffError>;

impl ConfigError {
    /// Create a pattern compilation error.
    pub fn pattern(level: Level, err: regex::Error) -> Self {
        Self::InvalidPattern {
            level,
            source: Box::new(err),
        }
    }

    /// Create a parse error from any error type.
    pub fn parse(err: impl std::error::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err)
    }
}
