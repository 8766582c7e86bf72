//! Structured error types for configuration resolution.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookup errors
    NotFound,

    // Document and template errors
    Invalid,
    UnknownFunction,

    // Recursion errors
    RecursiveInclusion,
    SubstitutionDepthExceeded,
    CyclicReference,

    // Internal errors
    Io,
}

/// Structured error raised by sources, functions and the resolver.
#[derive(Debug, Serialize)]
pub struct ConfigError {
    pub code: ErrorCode,
    pub message: String,
    /// Dotted key being resolved when the error happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Document or file reference involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl ConfigError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            key: None,
            reference: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Prefix the message with context while keeping the code, so callers can
    /// still match on the original failure kind.
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }

    // Convenience constructors

    pub fn key_not_found(key: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("Unable to find \"{}\" key in configuration", key),
        )
        .with_key(key)
    }

    pub fn constant_not_found(name: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("Constant not defined: {}", name),
        )
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("File \"{}\" not found", path)).with_reference(path)
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Invalid, reason)
    }

    pub fn invalid_document(reference: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Invalid,
            format!("Not a valid configuration document \"{}\": {}", reference, reason),
        )
        .with_reference(reference)
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownFunction,
            format!("Unknown function: {}", name),
        )
    }

    pub fn recursive_inclusion(reference: &str) -> Self {
        Self::new(
            ErrorCode::RecursiveInclusion,
            format!(
                "Recursive configuration inclusion/extend for file \"{}\"",
                reference
            ),
        )
        .with_reference(reference)
    }

    pub fn depth_exceeded(limit: usize) -> Self {
        Self::new(
            ErrorCode::SubstitutionDepthExceeded,
            format!("Substitution exceeded the maximum depth of {}", limit),
        )
    }

    pub fn cyclic_reference(key: &str) -> Self {
        Self::new(
            ErrorCode::CyclicReference,
            format!("Key \"{}\" references itself", key),
        )
        .with_key(key)
    }

    pub fn io(reference: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Io,
            format!("Unable to load configuration file \"{}\": {}", reference, err),
        )
        .with_reference(reference)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
