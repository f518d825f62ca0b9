//! # Error Hierarchy
//!
//! Structured error types for the core primitives, built with `thiserror`.
//! Each variant carries the rejected input so operators can diagnose bad
//! data without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes and arithmetic helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Tax identification number is the empty string.
    #[error("tax identification number must be non-empty")]
    EmptyTin,

    /// Account address is not `0x` followed by 40 hex digits.
    #[error("invalid address: \"{0}\" (expected 0x followed by 40 hex digits)")]
    InvalidAddress(String),

    /// Tax category literal is not a member of the closed enumeration.
    #[error("invalid tax category: \"{0}\"")]
    InvalidCategory(String),

    /// Content digest string is not `sha256:` followed by 64 hex digits.
    #[error("invalid content digest: \"{0}\"")]
    InvalidDigest(String),

    /// Integer arithmetic overflowed its representation.
    #[error("arithmetic overflow computing {operation}")]
    ArithmeticOverflow {
        /// The computation that overflowed.
        operation: &'static str,
    },

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer for amounts: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
