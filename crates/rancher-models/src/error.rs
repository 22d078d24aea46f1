//! Error types for the `rancher-models` crate.
//!
//! Validation of inbound requests and identifiers returns variants of
//! [`ModelError`].

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A cluster identifier was empty or contained URL delimiters.
    #[error("invalid cluster id \"{value}\": {reason}")]
    InvalidClusterId {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A required field was missing from the request.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },
}
