//! Unified error type for Foodgram.
//!
//! Every fallible function in the crate returns [`Result`]. The API layer maps
//! each variant onto an HTTP status in `api::error`.

use thiserror::Error;

/// The primary error type for all Foodgram operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input rejected for a single named field
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// A membership row (favorite, cart entry, subscription) already exists
    #[error("{message}")]
    AlreadyPresent { message: String },

    /// A membership row that was asked to be removed does not exist
    #[error("{message}")]
    NotPresent { message: String },

    #[error("Cannot subscribe to yourself")]
    SelfSubscription,

    /// Authenticated, but not allowed to touch this object
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Missing or invalid credentials
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Could not allocate a free short link after {attempts} attempts")]
    ShortLinkExhausted { attempts: u32 },

    #[error("Password hashing failed: {message}")]
    PasswordHash { message: String },
}

impl Error {
    /// Shorthand for a [`Error::Validation`] on `field`.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] keyed by a numeric id.
    #[must_use]
    pub fn not_found(resource: &'static str, id: i64) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
