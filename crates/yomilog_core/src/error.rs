//! Error types for the yomilog engine.

use crate::bus::Channel;
use crate::entity::EntityId;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in yomilog engine operations.
///
/// Authentication and validation errors propagate to the caller.
/// Durable-medium failures never do: on the mutation path they are
/// logged and the operation continues in memory only.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A mutation that stamps an owner ran with no active session.
    #[error("not authenticated: an active session is required")]
    NotAuthenticated,

    /// Update or delete targeted an id that is not in the collection.
    #[error("{collection} record not found: {id}")]
    NotFound {
        /// The collection that was searched.
        collection: Channel,
        /// The id that was not found.
        id: EntityId,
    },

    /// Sign-up attempted with an email an existing account already uses.
    #[error("email already in use: {email}")]
    EmailAlreadyInUse {
        /// The conflicting email.
        email: String,
    },

    /// Sign-in credentials matched no account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The durable record store failed.
    #[error("record store error: {0}")]
    Storage(#[from] yomilog_store::StoreError),

    /// A persisted document could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The load/seed step of lazy initialization failed.
    ///
    /// This is logged during bootstrap; the store still transitions to
    /// ready with whatever partial state loaded.
    #[error("initialization failed: {message}")]
    InitializationFailed {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(collection: Channel, id: EntityId) -> Self {
        Self::NotFound { collection, id }
    }

    /// Creates an email-already-in-use error.
    pub fn email_already_in_use(email: impl Into<String>) -> Self {
        Self::EmailAlreadyInUse {
            email: email.into(),
        }
    }

    /// Creates an initialization-failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }
}
