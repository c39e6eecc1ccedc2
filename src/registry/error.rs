//! Registry error types
//!
//! Error types for client registry operations.

use thiserror::Error;

use super::id::SessionId;

/// Error type for registry operations
///
/// Everything except `UnknownRecipient` signals a programming defect: the
/// caller broke the register/unregister pairing or the indices drifted apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The identity is already registered
    #[error("session already registered: {0}")]
    DuplicateIdentity(SessionId),
    /// The identity is not registered
    #[error("session not registered: {0}")]
    UnknownIdentity(SessionId),
    /// The name and sink indices disagree
    #[error("registry index desync for session {id}: {detail}")]
    IndexDesync {
        /// Session whose entries are inconsistent
        id: SessionId,
        /// What was found to be inconsistent
        detail: &'static str,
    },
    /// No session claims the requested name (strict routing only)
    #[error("no session named {0:?}")]
    UnknownRecipient(String),
}

impl RegistryError {
    /// Whether this error indicates corrupted or misused registry state
    pub fn is_invariant_violation(&self) -> bool {
        !matches!(self, RegistryError::UnknownRecipient(_))
    }
}
