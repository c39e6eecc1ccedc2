//! Session identity and name key types
//!
//! This module defines the key types used to index the registry: the opaque
//! per-connection identity and the case-insensitive lookup key for names.

use uuid::Uuid;

/// Unique identifier for one live connection
///
/// Minted from 128 random bits when a connection is admitted. Never put on
/// the wire; it only indexes server-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a fresh random identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build an identity from a fixed value (tests and tooling)
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Raw UUID value
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Case-insensitive lookup key for a display name
///
/// `"Alice"`, `"ALICE"` and `"alice"` all map to the same key. The original
/// spelling is kept separately by the registry for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey(String);

impl NameKey {
    /// Fold a display name into its lookup key
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Folded form of the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NameKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for NameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
