//! Client registry implementation
//!
//! The central registry that tracks live sessions, their outbound sinks and
//! the names they claim.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::{RegistryConfig, UnknownRecipientPolicy};
use super::error::RegistryError;
use super::id::{NameKey, SessionId};
use super::sink::ResponseSink;

/// One delivery target taken from a registry snapshot
#[derive(Clone)]
pub struct Target {
    /// Session the sink belongs to
    pub id: SessionId,
    /// Outbound handle for that session
    pub sink: Arc<dyn ResponseSink>,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target").field("id", &self.id).finish()
    }
}

/// The three indices, always mutated together under one lock
#[derive(Default)]
struct Indices {
    sink_by_id: HashMap<SessionId, Arc<dyn ResponseSink>>,
    ids_by_name: HashMap<NameKey, HashSet<SessionId>>,
    name_by_id: HashMap<SessionId, String>,
}

impl Indices {
    /// Drop `id`'s name claim, if any. Caller holds the write lock.
    ///
    /// Nothing is mutated unless both name indices agree.
    fn release_name(&mut self, id: SessionId) -> Result<Option<String>, RegistryError> {
        let key = match self.name_by_id.get(&id) {
            Some(name) => NameKey::new(name),
            None => return Ok(None),
        };

        let claimants = self
            .ids_by_name
            .get_mut(&key)
            .ok_or(RegistryError::IndexDesync {
                id,
                detail: "claimed name has no claimant set",
            })?;

        if !claimants.remove(&id) {
            return Err(RegistryError::IndexDesync {
                id,
                detail: "session missing from its name's claimant set",
            });
        }
        if claimants.is_empty() {
            self.ids_by_name.remove(&key);
        }

        Ok(self.name_by_id.remove(&id))
    }

    fn target(&self, id: SessionId) -> Result<Target, RegistryError> {
        let sink = self.sink_by_id.get(&id).ok_or(RegistryError::IndexDesync {
            id,
            detail: "name claimant has no sink",
        })?;
        Ok(Target {
            id,
            sink: Arc::clone(sink),
        })
    }
}

/// Central registry for all live chat sessions
///
/// Thread-safe via a single `RwLock` over every index. Mutations take the
/// write lock; target lookups take the read lock and return owned snapshots
/// so that delivery happens with the lock released.
pub struct ClientRegistry {
    indices: RwLock<Indices>,

    /// Configuration
    config: RegistryConfig,
}

impl ClientRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            indices: RwLock::new(Indices::default()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a session's outbound sink
    ///
    /// The session starts without a name.
    pub async fn register(
        &self,
        id: SessionId,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<(), RegistryError> {
        let mut indices = self.indices.write().await;

        if indices.sink_by_id.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentity(id));
        }
        indices.sink_by_id.insert(id, sink);

        tracing::debug!(
            session_id = %id,
            sessions = indices.sink_by_id.len(),
            "Session registered"
        );

        Ok(())
    }

    /// Unregister a session, releasing its name claim first
    pub async fn unregister(&self, id: SessionId) -> Result<(), RegistryError> {
        let mut indices = self.indices.write().await;

        if !indices.sink_by_id.contains_key(&id) {
            return Err(RegistryError::UnknownIdentity(id));
        }

        let released = indices.release_name(id)?;
        indices.sink_by_id.remove(&id);

        tracing::debug!(
            session_id = %id,
            name = ?released,
            sessions = indices.sink_by_id.len(),
            "Session unregistered"
        );

        Ok(())
    }

    /// Claim `new_name` for a session, atomically releasing its previous name
    ///
    /// Names are shared: several sessions may claim the same one.
    pub async fn rename(&self, id: SessionId, new_name: &str) -> Result<(), RegistryError> {
        let mut indices = self.indices.write().await;

        if !indices.sink_by_id.contains_key(&id) {
            return Err(RegistryError::UnknownIdentity(id));
        }

        let previous = indices.release_name(id)?;
        indices
            .ids_by_name
            .entry(NameKey::new(new_name))
            .or_default()
            .insert(id);
        indices.name_by_id.insert(id, new_name.to_owned());

        tracing::debug!(
            session_id = %id,
            from = ?previous,
            to = new_name,
            "Session renamed"
        );

        Ok(())
    }

    /// Snapshot of every registered sink except `exclude`'s
    pub async fn broadcast_targets(&self, exclude: SessionId) -> Vec<Target> {
        let indices = self.indices.read().await;

        indices
            .sink_by_id
            .iter()
            .filter(|(id, _)| **id != exclude)
            .map(|(id, sink)| Target {
                id: *id,
                sink: Arc::clone(sink),
            })
            .collect()
    }

    /// Snapshot of the sinks of every session claiming `name`, except `exclude`'s
    ///
    /// Lookup is case-insensitive. An empty result is a normal outcome under
    /// [`UnknownRecipientPolicy::Ignore`]; under `Reject` it is reported as
    /// [`RegistryError::UnknownRecipient`].
    pub async fn direct_targets(
        &self,
        name: &str,
        exclude: SessionId,
    ) -> Result<Vec<Target>, RegistryError> {
        let indices = self.indices.read().await;

        let targets = match indices.ids_by_name.get(&NameKey::new(name)) {
            Some(claimants) => claimants
                .iter()
                .filter(|id| **id != exclude)
                .map(|id| indices.target(*id))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        if targets.is_empty() && self.config.unknown_recipient == UnknownRecipientPolicy::Reject {
            return Err(RegistryError::UnknownRecipient(name.to_owned()));
        }

        Ok(targets)
    }

    /// Name currently claimed by a session
    pub async fn name_of(&self, id: SessionId) -> Option<String> {
        self.indices.read().await.name_by_id.get(&id).cloned()
    }

    /// Check whether a session is registered
    pub async fn contains(&self, id: SessionId) -> bool {
        self.indices.read().await.sink_by_id.contains_key(&id)
    }

    /// Get total number of registered sessions
    pub async fn session_count(&self) -> usize {
        self.indices.read().await.sink_by_id.len()
    }

    /// Sessions currently claiming `name` (case-insensitive)
    pub async fn sessions_named(&self, name: &str) -> Vec<SessionId> {
        self.indices
            .read()
            .await
            .ids_by_name
            .get(&NameKey::new(name))
            .map(|claimants| claimants.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of claimant sets containing `id`, read under one lock
    #[cfg(test)]
    pub(crate) async fn claim_count(&self, id: SessionId) -> usize {
        self.indices
            .read()
            .await
            .ids_by_name
            .values()
            .filter(|claimants| claimants.contains(&id))
            .count()
    }

    /// Panic unless the indices agree with each other
    #[cfg(test)]
    pub(crate) async fn assert_consistent(&self) {
        let indices = self.indices.read().await;

        for (id, name) in &indices.name_by_id {
            assert!(indices.sink_by_id.contains_key(id), "named session {id} has no sink");
            let claimants = indices
                .ids_by_name
                .get(&NameKey::new(name))
                .unwrap_or_else(|| panic!("name {name:?} of {id} not indexed"));
            assert!(claimants.contains(id), "{id} missing from {name:?} claimants");
        }

        for (key, claimants) in &indices.ids_by_name {
            assert!(!claimants.is_empty(), "empty claimant set for {key}");
            for id in claimants {
                assert!(indices.sink_by_id.contains_key(id), "claimant {id} has no sink");
                let name = indices
                    .name_by_id
                    .get(id)
                    .unwrap_or_else(|| panic!("claimant {id} of {key} has no name"));
                assert_eq!(&NameKey::new(name), key);
            }
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
