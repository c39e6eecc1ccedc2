//! Client registry for session routing
//!
//! The registry tracks which sessions are connected, where to deliver to
//! them, and what they are called. Every connection's dispatcher reads and
//! updates it concurrently.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<ClientRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ RwLock<Indices {             │
//!                  │   sink_by_id:  id -> sink    │
//!                  │   ids_by_name: key -> {id}   │
//!                  │   name_by_id:  id -> name    │
//!                  │ }>                           │
//!                  └──────────────┬───────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [Dispatcher A]          [Dispatcher B]          [Dispatcher C]
//!   rename()                broadcast_targets()     direct_targets()
//!                                 │
//!                                 └──► snapshot ──► send_all() ──► sinks
//! ```
//!
//! # Snapshot Design
//!
//! Target lookups clone the matching `Arc<dyn ResponseSink>` handles while
//! holding the read lock and return them as an owned `Vec`. Delivery then
//! runs with the lock released, so a slow peer never stalls registry access.

pub mod config;
pub mod error;
pub mod id;
pub mod sink;
pub mod store;

pub use config::{RegistryConfig, UnknownRecipientPolicy};
pub use error::RegistryError;
pub use id::{NameKey, SessionId};
pub use sink::{ChannelSink, ResponseSink, SinkError};
pub use store::{ClientRegistry, Target};
