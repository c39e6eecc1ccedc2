//! Session management
//!
//! Each live connection gets a [`SessionDispatcher`] that runs its request
//! loop against the shared registry.

pub mod context;
pub mod dispatcher;

pub use context::SessionContext;
pub use dispatcher::SessionDispatcher;
