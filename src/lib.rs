//! # Tracked Changes
//!
//! Instance-level change tracking for persisted records. Every tracked
//! instance keeps a small snapshot history, captured at each lifecycle
//! event, and answers what changed between those snapshots.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: Immutable field name -> value maps captured per event
//! - **History**: The latest capture plus the two captures before it
//! - **Tracker**: Owns one instance, captures on save/delete, diffs states
//! - **Registry**: Explicit set of tracked models, observers and subscriptions
//!
//! ## Example
//!
//! ```ignore
//! use tracked_changes::{ChangeRegistry, EventKind};
//!
//! let registry = ChangeRegistry::default();
//! registry.register::<User>()?;
//!
//! let mut user = registry.track(User::new("x"))?;
//! user.instance_mut().id = Some(7);
//! user.record_event(EventKind::Save)?;
//!
//! assert!(user.is_persisted());
//! assert!(!user.was_persisted()?);
//! ```

pub mod error;
pub mod history;
pub mod model;
pub mod registry;
pub mod subscriptions;
pub mod tracker;
pub mod types;

// Re-exports
pub use error::{ChangesError, Result};
pub use history::{SnapshotHistory, HISTORY_DEPTH};
pub use model::{FieldDescriptor, FieldError, FieldKind, TrackedModel};
pub use registry::{ChangeRegistry, RegisterOptions, RegistryConfig};
pub use subscriptions::{
    ChangeEvent, DropReason, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use tracker::{ChangeSink, ChangeTracker};
pub use types::*;
