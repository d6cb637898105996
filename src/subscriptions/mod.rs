//! Subscriptions to change events across tracked models.
//!
//! Every non-initial capture of a registered model is published as a
//! [`ChangeEvent`]. Subscribers receive events over bounded channels:
//! - Filtering by model name and event kind
//! - Slow subscribers are dropped instead of blocking captures
//!
//! # Example
//!
//! ```ignore
//! let handle = registry.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::models(vec!["author".to_string()]),
//!     ..Default::default()
//! });
//!
//! while let Ok(event) = handle.recv() {
//!     match event {
//!         ChangeEvent::Changed { model, changes, .. } => println!("{model}: {changes:?}"),
//!         ChangeEvent::Dropped { .. } => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    ChangeEvent, DropReason, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
