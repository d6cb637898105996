//! Registry of tracked model types.
//!
//! The registry is an explicit value owned by the caller. It decides which
//! models participate in change tracking, holds the post-change observers
//! for each model, and publishes change events to subscribers. Creating a
//! tracker through [`ChangeRegistry::track`] is the materialization hook;
//! the returned tracker reports every later capture back here.

use crate::error::{ChangesError, Result};
use crate::model::TrackedModel;
use crate::subscriptions::{
    ChangeEvent, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
use crate::tracker::{ChangeSink, ChangeTracker};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry configuration.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Whether registering an already registered model is accepted.
    /// Default: true
    pub allow_existing: bool,

    /// Buffer size used by [`ChangeRegistry::subscribe_all`].
    /// Default: 1000
    pub subscription_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_existing: true,
            subscription_buffer: 1000,
        }
    }
}

/// Per-call overrides for [`ChangeRegistry::register_with`].
#[derive(Clone, Debug, Default)]
pub struct RegisterOptions {
    /// Overrides `RegistryConfig::allow_existing` when set.
    pub allow_existing: Option<bool>,
}

/// Observers attached to one registered model.
struct ModelChanges<M: TrackedModel> {
    observers: RwLock<Vec<ChangeSink<M>>>,
}

impl<M: TrackedModel> ModelChanges<M> {
    fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the observer list, so observers run without the lock held.
    fn observers(&self) -> Vec<ChangeSink<M>> {
        self.observers.read().clone()
    }
}

/// Type-erased registry entry.
struct ModelEntry {
    name: &'static str,
    changes: Arc<dyn Any + Send + Sync>,
}

/// Registry of tracked models.
pub struct ChangeRegistry {
    config: RegistryConfig,
    models: RwLock<HashMap<TypeId, ModelEntry>>,
    subscriptions: Arc<SubscriptionManager>,
}

impl ChangeRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            models: RwLock::new(HashMap::new()),
            subscriptions: Arc::new(SubscriptionManager::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- Registration ---

    /// Register a model with the registry's default options.
    pub fn register<M>(&self) -> Result<()>
    where
        M: TrackedModel + 'static,
    {
        self.register_with::<M>(RegisterOptions::default())
    }

    /// Register a model.
    ///
    /// Abstract models are rejected with `ImproperlyConfigured`. Registering
    /// a model twice fails with `AlreadyRegistered` unless existing
    /// registrations are allowed, in which case the existing entry and its
    /// observers are kept.
    pub fn register_with<M>(&self, options: RegisterOptions) -> Result<()>
    where
        M: TrackedModel + 'static,
    {
        if M::is_abstract() {
            return Err(ChangesError::ImproperlyConfigured(format!(
                "The model {} is abstract, so it cannot be registered with model changes",
                M::MODEL_NAME
            )));
        }
        M::primary_key_field()?;

        let allow_existing = options.allow_existing.unwrap_or(self.config.allow_existing);
        let mut models = self.models.write();

        if models.contains_key(&TypeId::of::<M>()) {
            if allow_existing {
                debug!(model = M::MODEL_NAME, "model already registered");
                return Ok(());
            }
            return Err(ChangesError::AlreadyRegistered(M::MODEL_NAME.to_string()));
        }

        models.insert(
            TypeId::of::<M>(),
            ModelEntry {
                name: M::MODEL_NAME,
                changes: Arc::new(ModelChanges::<M>::new()),
            },
        );

        debug!(model = M::MODEL_NAME, "model registered");
        Ok(())
    }

    /// Unregister a model.
    ///
    /// Trackers created before this call keep reporting to the observers
    /// they were created with.
    pub fn unregister<M>(&self) -> Result<()>
    where
        M: TrackedModel + 'static,
    {
        match self.models.write().remove(&TypeId::of::<M>()) {
            Some(_) => {
                debug!(model = M::MODEL_NAME, "model unregistered");
                Ok(())
            }
            None => Err(ChangesError::NotRegistered(M::MODEL_NAME.to_string())),
        }
    }

    pub fn is_registered<M>(&self) -> bool
    where
        M: TrackedModel + 'static,
    {
        self.models.read().contains_key(&TypeId::of::<M>())
    }

    /// Names of all registered models, sorted.
    pub fn registered_models(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.models.read().values().map(|e| e.name).collect();
        names.sort_unstable();
        names
    }

    /// Tear down: unregister every model and drop every subscription.
    pub fn clear(&self) {
        self.models.write().clear();
        self.subscriptions.close_all(DropReason::RegistryCleared);
        debug!("registry cleared");
    }

    // --- Observers ---

    /// Attach a post-change observer to a registered model.
    ///
    /// Observers run in registration order after every save or delete
    /// capture of a tracker created by this registry.
    pub fn connect<M>(&self, observer: ChangeSink<M>) -> Result<()>
    where
        M: TrackedModel + 'static,
    {
        let changes = self.model_changes::<M>()?;
        changes.observers.write().push(observer);
        debug!(model = M::MODEL_NAME, "observer connected");
        Ok(())
    }

    fn model_changes<M>(&self) -> Result<Arc<ModelChanges<M>>>
    where
        M: TrackedModel + 'static,
    {
        let models = self.models.read();
        let entry = models
            .get(&TypeId::of::<M>())
            .ok_or_else(|| ChangesError::NotRegistered(M::MODEL_NAME.to_string()))?;

        Arc::clone(&entry.changes)
            .downcast::<ModelChanges<M>>()
            .map_err(|_| ChangesError::NotRegistered(M::MODEL_NAME.to_string()))
    }

    // --- Tracking ---

    /// Start tracking a freshly materialized instance of a registered model.
    pub fn track<M>(&self, instance: M) -> Result<ChangeTracker<M>>
    where
        M: TrackedModel + 'static,
    {
        let changes = self.model_changes::<M>()?;
        let subscriptions = Arc::clone(&self.subscriptions);

        let sink: ChangeSink<M> = Arc::new(move |tracker: &ChangeTracker<M>| {
            for observer in changes.observers() {
                observer(tracker);
            }

            if subscriptions.subscription_count() == 0 {
                return;
            }
            match ChangeEvent::from_tracker(tracker) {
                Ok(event) => subscriptions.broadcast(event),
                Err(e) => warn!(model = M::MODEL_NAME, error = %e, "failed to build change event"),
            }
        });

        ChangeTracker::with_sink(instance, sink)
    }

    // --- Subscriptions ---

    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    /// Subscribe to every change event using the configured buffer size.
    pub fn subscribe_all(&self) -> SubscriptionHandle {
        self.subscriptions.subscribe(SubscriptionConfig {
            buffer_size: self.config.subscription_buffer,
            ..Default::default()
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }
}

impl Default for ChangeRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
