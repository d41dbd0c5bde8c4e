//! # Scope
//!
//! A `Scope` is the per-viewer container. It creates components from the
//! framework's factories, keeps the live set, owns the data-provider cache
//! (at most one provider instance per name) and fans broadcast messages out to
//! interested components.
//!
//! ## Broadcast safety
//!
//! Message handlers may destroy components, including ones that have not been
//! reached yet in the same broadcast. Dispatch therefore walks a snapshot of the
//! live set taken when the broadcast starts, and re-checks liveness right
//! before each call. No lock is held while a handler runs, so handlers may call
//! back into the scope freely.
//!
//! ## Ownership
//!
//! `Scope` is a cheap handle (`Clone`) over shared state. Components usually
//! keep a handle to their scope; [`Scope::destroy`] drops every component and
//! provider, which releases those handles.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::configs::ViewerConfig;
use crate::core::component::{AssetFuture, Component, DataProvider, Locator};
use crate::core::future::AbortableFuture;
use crate::core::registry::Framework;
use crate::error::{AssetError, FrameworkError};

/// Identity of a component inside its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

/// A live (or formerly live) component together with its identity.
#[derive(Clone)]
pub struct ComponentRef {
    id: ComponentId,
    name: String,
    instance: Arc<dyn Component>,
}

impl ComponentRef {
    /// The identity used by [`Scope::destroy_component`].
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The name the component was created from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The component instance.
    pub fn instance(&self) -> &Arc<dyn Component> {
        &self.instance
    }

    /// The concrete component, if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

struct ScopeInner {
    framework: Arc<Framework>,
    config: Arc<ViewerConfig>,
    next_id: AtomicU64,
    /// Live set, ordered by creation for deterministic dispatch.
    components: Mutex<BTreeMap<ComponentId, ComponentRef>>,
    data_providers: Mutex<HashMap<String, Arc<dyn DataProvider>>>,
}

/// The per-viewer-instance container.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Creates a scope bound to a framework registry and a viewer configuration.
    pub fn new(framework: Arc<Framework>, config: ViewerConfig) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                framework,
                config: Arc::new(config),
                next_id: AtomicU64::new(1),
                components: Mutex::new(BTreeMap::new()),
                data_providers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The framework this scope instantiates from.
    pub fn framework(&self) -> &Arc<Framework> {
        &self.inner.framework
    }

    /// The viewer configuration.
    pub fn get_config(&self) -> Arc<ViewerConfig> {
        Arc::clone(&self.inner.config)
    }

    /// A shared utility from the framework.
    pub fn get_utility<T>(&self, name: &str) -> Result<Arc<T>, FrameworkError>
    where
        T: Any + Send + Sync,
    {
        self.inner.framework.get_utility::<T>(name)
    }

    /// Creates a component and adds it to the live set.
    pub fn create_component(&self, name: &str) -> Result<ComponentRef, FrameworkError> {
        let instance = self.inner.framework.create_component(name, self).map_err(|e| {
            log::warn!("Cannot create component '{}': {}", name, e);
            e
        })?;
        let id = ComponentId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let component = ComponentRef {
            id,
            name: name.to_string(),
            instance,
        };
        self.lock_components().insert(id, component.clone());
        log::debug!("Component '{}' created as {:?}", name, id);
        Ok(component)
    }

    /// Removes a component from the live set and destroys it. Components that
    /// are not live are left alone, so each one is destroyed at most once.
    pub fn destroy_component(&self, component: &ComponentRef) {
        let removed = self.lock_components().remove(&component.id);
        if let Some(live) = removed {
            Self::teardown(&live);
        }
    }

    /// Destroys every live component, then empties the data-provider cache.
    pub fn destroy(&self) {
        let live = std::mem::take(&mut *self.lock_components());
        for component in live.values() {
            Self::teardown(component);
        }
        self.inner
            .data_providers
            .lock()
            .expect("Scope lock poisoned")
            .clear();
        log::debug!("Scope destroyed ({} components)", live.len());
    }

    /// True while the component is in the live set.
    pub fn is_live(&self, component: &ComponentRef) -> bool {
        self.lock_components().contains_key(&component.id)
    }

    /// Number of live components.
    pub fn component_count(&self) -> usize {
        self.lock_components().len()
    }

    /// Delivers `message` to every live component listening for it.
    pub fn broadcast(&self, message: &str, data: Value) {
        let snapshot: Vec<ComponentRef> = self
            .lock_components()
            .values()
            .filter(|component| {
                component
                    .instance
                    .as_listener()
                    .map(|listener| listener.messages().iter().any(|name| *name == message))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        for component in snapshot {
            // An earlier handler may have destroyed this one.
            if !self.lock_components().contains_key(&component.id) {
                continue;
            }
            if let Some(listener) = component.instance.as_listener() {
                listener.on_message(message, &data);
            }
        }
    }

    /// The data provider for `name`, created and cached on first use.
    pub fn get_data_provider(&self, name: &str) -> Result<Arc<dyn DataProvider>, FrameworkError> {
        if let Some(provider) = self.lock_providers().get(name) {
            return Ok(Arc::clone(provider));
        }

        let factory = self.inner.framework.data_provider_factory(name)?;
        let created = factory(self)?;
        log::debug!("Data provider '{}' instantiated", name);

        // Keep the first instance if one was cached while this one was built.
        let mut providers = self.lock_providers();
        let provider = providers.entry(name.to_string()).or_insert(created);
        Ok(Arc::clone(provider))
    }

    /// Requests an asset from the data provider registered as `name`. A
    /// missing provider yields an already-rejected future.
    pub fn get(&self, name: &str, locator: impl Into<Locator>) -> AssetFuture {
        match self.get_data_provider(name) {
            Ok(provider) => provider.get(name, &locator.into()),
            Err(e) => {
                log::warn!("No data provider for '{}': {}", name, e);
                AbortableFuture::rejected(AssetError::NotFound)
            }
        }
    }

    fn teardown(component: &ComponentRef) {
        if let Some(destroyable) = component.instance.as_destroyable() {
            destroyable.destroy();
        }
        log::debug!("Component '{}' ({:?}) destroyed", component.name, component.id);
    }

    fn lock_components(&self) -> std::sync::MutexGuard<'_, BTreeMap<ComponentId, ComponentRef>> {
        self.inner.components.lock().expect("Scope lock poisoned")
    }

    fn lock_providers(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<dyn DataProvider>>> {
        self.inner.data_providers.lock().expect("Scope lock poisoned")
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("components", &self.component_count())
            .finish()
    }
}
