//! # Framework Registry
//!
//! The process-wide table of named factories from which every
//! [`Scope`](crate::core::scope::Scope) builds its own component graph. One
//! `Framework` is constructed at start-up and shared by reference (`Arc`) with
//! every scope; nothing here is a hidden global.
//!
//! Three independent tables are kept:
//!
//! - **components**: `name -> Fn(&Scope) -> component`
//! - **data providers**: `name -> Fn(&Scope) -> provider`, stored under the
//!   [`DATA_PROVIDER_PREFIX`] namespace
//! - **utilities**: `name -> Fn(&Framework) -> utility`, instantiated lazily and
//!   then shared by every scope
//!
//! Registering a name twice replaces the earlier factory. A single factory may
//! be bound to several names in one call.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::core::component::{Component, DataProvider};
use crate::core::scope::Scope;
use crate::error::{FactoryKind, FrameworkError};

/// Namespace marker prepended to data-provider names inside the registry.
pub const DATA_PROVIDER_PREFIX: &str = "dataprovider-";

/// Builds a component bound to the given scope.
pub type ComponentFactory =
    Arc<dyn Fn(&Scope) -> Result<Arc<dyn Component>, FrameworkError> + Send + Sync>;

/// Builds a data provider bound to the given scope.
pub type DataProviderFactory =
    Arc<dyn Fn(&Scope) -> Result<Arc<dyn DataProvider>, FrameworkError> + Send + Sync>;

/// Builds a shared utility.
pub type UtilityFactory = Arc<dyn Fn(&Framework) -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// One name or several names to bind a factory under.
pub trait RegistrationNames {
    /// The names, in registration order.
    fn names(&self) -> Vec<String>;
}

impl RegistrationNames for &str {
    fn names(&self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl RegistrationNames for String {
    fn names(&self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl RegistrationNames for &[&str] {
    fn names(&self) -> Vec<String> {
        self.iter().map(|name| name.to_string()).collect()
    }
}

impl<const N: usize> RegistrationNames for [&str; N] {
    fn names(&self) -> Vec<String> {
        self.iter().map(|name| name.to_string()).collect()
    }
}

impl RegistrationNames for Vec<&str> {
    fn names(&self) -> Vec<String> {
        self.iter().map(|name| name.to_string()).collect()
    }
}

/// The registry of component, data-provider and utility factories.
#[derive(Default)]
pub struct Framework {
    components: RwLock<HashMap<String, ComponentFactory>>,
    data_providers: RwLock<HashMap<String, DataProviderFactory>>,
    utilities: RwLock<HashMap<String, UtilityFactory>>,
    /// Utilities already built, keyed by name.
    utility_instances: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Framework {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a component factory under one or more names.
    pub fn add_component<N, F>(&self, names: N, factory: F)
    where
        N: RegistrationNames,
        F: Fn(&Scope) -> Result<Arc<dyn Component>, FrameworkError> + Send + Sync + 'static,
    {
        let factory: ComponentFactory = Arc::new(factory);
        let mut components = self.components.write().expect("Framework lock poisoned");
        for name in names.names() {
            log::debug!("Component '{}' registered", name);
            components.insert(name, Arc::clone(&factory));
        }
    }

    /// Binds a data-provider factory under one or more names.
    pub fn add_data_provider<N, F>(&self, names: N, factory: F)
    where
        N: RegistrationNames,
        F: Fn(&Scope) -> Result<Arc<dyn DataProvider>, FrameworkError> + Send + Sync + 'static,
    {
        let factory: DataProviderFactory = Arc::new(factory);
        let mut providers = self.data_providers.write().expect("Framework lock poisoned");
        for name in names.names() {
            log::debug!("Data provider '{}' registered", name);
            providers.insert(provider_key(&name), Arc::clone(&factory));
        }
    }

    /// Binds a utility factory. Any instance built from an earlier factory
    /// under the same name is forgotten.
    pub fn add_utility<F, U>(&self, name: &str, factory: F)
    where
        F: Fn(&Framework) -> U + Send + Sync + 'static,
        U: Any + Send + Sync,
    {
        let factory: UtilityFactory = Arc::new(move |framework: &Framework| {
            Arc::new(factory(framework)) as Arc<dyn Any + Send + Sync>
        });
        self.utilities
            .write()
            .expect("Framework lock poisoned")
            .insert(name.to_string(), factory);
        self.utility_instances
            .lock()
            .expect("Framework lock poisoned")
            .remove(name);
        log::debug!("Utility '{}' registered", name);
    }

    /// Instantiates the component registered under `name` for `scope`.
    pub fn create_component(
        &self,
        name: &str,
        scope: &Scope,
    ) -> Result<Arc<dyn Component>, FrameworkError> {
        let factory = self
            .components
            .read()
            .expect("Framework lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| FrameworkError::not_found(FactoryKind::Component, name))?;
        // The lock is released: factories may look up other registrations.
        factory(scope)
    }

    /// The factory of the data provider registered under `name`.
    pub fn data_provider_factory(&self, name: &str) -> Result<DataProviderFactory, FrameworkError> {
        self.data_providers
            .read()
            .expect("Framework lock poisoned")
            .get(&provider_key(name))
            .cloned()
            .ok_or_else(|| FrameworkError::not_found(FactoryKind::DataProvider, name))
    }

    /// True if a data provider is registered under `name`.
    pub fn has_data_provider(&self, name: &str) -> bool {
        self.data_providers
            .read()
            .expect("Framework lock poisoned")
            .contains_key(&provider_key(name))
    }

    /// The shared utility registered under `name`, built on first use.
    pub fn get_utility<T>(&self, name: &str) -> Result<Arc<T>, FrameworkError>
    where
        T: Any + Send + Sync,
    {
        self.utility(name)?
            .downcast::<T>()
            .map_err(|_| FrameworkError::UtilityType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Untyped access to a utility instance.
    pub fn utility(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, FrameworkError> {
        if let Some(instance) = self
            .utility_instances
            .lock()
            .expect("Framework lock poisoned")
            .get(name)
        {
            return Ok(Arc::clone(instance));
        }

        let factory = self
            .utilities
            .read()
            .expect("Framework lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| FrameworkError::not_found(FactoryKind::Utility, name))?;
        let built = factory(self);

        // Another caller may have built it meanwhile; the first one wins.
        let mut instances = self.utility_instances.lock().expect("Framework lock poisoned");
        let instance = instances.entry(name.to_string()).or_insert(built);
        Ok(Arc::clone(instance))
    }
}

fn provider_key(name: &str) -> String {
    format!("{DATA_PROVIDER_PREFIX}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::ViewerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Marker(&'static str);

    impl Component for Marker {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn marker_label(component: &Arc<dyn Component>) -> &'static str {
        component
            .as_any()
            .downcast_ref::<Marker>()
            .map(|marker| marker.0)
            .unwrap_or("other")
    }

    #[test]
    fn last_registration_wins() {
        let framework = Arc::new(Framework::new());
        framework.add_component("view", |_: &Scope| {
            Ok(Arc::new(Marker("first")) as Arc<dyn Component>)
        });
        framework.add_component("view", |_: &Scope| {
            Ok(Arc::new(Marker("second")) as Arc<dyn Component>)
        });
        let scope = Scope::new(Arc::clone(&framework), ViewerConfig::default());

        let component = framework.create_component("view", &scope).unwrap();
        assert_eq!(marker_label(&component), "second");
    }

    #[test]
    fn multi_name_registration_binds_every_name() {
        let framework = Arc::new(Framework::new());
        framework.add_component(["a", "b"], |_: &Scope| {
            Ok(Arc::new(Marker("shared")) as Arc<dyn Component>)
        });
        let scope = Scope::new(Arc::clone(&framework), ViewerConfig::default());

        assert_eq!(marker_label(&framework.create_component("a", &scope).unwrap()), "shared");
        assert_eq!(marker_label(&framework.create_component("b", &scope).unwrap()), "shared");
    }

    #[test]
    fn unknown_names_are_not_found() {
        let framework = Arc::new(Framework::new());
        let scope = Scope::new(Arc::clone(&framework), ViewerConfig::default());

        let err = framework.create_component("missing", &scope).err().unwrap();
        assert_eq!(err, FrameworkError::not_found(FactoryKind::Component, "missing"));
        assert!(framework.data_provider_factory("missing").is_err());
        assert!(framework.get_utility::<String>("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn utilities_are_built_once_and_typed() {
        let framework = Framework::new();
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        framework.add_utility("greeting", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            String::from("hello")
        });

        let first = framework.get_utility::<String>("greeting").unwrap();
        let second = framework.get_utility::<String>("greeting").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let wrong = framework.get_utility::<u32>("greeting").unwrap_err();
        assert!(matches!(wrong, FrameworkError::UtilityType { .. }));
    }

    #[test]
    fn re_registering_a_utility_drops_the_old_instance() {
        let framework = Framework::new();
        framework.add_utility("level", |_| 1u8);
        assert_eq!(*framework.get_utility::<u8>("level").unwrap(), 1);
        framework.add_utility("level", |_| 2u8);
        assert_eq!(*framework.get_utility::<u8>("level").unwrap(), 2);
    }
}
