//! Explicit service registry.
//!
//! Long-lived subsystems (graphics context, renderers, resource managers) are
//! registered once, in dependency order, and handed to consumers by
//! reference. Teardown happens in strict reverse registration order, so a
//! service may hold back-references to anything registered before it.

use ahash::AHashMap;
use std::any::{Any, TypeId};

/// Marker trait for types that can be registered as services.
pub trait Service: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Service for T {}

struct ServiceEntry {
    data: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A service of this type is already registered.
    AlreadyRegistered(&'static str),
    /// No service of this type has been registered.
    Missing(&'static str),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRegistered(name) => write!(f, "service already registered: {}", name),
            Self::Missing(name) => write!(f, "service not registered: {}", name),
        }
    }
}

impl std::error::Error for RegistryError {}

/// One instance per service type, torn down in reverse registration order.
///
/// # Example
///
/// ```
/// use lumora_core::ServiceRegistry;
///
/// struct Device;
/// struct Renderer { frames: u32 }
///
/// let mut registry = ServiceRegistry::new();
/// registry.register(Device).unwrap();
/// registry.register(Renderer { frames: 0 }).unwrap();
///
/// registry.get_mut::<Renderer>().unwrap().frames += 1;
/// assert_eq!(registry.get::<Renderer>().unwrap().frames, 1);
///
/// // Renderer is dropped before Device.
/// registry.shutdown();
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    entries: Vec<ServiceEntry>,
    index: AHashMap<TypeId, usize>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service. Fails if the type is already present.
    pub fn register<S: Service>(&mut self, service: S) -> Result<(), RegistryError> {
        let type_id = TypeId::of::<S>();
        let type_name = std::any::type_name::<S>();

        if self.index.contains_key(&type_id) {
            return Err(RegistryError::AlreadyRegistered(type_name));
        }

        tracing::debug!("Registering service #{}: {}", self.entries.len(), type_name);

        self.index.insert(type_id, self.entries.len());
        self.entries.push(ServiceEntry {
            data: Box::new(service),
            type_name,
        });
        Ok(())
    }

    pub fn get<S: Service>(&self) -> Option<&S> {
        let slot = *self.index.get(&TypeId::of::<S>())?;
        self.entries[slot].data.downcast_ref()
    }

    pub fn get_mut<S: Service>(&mut self) -> Option<&mut S> {
        let slot = *self.index.get(&TypeId::of::<S>())?;
        self.entries[slot].data.downcast_mut()
    }

    /// Like [`get`](Self::get), but reports which type was missing.
    pub fn require<S: Service>(&self) -> Result<&S, RegistryError> {
        self.get::<S>()
            .ok_or(RegistryError::Missing(std::any::type_name::<S>()))
    }

    pub fn contains<S: Service>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type names in construction order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.type_name)
    }

    /// Drop every service, last registered first.
    pub fn shutdown(&mut self) {
        while let Some(entry) = self.entries.pop() {
            tracing::debug!("Releasing service #{}: {}", self.entries.len(), entry.type_name);
            drop(entry);
        }
        self.index.clear();
    }
}

impl Drop for ServiceRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("count", &self.entries.len())
            .field("types", &self.type_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type DropLog = Arc<Mutex<Vec<&'static str>>>;

    struct First(DropLog);
    struct Second(DropLog);
    struct Third(DropLog);

    impl Drop for First {
        fn drop(&mut self) {
            self.0.lock().unwrap().push("first");
        }
    }

    impl Drop for Second {
        fn drop(&mut self) {
            self.0.lock().unwrap().push("second");
        }
    }

    impl Drop for Third {
        fn drop(&mut self) {
            self.0.lock().unwrap().push("third");
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ServiceRegistry::new();
        registry.register(42u32).unwrap();
        registry.register(String::from("device")).unwrap();

        assert_eq!(registry.get::<u32>(), Some(&42));
        assert_eq!(registry.get::<String>().map(String::as_str), Some("device"));
        assert!(registry.get::<u64>().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ServiceRegistry::new();
        registry.register(1u32).unwrap();

        let err = registry.register(2u32).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
        assert_eq!(registry.get::<u32>(), Some(&1));
    }

    #[test]
    fn test_require_missing() {
        let registry = ServiceRegistry::new();
        let err = registry.require::<u32>().unwrap_err();
        assert_eq!(err, RegistryError::Missing("u32"));
        assert_eq!(err.to_string(), "service not registered: u32");
    }

    #[test]
    fn test_get_mut() {
        let mut registry = ServiceRegistry::new();
        registry.register(vec![1, 2, 3]).unwrap();
        registry.get_mut::<Vec<i32>>().unwrap().push(4);
        assert_eq!(registry.get::<Vec<i32>>().unwrap().len(), 4);
    }

    #[test]
    fn test_type_names_in_construction_order() {
        let mut registry = ServiceRegistry::new();
        registry.register(1u8).unwrap();
        registry.register(1u16).unwrap();
        registry.register(1u32).unwrap();

        let names: Vec<_> = registry.type_names().collect();
        assert_eq!(names, vec!["u8", "u16", "u32"]);
    }

    #[test]
    fn test_shutdown_reverse_order() {
        let log = DropLog::default();
        let mut registry = ServiceRegistry::new();
        registry.register(First(log.clone())).unwrap();
        registry.register(Second(log.clone())).unwrap();
        registry.register(Third(log.clone())).unwrap();

        registry.shutdown();

        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
        assert!(registry.is_empty());
        assert!(!registry.contains::<First>());
    }

    #[test]
    fn test_drop_reverse_order() {
        let log = DropLog::default();
        {
            let mut registry = ServiceRegistry::new();
            registry.register(First(log.clone())).unwrap();
            registry.register(Second(log.clone())).unwrap();
        }
        assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    }
}
