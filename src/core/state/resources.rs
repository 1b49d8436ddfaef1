//=========================================================================
// Resource Registry
//=========================================================================
//
// Per-state-type resources (menu GUIs, cached layouts) shared across
// repeated entries of the same state type.
//
// Architecture:
//   get_or_init::<T>() → HashMap<TypeId, Box<dyn ErasedResource>>
//                              ↓
//   StateManager::clean_states() → shutdown() on every entry → clear
//
// Resources are built lazily on first use and destroyed only by an
// explicit shutdown, never by the states that use them.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{Any, TypeId};
use std::collections::HashMap;

use log::debug;

//=== StateResource =======================================================

/// Resource stored in the [`ResourceRegistry`], keyed by its type.
pub trait StateResource: Send + 'static {
    /// Releases whatever the resource holds. Called once by
    /// [`ResourceRegistry::shutdown`].
    fn shutdown(&mut self) {}
}

//--- Type Erasure --------------------------------------------------------

trait ErasedResource: Send {
    fn shutdown_resource(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: StateResource> ErasedResource for T {
    fn shutdown_resource(&mut self) {
        StateResource::shutdown(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//=== ResourceRegistry ====================================================

/// Type-keyed store of lazily-built state resources.
#[derive(Default)]
pub struct ResourceRegistry {
    entries: HashMap<TypeId, Box<dyn ErasedResource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resource of type `T`, building it on first access.
    pub fn get_or_init<T, F>(&mut self, init: F) -> &mut T
    where
        T: StateResource,
        F: FnOnce() -> T,
    {
        self.entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!("Building state resource {}", std::any::type_name::<T>());
                Box::new(init())
            })
            .as_any_mut()
            .downcast_mut::<T>()
            .expect("Type mismatch in ResourceRegistry")
    }

    /// Returns the resource of type `T` if it has been built.
    pub fn get<T: StateResource>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.as_any().downcast_ref::<T>())
    }

    pub fn contains<T: StateResource>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shuts down and drops every resource.
    pub fn shutdown(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        debug!("Shutting down {} state resources", self.entries.len());
        for entry in self.entries.values_mut() {
            entry.shutdown_resource();
        }
        self.entries.clear();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Layout {
        builds: u32,
    }

    impl StateResource for Layout {}

    struct Tracked {
        shutdowns: Arc<AtomicUsize>,
    }

    impl StateResource for Tracked {
        fn shutdown(&mut self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn builds_once_and_reuses() {
        let mut registry = ResourceRegistry::new();
        let mut built = 0;

        registry.get_or_init(|| {
            built += 1;
            Layout { builds: 1 }
        }).builds += 1;
        registry.get_or_init(|| {
            built += 1;
            Layout { builds: 1 }
        });

        assert_eq!(built, 1);
        assert_eq!(registry.get::<Layout>().map(|l| l.builds), Some(2));
    }

    #[test]
    fn shutdown_runs_hooks_once_and_empties() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let mut registry = ResourceRegistry::new();
        let counter = shutdowns.clone();
        registry.get_or_init(move || Tracked { shutdowns: counter });

        registry.shutdown();
        registry.shutdown();

        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
        assert!(!registry.contains::<Tracked>());
    }

    #[test]
    fn separate_entries_per_type() {
        let mut registry = ResourceRegistry::new();
        registry.get_or_init(|| Layout { builds: 0 });
        registry.get_or_init(|| Tracked {
            shutdowns: Arc::new(AtomicUsize::new(0)),
        });
        assert_eq!(registry.len(), 2);
    }
}
