//!
//! ``evbus-core/src/singleton.rs``
//!
//! Type-keyed service holding at most one live instance per type.
//!
//! Instances are created lazily on first [`Singletons::instance`] access, or
//! installed explicitly; a second candidate for an occupied type is rejected
//! and dropped. The host calls [`Singletons::teardown_all`] on reset.
//!
use std::{
    any::{self, Any, TypeId},
    fmt,
    sync::Arc,
};

use ahash::RandomState;
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use crate::error::SingletonError;

type Shared = Arc<dyn Any + Send + Sync>;

pub struct Singletons {
    instances: DashMap<TypeId, Shared, RandomState>,
}

impl Singletons {
    #[must_use]
    pub fn new() -> Self {
        Self {
            instances: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Live instance of `T`, created with `T::default()` on first access.
    ///
    /// Concurrent first accesses create exactly one instance. `T::default()`
    /// runs under the map's shard lock and must not access this service.
    pub fn instance<T>(&self) -> Arc<T>
    where
        T: Any + Send + Sync + Default,
    {
        let shared: Shared = self
            .instances
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!(singleton = any::type_name::<T>(), "Auto-created singleton");
                Arc::new(T::default()) as Shared
            })
            .value()
            .clone();

        downcast(shared)
    }

    /// Make `value` the singleton for `T` unless one is already live.
    ///
    /// # Errors
    /// [`SingletonError::AlreadyInstalled`] if `T` already has an instance;
    /// `value` is dropped.
    pub fn install<T>(&self, value: T) -> Result<Arc<T>, SingletonError>
    where
        T: Any + Send + Sync,
    {
        match self.instances.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => {
                debug!(singleton = any::type_name::<T>(), "Rejected duplicate singleton");
                Err(SingletonError::AlreadyInstalled {
                    type_name: any::type_name::<T>(),
                })
            }

            Entry::Vacant(entry) => {
                let instance: Arc<T> = Arc::new(value);
                entry.insert(instance.clone());
                debug!(singleton = any::type_name::<T>(), "Installed singleton");
                Ok(instance)
            }
        }
    }

    /// Live instance of `T` without creating one
    #[must_use]
    pub fn current<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.instances
            .get(&TypeId::of::<T>())
            .map(|shared| downcast(shared.value().clone()))
    }

    #[must_use]
    pub fn has_instance<T: Any>(&self) -> bool {
        self.instances.contains_key(&TypeId::of::<T>())
    }

    /// Forget the instance of `T`, returning it if there was one
    pub fn teardown<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let (_, shared) = self.instances.remove(&TypeId::of::<T>())?;
        debug!(singleton = any::type_name::<T>(), "Tore down singleton");

        Some(downcast(shared))
    }

    /// Forget every instance
    pub fn teardown_all(&self) {
        let count: usize = self.instances.len();
        self.instances.clear();

        debug!(singletons = count, "Tore down all singletons");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Default for Singletons {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Singletons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Singletons")
            .field("instances", &self.instances.len())
            .finish()
    }
}

fn downcast<T: Any + Send + Sync>(shared: Shared) -> Arc<T> {
    match shared.downcast::<T>() {
        Ok(instance) => instance,
        Err(_) => unreachable!("singleton slot is keyed by the TypeId of its value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Default for Counted {
        fn default() -> Self {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Self
        }
    }

    #[derive(Debug, Default)]
    struct AudioManager {
        volume: Mutex<u8>,
    }

    #[test]
    fn test_instance_is_lazy_and_shared() {
        let singletons = Singletons::new();
        assert!(!singletons.has_instance::<AudioManager>());
        assert!(singletons.current::<AudioManager>().is_none());

        let first = singletons.instance::<AudioManager>();
        *first.volume.lock() = 7;

        let second = singletons.instance::<AudioManager>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second.volume.lock(), 7);
        assert!(singletons.has_instance::<AudioManager>());
    }

    #[test]
    fn test_install_first_wins() {
        let singletons = Singletons::new();

        let installed = singletons
            .install(AudioManager {
                volume: Mutex::new(3),
            })
            .unwrap();

        let err = singletons
            .install(AudioManager {
                volume: Mutex::new(9),
            })
            .unwrap_err();
        assert!(matches!(err, SingletonError::AlreadyInstalled { .. }));

        let current = singletons.current::<AudioManager>().unwrap();
        assert!(Arc::ptr_eq(&installed, &current));
        assert_eq!(*current.volume.lock(), 3);
    }

    #[test]
    fn test_teardown() {
        let singletons = Singletons::new();
        singletons.instance::<AudioManager>();
        singletons.instance::<String>();
        assert_eq!(singletons.len(), 2);

        assert!(singletons.teardown::<AudioManager>().is_some());
        assert!(singletons.teardown::<AudioManager>().is_none());
        assert_eq!(singletons.len(), 1);

        singletons.teardown_all();
        assert!(singletons.is_empty());

        // A fresh instance can be installed after teardown
        assert!(singletons.install(String::from("again")).is_ok());
    }

    #[test]
    fn test_concurrent_first_access_creates_once() {
        let singletons = Arc::new(Singletons::new());

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let singletons = Arc::clone(&singletons);
                thread::spawn(move || singletons.instance::<Counted>())
            })
            .collect();

        let instances: Vec<Arc<Counted>> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
