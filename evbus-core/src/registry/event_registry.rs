//!
//! ``evbus-core/src/registry/event_registry.rs``
//!
//! Multicast event registry keyed by integer id.
//!
//! - One coarse lock over the whole map guards every mutation and the
//!   snapshot step of a send
//! - Chains are copy-on-write (`Arc<[Handler]>`): a send clones the `Arc`
//!   under the lock and invokes handlers after releasing it
//! - Handlers may re-enter the registry; mutations never affect a send that
//!   already took its snapshot
//!
use std::{
    any::Any,
    collections::{HashMap, hash_map::Entry},
    fmt,
    iter,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::RandomState;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{EventError, EventResult};
use crate::registry::handler::{Handler, Signature, Value, downcast_value};

/// Integer key identifying one event channel
pub type EventId = i32;

/// Ordered handlers sharing one signature. Never empty while stored.
#[derive(Clone)]
struct HandlerChain {
    signature: Signature,
    handlers: Arc<[Handler]>,
}

impl HandlerChain {
    fn single(handler: Handler) -> Self {
        Self {
            signature: handler.signature().clone(),
            handlers: Arc::from([handler]),
        }
    }

    fn combine(&self, handler: Handler) -> Self {
        Self {
            signature: self.signature.clone(),
            handlers: self.handlers.iter().cloned().chain(iter::once(handler)).collect(),
        }
    }

    fn position(&self, handler: &Handler) -> Option<usize> {
        self.handlers.iter().position(|h| h == handler)
    }

    fn without(&self, index: usize) -> Self {
        Self {
            signature: self.signature.clone(),
            handlers: self
                .handlers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, h)| h.clone())
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[derive(Debug, Default)]
struct Counters {
    registrations: AtomicU64,
    removals: AtomicU64,
    sends: AtomicU64,
    invocations: AtomicU64,
}

/// Cumulative registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub registrations: u64,
    pub removals: u64,
    pub sends: u64,
    pub invocations: u64,
}

/// Process-wide event registry.
///
/// Construct one and share it through `Arc` with every collaborator that
/// registers or sends events.
pub struct EventRegistry {
    chains: Mutex<HashMap<EventId, HandlerChain, RandomState>>,
    counters: Counters,
}

impl EventRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chains: Mutex::new(HashMap::with_hasher(RandomState::new())),
            counters: Counters::default(),
        }
    }

    /// Append `handler` to the chain for `id`. `None` is ignored.
    ///
    /// # Errors
    /// [`EventError::IncompatibleHandler`] when the chain already holds
    /// handlers of another signature; the chain is left as it was.
    pub fn register(
        &self,
        id: impl Into<EventId>,
        handler: impl Into<Option<Handler>>,
    ) -> EventResult<()> {
        let id: EventId = id.into();
        let Some(handler) = handler.into() else {
            return Ok(());
        };

        let count: usize = {
            let mut chains = self.chains.lock();

            match chains.entry(id) {
                Entry::Occupied(mut entry) => {
                    let chain: &mut HandlerChain = entry.get_mut();
                    if chain.signature != *handler.signature() {
                        return Err(EventError::incompatible(
                            id,
                            &chain.signature,
                            handler.signature(),
                        ));
                    }

                    *chain = chain.combine(handler);
                    chain.len()
                }

                Entry::Vacant(entry) => entry.insert(HandlerChain::single(handler)).len(),
            }
        };

        self.counters.registrations.fetch_add(1, Ordering::Relaxed);
        debug!(event_id = id, handlers = count, "Registered handler");

        Ok(())
    }

    /// Remove the first occurrence of `handler` (by identity) from `id`.
    /// Silently does nothing if either is absent.
    pub fn unregister(&self, id: impl Into<EventId>, handler: impl Into<Option<Handler>>) {
        let id: EventId = id.into();
        let Some(handler) = handler.into() else {
            return;
        };

        let remaining: usize = {
            let mut chains = self.chains.lock();

            let Some(chain) = chains.get_mut(&id) else {
                return;
            };
            let Some(index) = chain.position(&handler) else {
                return;
            };

            if chain.len() == 1 {
                chains.remove(&id);
                0
            } else {
                *chain = chain.without(index);
                chain.len()
            }
        };

        self.counters.removals.fetch_add(1, Ordering::Relaxed);
        debug!(event_id = id, handlers = remaining, "Unregistered handler");
    }

    /// Invoke every handler for `id` in order and return the last result.
    ///
    /// Earlier handlers run for their side effects; their results are
    /// dropped. Returns `Ok(None)` when nothing is registered for `id`.
    ///
    /// # Errors
    /// [`EventError::ArityMismatch`] / [`EventError::ArgumentTypeMismatch`]
    /// before any handler runs.
    pub fn send(&self, id: impl Into<EventId>, args: &[&dyn Any]) -> EventResult<Option<Value>> {
        let id: EventId = id.into();
        let Some(chain) = self.snapshot(id) else {
            return Ok(None);
        };

        self.invoke_last(id, &chain, args)
    }

    /// Typed [`send`](Self::send). Returns `T::default()` when nothing is
    /// registered for `id`.
    ///
    /// # Errors
    /// As [`send`](Self::send), plus [`EventError::ResultCast`] when the last
    /// result is not a `T`. Every handler has already run in that case.
    pub fn send_as<T: Any + Default>(
        &self,
        id: impl Into<EventId>,
        args: &[&dyn Any],
    ) -> EventResult<T> {
        let id: EventId = id.into();
        let Some(chain) = self.snapshot(id) else {
            return Ok(T::default());
        };

        match self.invoke_last(id, &chain, args)? {
            Some(value) => downcast_value(id, value, chain.signature.ret()),
            None => Ok(T::default()),
        }
    }

    /// Invoke every handler for `id` in order, collecting each result.
    /// Empty when nothing is registered for `id`.
    ///
    /// # Errors
    /// As [`send`](Self::send).
    pub fn sends(&self, id: impl Into<EventId>, args: &[&dyn Any]) -> EventResult<Vec<Value>> {
        let id: EventId = id.into();
        let Some(chain) = self.snapshot(id) else {
            return Ok(Vec::new());
        };

        self.invoke_each(id, &chain, args, Ok)
    }

    /// Typed [`sends`](Self::sends).
    ///
    /// # Errors
    /// As [`send`](Self::send), plus [`EventError::ResultCast`] on the first
    /// result that is not a `T`. Handlers up to and including that one have
    /// already run.
    pub fn sends_as<T: Any>(&self, id: impl Into<EventId>, args: &[&dyn Any]) -> EventResult<Vec<T>> {
        let id: EventId = id.into();
        let Some(chain) = self.snapshot(id) else {
            return Ok(Vec::new());
        };

        let ret = *chain.signature.ret();
        self.invoke_each(id, &chain, args, |value| downcast_value(id, value, &ret))
    }

    /// Drop every entry
    pub fn clear(&self) {
        let removed: usize = {
            let mut chains = self.chains.lock();
            let removed = chains.len();
            chains.clear();
            removed
        };

        debug!(events = removed, "Cleared event registry");
    }

    #[must_use]
    pub fn contains(&self, id: impl Into<EventId>) -> bool {
        self.chains.lock().contains_key(&id.into())
    }

    /// Number of handlers registered for `id` (duplicates counted)
    #[must_use]
    pub fn handler_count(&self, id: impl Into<EventId>) -> usize {
        self.chains.lock().get(&id.into()).map_or(0, HandlerChain::len)
    }

    /// Signature shared by the handlers of `id`
    #[must_use]
    pub fn signature(&self, id: impl Into<EventId>) -> Option<Signature> {
        self.chains
            .lock()
            .get(&id.into())
            .map(|chain| chain.signature.clone())
    }

    /// Number of ids with at least one handler
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.lock().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            registrations: self.counters.registrations.load(Ordering::Relaxed),
            removals: self.counters.removals.load(Ordering::Relaxed),
            sends: self.counters.sends.load(Ordering::Relaxed),
            invocations: self.counters.invocations.load(Ordering::Relaxed),
        }
    }

    fn snapshot(&self, id: EventId) -> Option<HandlerChain> {
        self.counters.sends.fetch_add(1, Ordering::Relaxed);

        let chain: Option<HandlerChain> = self.chains.lock().get(&id).cloned();

        match &chain {
            Some(chain) => trace!(event_id = id, handlers = chain.len(), "Dispatching event"),
            None => trace!(event_id = id, "No handler registered"),
        }

        chain
    }

    fn invoke_last(
        &self,
        id: EventId,
        chain: &HandlerChain,
        args: &[&dyn Any],
    ) -> EventResult<Option<Value>> {
        chain.signature.check_args(id, args)?;

        let mut last: Option<Value> = None;
        for handler in chain.handlers.iter() {
            self.counters.invocations.fetch_add(1, Ordering::Relaxed);
            last = Some(handler.call(id, args)?);
        }

        Ok(last)
    }

    fn invoke_each<T>(
        &self,
        id: EventId,
        chain: &HandlerChain,
        args: &[&dyn Any],
        mut convert: impl FnMut(Value) -> EventResult<T>,
    ) -> EventResult<Vec<T>> {
        chain.signature.check_args(id, args)?;

        let mut results: Vec<T> = Vec::with_capacity(chain.len());
        for handler in chain.handlers.iter() {
            self.counters.invocations.fetch_add(1, Ordering::Relaxed);
            results.push(convert(handler.call(id, args)?)?);
        }

        Ok(results)
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
