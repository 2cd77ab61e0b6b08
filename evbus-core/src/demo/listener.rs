use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::demo::{Behaviour, EventIds, ParamTest};
use crate::error::EventResult;
use crate::registry::{EventRegistry, Handler};

/// One event observed by a [`TestListener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Param(ParamTest),
    Value(i32),
}

/// Append-only record of received events. Kept in
/// [`Singletons`](crate::singleton::Singletons) so it outlives scene reloads.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Mutex<Vec<Received>>,
}

impl EventLog {
    pub fn record(&self, received: Received) {
        self.entries.lock().push(received);
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Received> {
        self.entries.lock().clone()
    }

    /// Entries recorded after the first `skip`
    #[must_use]
    pub fn entries_since(&self, skip: usize) -> Vec<Received> {
        self.entries.lock().iter().skip(skip).copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Registers a `ParamTest` handler on `Test1` and an `i32` handler on `Test2`
/// when awoken, and removes both when destroyed.
pub struct TestListener {
    registry: Arc<EventRegistry>,
    log: Arc<EventLog>,
    handlers: Option<(Handler, Handler)>,
}

impl TestListener {
    #[must_use]
    pub fn new(registry: Arc<EventRegistry>, log: Arc<EventLog>) -> Self {
        Self {
            registry,
            log,
            handlers: None,
        }
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.handlers.is_some()
    }

    pub fn attach(&mut self) -> EventResult<()> {
        if self.handlers.is_some() {
            return Ok(());
        }

        let log = Arc::clone(&self.log);
        let on_param = Handler::new(move |param: ParamTest| {
            info!(id = param.id, "test event {}", param.id);
            log.record(Received::Param(param));
        });

        let log = Arc::clone(&self.log);
        let on_value = Handler::new(move |value: i32| {
            info!(value, "test event {}", value);
            log.record(Received::Value(value));
        });

        self.registry.register(EventIds::Test1, on_param.clone())?;
        if let Err(err) = self.registry.register(EventIds::Test2, on_value.clone()) {
            warn!("Rolling back Test1 handler: {}", err);
            self.registry.unregister(EventIds::Test1, on_param);
            return Err(err);
        }

        self.handlers = Some((on_param, on_value));
        Ok(())
    }

    pub fn detach(&mut self) {
        if let Some((on_param, on_value)) = self.handlers.take() {
            self.registry.unregister(EventIds::Test1, on_param);
            self.registry.unregister(EventIds::Test2, on_value);
        }
    }
}

impl Behaviour for TestListener {
    fn awake(&mut self) -> EventResult<()> {
        self.attach()
    }

    fn on_destroy(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::error::EventError;

    #[test]
    fn test_attach_records_events() {
        let registry = Arc::new(EventRegistry::new());
        let log = Arc::new(EventLog::default());
        let mut listener = TestListener::new(Arc::clone(&registry), Arc::clone(&log));

        listener.attach().unwrap();
        listener.attach().unwrap();
        assert_eq!(registry.handler_count(EventIds::Test1), 1);

        registry.send(EventIds::Test1, args![ParamTest { id: 88 }]).unwrap();
        registry.send(EventIds::Test2, args![666]).unwrap();

        assert_eq!(
            log.entries(),
            vec![Received::Param(ParamTest { id: 88 }), Received::Value(666)]
        );

        listener.detach();
        assert!(registry.is_empty());
        assert!(!listener.is_attached());
    }

    #[test]
    fn test_attach_rolls_back_on_conflict() {
        let registry = Arc::new(EventRegistry::new());
        registry
            .register(EventIds::Test2, Handler::new(|s: String| s))
            .unwrap();

        let mut listener = TestListener::new(Arc::clone(&registry), Arc::new(EventLog::default()));
        let err = listener.attach().unwrap_err();

        assert!(matches!(err, EventError::IncompatibleHandler { id: 1, .. }));
        assert!(!registry.contains(EventIds::Test1));
        assert!(!listener.is_attached());
    }
}
