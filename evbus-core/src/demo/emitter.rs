use std::sync::Arc;

use tracing::info;

use crate::args;
use crate::demo::{Behaviour, EventIds, ParamTest};
use crate::error::EventResult;
use crate::registry::EventRegistry;

/// Sends `Test1` and `Test2` every time its object is enabled
pub struct TestEmitter {
    registry: Arc<EventRegistry>,
    param_id: i32,
    value: i32,
}

impl TestEmitter {
    #[must_use]
    pub fn new(registry: Arc<EventRegistry>, param_id: i32, value: i32) -> Self {
        Self {
            registry,
            param_id,
            value,
        }
    }

    pub fn emit(&self) -> EventResult<()> {
        info!("Send events");

        self.registry
            .send(EventIds::Test1, args![ParamTest { id: self.param_id }])?;
        self.registry.send(EventIds::Test2, args![self.value])?;

        Ok(())
    }
}

impl Behaviour for TestEmitter {
    fn on_enable(&mut self) -> EventResult<()> {
        self.emit()
    }
}
