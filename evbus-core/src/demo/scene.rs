use std::sync::Arc;

use compact_str::{CompactString, format_compact};
use tracing::{info, info_span};

use crate::config::DemoConfig;
use crate::demo::{EventLog, GameObject, Installer, Received, TestEmitter, TestListener};
use crate::error::EventResult;
use crate::registry::{EventRegistry, RegistryStats};
use crate::singleton::Singletons;

/// Outcome of one [`Scene::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneReport {
    pub activated: Vec<CompactString>,
    pub received: Vec<Received>,
    pub stats: RegistryStats,
}

/// Wires the demo: a listener object, then an installer that activates the
/// emitter objects in order.
pub struct Scene {
    registry: Arc<EventRegistry>,
    singletons: Arc<Singletons>,
    config: DemoConfig,
}

impl Scene {
    #[must_use]
    pub fn new(registry: Arc<EventRegistry>, singletons: Arc<Singletons>, config: DemoConfig) -> Self {
        Self {
            registry,
            singletons,
            config,
        }
    }

    /// Load the scene, run it to completion and unload it again.
    ///
    /// The listener's handlers are removed on unload even when an emitter
    /// fails; the [`EventLog`] singleton survives for the next run.
    pub fn run(&self) -> EventResult<SceneReport> {
        let _span = info_span!("scene", emitters = self.config.emitters).entered();

        let log: Arc<EventLog> = self.singletons.instance::<EventLog>();
        let seen_before: usize = log.len();

        let mut listener = GameObject::new(
            "TestEvent",
            TestListener::new(Arc::clone(&self.registry), Arc::clone(&log)),
        );
        listener.set_active(true)?;

        let emitters: Vec<GameObject> = (0..self.config.emitters)
            .map(|index| {
                GameObject::new(
                    format_compact!("TestObject{index}"),
                    TestEmitter::new(
                        Arc::clone(&self.registry),
                        self.config.param_id,
                        self.config.value,
                    ),
                )
            })
            .collect();

        let mut installer = Installer::new(emitters);
        let started = installer.start();
        listener.destroy();
        started?;

        let report = SceneReport {
            activated: installer.activated().to_vec(),
            received: log.entries_since(seen_before),
            stats: self.registry.stats(),
        };

        info!(
            activated = report.activated.len(),
            received = report.received.len(),
            "Scene finished"
        );

        Ok(report)
    }
}
