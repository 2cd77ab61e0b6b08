//!
//! ``evbus-core/src/demo/behaviour.rs``
//!
//! Minimal object lifecycle for the demo: `awake` once on first activation,
//! `on_enable`/`on_disable` on every active-flag transition, `on_destroy` when
//! an awoken object is dropped through [`GameObject::destroy`].
//!
use compact_str::CompactString;
use tracing::debug;

use crate::error::EventResult;

pub trait Behaviour {
    fn awake(&mut self) -> EventResult<()> {
        Ok(())
    }

    fn on_enable(&mut self) -> EventResult<()> {
        Ok(())
    }

    fn on_disable(&mut self) -> EventResult<()> {
        Ok(())
    }

    fn on_destroy(&mut self) {}
}

/// Named holder of one behaviour plus an active flag. Starts inactive.
pub struct GameObject {
    name: CompactString,
    active: bool,
    awoken: bool,
    behaviour: Box<dyn Behaviour>,
}

impl GameObject {
    pub fn new(name: impl Into<CompactString>, behaviour: impl Behaviour + 'static) -> Self {
        Self {
            name: name.into(),
            active: false,
            awoken: false,
            behaviour: Box::new(behaviour),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Flip the active flag, running the matching hooks on a transition.
    ///
    /// A failing `awake` leaves the object inactive and un-awoken; a failing
    /// `on_enable` leaves it active.
    pub fn set_active(&mut self, active: bool) -> EventResult<()> {
        if active == self.active {
            return Ok(());
        }

        if active {
            if !self.awoken {
                self.behaviour.awake()?;
                self.awoken = true;
            }

            self.active = true;
            debug!(object = %self.name, "Object enabled");
            self.behaviour.on_enable()
        } else {
            self.active = false;
            debug!(object = %self.name, "Object disabled");
            self.behaviour.on_disable()
        }
    }

    pub fn destroy(mut self) {
        if self.awoken {
            self.behaviour.on_destroy();
        }

        debug!(object = %self.name, "Object destroyed");
    }
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("awoken", &self.awoken)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Hooks(Arc<Mutex<Vec<&'static str>>>);

    impl Behaviour for Hooks {
        fn awake(&mut self) -> EventResult<()> {
            self.0.lock().push("awake");
            Ok(())
        }

        fn on_enable(&mut self) -> EventResult<()> {
            self.0.lock().push("enable");
            Ok(())
        }

        fn on_disable(&mut self) -> EventResult<()> {
            self.0.lock().push("disable");
            Ok(())
        }

        fn on_destroy(&mut self) {
            self.0.lock().push("destroy");
        }
    }

    #[test]
    fn test_lifecycle_order() {
        let hooks = Hooks::default();
        let mut object = GameObject::new("probe", hooks.clone());
        assert!(!object.is_active());

        object.set_active(true).unwrap();
        object.set_active(true).unwrap();
        object.set_active(false).unwrap();
        object.set_active(true).unwrap();
        object.destroy();

        assert_eq!(
            *hooks.0.lock(),
            vec!["awake", "enable", "disable", "enable", "destroy"]
        );
    }

    #[test]
    fn test_destroy_without_awake_skips_hook() {
        let hooks = Hooks::default();
        let object = GameObject::new("idle", hooks.clone());
        assert_eq!(object.name(), "idle");

        object.destroy();
        assert!(hooks.0.lock().is_empty());
    }
}
