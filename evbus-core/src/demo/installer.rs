use compact_str::CompactString;
use tracing::info;

use crate::demo::GameObject;
use crate::error::EventResult;

/// Activates a list of objects in order
#[derive(Debug, Default)]
pub struct Installer {
    objects: Vec<GameObject>,
    activated: Vec<CompactString>,
}

impl Installer {
    #[must_use]
    pub fn new(objects: Vec<GameObject>) -> Self {
        let activated = Vec::with_capacity(objects.len());
        Self { objects, activated }
    }

    pub fn push(&mut self, object: GameObject) {
        self.objects.push(object);
    }

    /// Activate every object in list order, stopping at the first failure.
    /// Objects already active are skipped.
    pub fn start(&mut self) -> EventResult<()> {
        for object in &mut self.objects {
            if object.is_active() {
                continue;
            }

            object.set_active(true)?;
            info!(object = object.name(), "Initialized");
            self.activated.push(CompactString::new(object.name()));
        }

        Ok(())
    }

    /// Names of the objects activated so far, in activation order
    #[must_use]
    pub fn activated(&self) -> &[CompactString] {
        &self.activated
    }

    #[must_use]
    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn into_objects(self) -> Vec<GameObject> {
        self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::Behaviour;
    use crate::error::EventError;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recorder {
        label: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Behaviour for Recorder {
        fn on_enable(&mut self) -> EventResult<()> {
            self.order.lock().push(self.label);
            if self.fail {
                return Err(EventError::ArityMismatch {
                    id: 0,
                    expected: 1,
                    found: 0,
                });
            }
            Ok(())
        }
    }

    fn object(label: &'static str, order: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> GameObject {
        GameObject::new(
            label,
            Recorder {
                label,
                order: Arc::clone(order),
                fail,
            },
        )
    }

    #[test]
    fn test_activates_in_list_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut installer = Installer::new(vec![
            object("first", &order, false),
            object("second", &order, false),
        ]);
        installer.push(object("third", &order, false));

        installer.start().unwrap();

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
        assert_eq!(installer.activated(), ["first", "second", "third"]);
        assert!(installer.objects().iter().all(GameObject::is_active));

        // Second start finds nothing left to activate
        installer.start().unwrap();
        assert_eq!(order.lock().len(), 3);
    }

    #[test]
    fn test_stops_at_first_failure() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut installer = Installer::new(vec![
            object("ok", &order, false),
            object("broken", &order, true),
            object("never", &order, false),
        ]);

        assert!(installer.start().is_err());
        assert_eq!(*order.lock(), vec!["ok", "broken"]);
        assert_eq!(installer.activated().len(), 1);

        let objects = installer.into_objects();
        assert!(!objects[2].is_active());
    }
}
