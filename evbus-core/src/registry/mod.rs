pub mod handler;
pub use handler::{Handler, IntoHandler, Signature, TypeTag, Value};

pub mod event_registry;
pub use event_registry::{EventId, EventRegistry, RegistryStats};
