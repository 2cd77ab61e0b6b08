//! # evbus-core
//!
//! Multicast event registry for game-object scripting, with a type-keyed
//! singleton service and a small set of demo behaviours.
//!
//! ```rust,ignore
//! let registry = EventRegistry::new();
//! registry.register(1, Handler::new(|x: i32| x + 1))?;
//! registry.register(1, Handler::new(|x: i32| x * 2))?;
//!
//! assert_eq!(registry.sends_as::<i32>(1, args![5])?, vec![6, 10]);
//! assert_eq!(registry.send_as::<i32>(1, args![5])?, 10);
//! ```

pub mod error;

pub mod config;

pub mod logging;
pub use logging::LoggerBuilder;

pub mod registry;
pub use registry::{EventId, EventRegistry, Handler, Signature};

pub mod singleton;
pub use singleton::Singletons;

pub mod demo;

pub use error::{EventError, EventResult, SingletonError};
