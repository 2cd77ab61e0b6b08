//! Demo behaviours driving the registry the way game-object scripts would

pub mod behaviour;
pub use behaviour::{Behaviour, GameObject};

pub mod event_ids;
pub use event_ids::{EventIds, ParamTest};

pub mod listener;
pub use listener::{EventLog, Received, TestListener};

pub mod emitter;
pub use emitter::TestEmitter;

pub mod installer;
pub use installer::Installer;

pub mod scene;
pub use scene::{Scene, SceneReport};
