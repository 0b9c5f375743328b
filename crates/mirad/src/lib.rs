//! Mira daemon library - exposes modules for integration tests.

pub mod config;
pub mod console;
pub mod device;
pub mod evolution;
pub mod monitor;
pub mod policy;
pub mod responder;
pub mod shutdown;
pub mod voice;
