//! Retry module
//! - policy.rs: injected ceiling, backoff and budget constants
//! - engine.rs: per-attempt retry/fail classification

pub mod engine;
pub mod policy;

pub use engine::*;
pub use policy::*;
