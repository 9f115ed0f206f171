//! Shared data model: conversation input, tool schema, model descriptor,
//! responses and stream events.

pub mod events;
pub mod message;
pub mod model;
pub mod response;
pub mod tools;

pub use events::*;
pub use message::*;
pub use model::*;
pub use response::*;
pub use tools::*;
