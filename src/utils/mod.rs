//! Utility modules
//!
//! Cancellation helpers, panic isolation and header construction.

pub mod cancel;
pub mod fault;
pub mod http_headers;

pub use cancel::*;
pub use fault::*;
pub use http_headers::HttpHeaderBuilder;
