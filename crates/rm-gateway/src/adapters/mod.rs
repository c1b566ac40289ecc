//! Adapters for the gateway.
//!
//! Implementations of the outbound transport port: HTTP via `reqwest` for
//! production and an in-memory upstream for tests and offline runs.

pub mod http;
pub mod memory;

pub use http::ReqwestTransport;
pub use memory::{FailureRule, InMemoryBackend};
