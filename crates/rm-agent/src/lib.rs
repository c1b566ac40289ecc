//! # Resource Gateway Agent
//!
//! Stdio front end for the consolidated resource tools.
//!
//! ```text
//! stdin ──lines──► ToolServer ──spawn per message──► ToolSet::call
//!                                                        │
//! stdout ◄── single writer task ◄── mpsc ◄───────────────┘
//! ```
//!
//! Supported methods: `initialize`, `ping`, `tools/list`, `tools/call`.
//! Messages without an `id` are notifications and get no answer.

pub mod protocol;
pub mod server;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::ToolServer;
