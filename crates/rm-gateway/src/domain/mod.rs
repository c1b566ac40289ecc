//! Domain types for the gateway.
//!
//! Configuration, the error taxonomy, the resource catalogue and the value
//! types that flow between the router and the request executor.

pub mod config;
pub mod correlation;
pub mod error;
pub mod resources;
pub mod types;

pub use config::{ConfigError, GatewayConfig};
pub use correlation::CorrelationId;
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use resources::{OperationKey, ResourceFamily, ResourceSpec, ToolGroup};
pub use types::*;
