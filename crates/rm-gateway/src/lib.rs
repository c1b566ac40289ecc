// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! Resource Gateway - tool-calling front end for a resource-management API.
//!
//! Exposes people, projects, tasks, logged time, time off and the related
//! catalogues through three consolidated tools, and funnels every upstream
//! call through one rate-limited client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         RESOURCE GATEWAY                             │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  tools      manage-entity │ manage-project-workflow │ manage-time-   │
//! │             (entity_type) │ (workflow_type)         │ tracking       │
//! │                       │                                              │
//! │  router     (family, operation) → handler                            │
//! │                       │                                              │
//! │  gateway    Paginator / BulkExecutor                                 │
//! │                       │                                              │
//! │             RequestExecutor ── AdmissionQueue (sliding window)       │
//! │                       │                                              │
//! │  ports      HttpTransport ── ReqwestTransport │ InMemoryBackend       │
//! └───────────────────────┼──────────────────────────────────────────────┘
//!                         ▼
//!                  upstream REST API
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rm_gateway::{Gateway, GatewayConfig, Router, ToolSet};
//!
//! let gateway = Arc::new(Gateway::connect(GatewayConfig::from_env()?)?);
//! let tools = ToolSet::new(Router::new(gateway));
//! let outcome = tools
//!     .call("manage-entity", json!({"entity_type": "people", "operation": "list-active"}))
//!     .await;
//! ```
//!
//! # Guarantees
//!
//! - At most `max_requests` upstream requests start in any rolling window
//! - Multi-page lists are fetched until a short page and concatenated in order
//! - Bulk operations report one result per item, in input order
//! - Upstream failures map to Validation, NotFound, Auth, RateLimit or Upstream

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod gateway;
pub mod ports;
pub mod router;
pub mod tools;

// Re-exports for public API
pub use adapters::{FailureRule, InMemoryBackend, ReqwestTransport};
pub use domain::config::{ConfigError, GatewayConfig};
pub use domain::correlation::CorrelationId;
pub use domain::error::{ErrorKind, GatewayError, GatewayResult};
pub use domain::resources::{ResourceFamily, ResourceSpec, ToolGroup};
pub use domain::types::*;
pub use gateway::{Gateway, GatewayMetrics};
pub use ports::{HttpTransport, TimeSource, TransportError};
pub use router::Router;
pub use tools::{ToolCallOutcome, ToolDefinition, ToolSet};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent upstream
pub fn user_agent() -> String {
    format!("rm-gateway/{}", VERSION)
}
