//! Decision-tree operation router.
//!
//! A table of `(family, operation) → handler` is built once from every
//! family's declared operation list. Plain CRUD shares one handler; each
//! family with extra operations has its own handler that deserializes the
//! parameters into a typed request enum tagged by operation name.
//!
//! ```text
//! route(family, operation, params)
//!    │
//!    ├── table lookup ──miss──► Validation("unsupported operation ...")
//!    │
//!    ▼
//! handler(gateway, Call)
//!    ├── crud     list / get / create / update / delete
//!    ├── entity   people, accounts
//!    ├── workflow projects, tasks, milestones, phases, project-tasks
//!    └── tracking logged-time, time-off, public/team holidays
//! ```

mod crud;
mod entity;
mod params;
mod records;
mod tracking;
mod workflow;

pub use params::Call;

use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::resources::{OperationKey, ResourceFamily};
use crate::domain::types::ResponseFormat;
use crate::gateway::Gateway;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub type HandlerFuture<'a> = BoxFuture<'a, GatewayResult<Value>>;

/// Entry point of one routed operation
pub type Handler = for<'a> fn(&'a Gateway, Call) -> HandlerFuture<'a>;

/// Operations a handler serves for one family
pub(crate) struct Route {
    pub family: ResourceFamily,
    pub operations: &'static [&'static str],
    pub handler: Handler,
}

/// Routes `(family, operation, params)` to exactly one handler
pub struct Router {
    gateway: Arc<Gateway>,
    table: HashMap<OperationKey, Handler>,
}

impl Router {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let mut table: HashMap<OperationKey, Handler> = HashMap::new();

        for family in ResourceFamily::ALL {
            for operation in crud::operations(family) {
                table.insert(OperationKey::new(family, *operation), crud::handle);
            }
        }

        let extra = entity::ROUTES
            .iter()
            .chain(workflow::ROUTES)
            .chain(tracking::ROUTES);
        for route in extra {
            for operation in route.operations {
                table.insert(OperationKey::new(route.family, *operation), route.handler);
            }
        }

        debug!(operations = table.len(), "Operation table built");
        Self { gateway, table }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn supports(&self, family: ResourceFamily, operation: &str) -> bool {
        self.table
            .contains_key(&OperationKey::new(family, operation))
    }

    /// Operation names registered for a family, sorted
    pub fn operations(&self, family: ResourceFamily) -> Vec<&str> {
        let mut operations: Vec<&str> = self
            .table
            .keys()
            .filter(|key| key.family == family)
            .map(|key| key.operation.as_str())
            .collect();
        operations.sort_unstable();
        operations
    }

    /// Dispatch one operation.
    ///
    /// `params` must be an object (or null). An optional `format` key selects
    /// the upstream response encoding; everything else is handed to the
    /// family handler.
    pub async fn route(
        &self,
        family: ResourceFamily,
        operation: &str,
        params: Value,
    ) -> GatewayResult<Value> {
        let handler = *self
            .table
            .get(&OperationKey::new(family, operation))
            .ok_or_else(|| GatewayError::unknown_operation(family.as_str(), operation))?;

        let mut params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(GatewayError::validation("parameters must be a JSON object")),
        };

        let format = match params.remove("format") {
            None | Some(Value::Null) => ResponseFormat::default(),
            Some(Value::String(raw)) => ResponseFormat::parse_lenient(&raw)?,
            Some(other) => {
                return Err(GatewayError::validation(format!(
                    "format must be a string, got {}",
                    other
                )))
            }
        };
        params.insert("operation".to_string(), Value::String(operation.to_string()));

        debug!(family = %family, operation, ?format, "Routing operation");
        let call = Call {
            family,
            operation: operation.to_string(),
            params: Value::Object(params),
            format,
        };
        handler(&self.gateway, call).await
    }
}
