//! Consolidated tools.
//!
//! Three tools front the whole catalogue. Each takes a family discriminator
//! (`entity_type`, `workflow_type` or `tracking_type`), an `operation`, an
//! optional `format` and the operation's own parameters, and hands them to
//! the [`Router`]. Every call gets a correlation id that tags its tracing
//! span and the response metadata.

mod schema;

use crate::domain::correlation::CorrelationId;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::resources::{ResourceFamily, ToolGroup};
use crate::router::Router;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

pub const MANAGE_ENTITY: &str = "manage-entity";
pub const MANAGE_PROJECT_WORKFLOW: &str = "manage-project-workflow";
pub const MANAGE_TIME_TRACKING: &str = "manage-time-tracking";

pub const GROUPS: [ToolGroup; 3] = [
    ToolGroup::Entity,
    ToolGroup::ProjectWorkflow,
    ToolGroup::TimeTracking,
];

pub fn tool_name(group: ToolGroup) -> &'static str {
    match group {
        ToolGroup::Entity => MANAGE_ENTITY,
        ToolGroup::ProjectWorkflow => MANAGE_PROJECT_WORKFLOW,
        ToolGroup::TimeTracking => MANAGE_TIME_TRACKING,
    }
}

/// Argument naming the resource family within a tool
pub fn discriminator(group: ToolGroup) -> &'static str {
    match group {
        ToolGroup::Entity => "entity_type",
        ToolGroup::ProjectWorkflow => "workflow_type",
        ToolGroup::TimeTracking => "tracking_type",
    }
}

pub fn group_for_tool(name: &str) -> Option<ToolGroup> {
    GROUPS.into_iter().find(|group| tool_name(*group) == name)
}

/// Name, description and JSON input schema of one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result of one tool call plus the metadata reported with it
#[derive(Debug, Clone)]
pub struct ToolCallOutcome {
    pub correlation_id: CorrelationId,
    pub tool: String,
    pub family: Option<ResourceFamily>,
    pub operation: Option<String>,
    pub result: GatewayResult<Value>,
}

impl ToolCallOutcome {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// `{ok, data | error, meta}` as handed back to the caller
    pub fn to_value(&self) -> Value {
        let meta = json!({
            "correlation_id": self.correlation_id,
            "tool": self.tool,
            "family": self.family,
            "operation": self.operation,
        });
        match &self.result {
            Ok(data) => json!({ "ok": true, "data": data, "meta": meta }),
            Err(error) => json!({ "ok": false, "error": error.to_value(), "meta": meta }),
        }
    }
}

/// The consolidated tool set over one router
pub struct ToolSet {
    router: Router,
}

impl ToolSet {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let max_page_size = self.router.gateway().config().pagination.max_page_size;
        GROUPS
            .into_iter()
            .map(|group| schema::definition(&self.router, group, max_page_size))
            .collect()
    }

    /// Run one tool call; failures are captured in the outcome
    pub async fn call(&self, name: &str, arguments: Value) -> ToolCallOutcome {
        let correlation_id = CorrelationId::new();
        let span = info_span!("tool_call", tool = name, correlation_id = %correlation_id);

        async move {
            let started = Instant::now();
            let (family, operation, result) = match prepare(name, arguments) {
                Ok((family, operation, params)) => {
                    let result = self.router.route(family, &operation, params).await;
                    (Some(family), Some(operation), result)
                }
                Err(e) => (None, None, Err(e)),
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => info!(family = ?family, operation = ?operation, elapsed_ms, "Tool call succeeded"),
                Err(e) => warn!(
                    family = ?family,
                    operation = ?operation,
                    kind = %e.kind(),
                    error = %e,
                    elapsed_ms,
                    "Tool call failed"
                ),
            }

            ToolCallOutcome {
                correlation_id,
                tool: name.to_string(),
                family,
                operation,
                result,
            }
        }
        .instrument(span)
        .await
    }
}

/// Resolve tool arguments into `(family, operation, params)`
fn prepare(name: &str, arguments: Value) -> GatewayResult<(ResourceFamily, String, Value)> {
    let group = group_for_tool(name)
        .ok_or_else(|| GatewayError::validation(format!("unknown tool '{}'", name)))?;

    let mut args = match arguments {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(GatewayError::validation("tool arguments must be a JSON object")),
    };

    let key = discriminator(group);
    let family: ResourceFamily = take_string(&mut args, key)?.parse()?;
    if family.group() != group {
        return Err(GatewayError::validation(format!(
            "'{}' is not handled by {}; use {}",
            family,
            name,
            tool_name(family.group())
        )));
    }

    let operation = take_string(&mut args, "operation")?;
    Ok((family, operation, Value::Object(args)))
}

fn take_string(args: &mut Map<String, Value>, key: &str) -> GatewayResult<String> {
    match args.remove(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(other) if !other.is_null() => Err(GatewayError::validation(format!(
            "'{}' must be a string",
            key
        ))),
        _ => Err(GatewayError::validation(format!("missing required argument '{}'", key))),
    }
}
