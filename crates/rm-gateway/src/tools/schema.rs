//! JSON input schemas of the consolidated tools.

use super::{discriminator, tool_name, ToolDefinition};
use crate::domain::resources::{ResourceFamily, ToolGroup};
use crate::router::Router;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

const SUMMARIES: [(ToolGroup, &str); 3] = [
    (
        ToolGroup::Entity,
        "Manage people, departments, roles, accounts, statuses, time-off types and clients.",
    ),
    (
        ToolGroup::ProjectWorkflow,
        "Manage projects, tasks, milestones, phases and project task templates.",
    ),
    (
        ToolGroup::TimeTracking,
        "Manage logged time, time off, public holidays and team holidays.",
    ),
];

pub(super) fn definition(router: &Router, group: ToolGroup, max_page_size: u32) -> ToolDefinition {
    let families: Vec<ResourceFamily> = ResourceFamily::in_group(group).collect();

    let mut description = SUMMARIES
        .iter()
        .find(|(g, _)| *g == group)
        .map(|(_, summary)| summary.to_string())
        .unwrap_or_default();
    description.push_str(" Operations per type:");
    let mut operations = BTreeSet::new();
    for family in &families {
        let supported = router.operations(*family);
        description.push_str(&format!("\n- {}: {}", family, supported.join(", ")));
        operations.extend(supported.into_iter().map(str::to_string));
    }

    let family_names: Vec<&str> = families.iter().map(|f| f.as_str()).collect();
    let key = discriminator(group);

    let mut properties = Map::new();
    properties.insert(
        key.to_string(),
        json!({
            "type": "string",
            "enum": family_names,
            "description": "Resource family to operate on",
        }),
    );
    properties.insert(
        "operation".to_string(),
        json!({
            "type": "string",
            "enum": operations,
            "description": "Operation to run; see the tool description for what each type supports",
        }),
    );
    properties.insert(
        "format".to_string(),
        json!({
            "type": "string",
            "enum": ["json", "xml", "csv"],
            "default": "json",
            "description": "Upstream response encoding; csv is served as json",
        }),
    );
    for (name, schema) in common_properties(max_page_size)
        .into_iter()
        .chain(group_properties(group))
    {
        properties.insert(name.to_string(), schema);
    }

    ToolDefinition {
        name: tool_name(group).to_string(),
        description,
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": [key, "operation"],
            "additionalProperties": true,
        }),
    }
}

fn id() -> Value {
    json!({ "type": "integer", "minimum": 1 })
}

fn date(description: &str) -> Value {
    json!({ "type": "string", "format": "date", "description": description })
}

fn common_properties(max_page_size: u32) -> Vec<(&'static str, Value)> {
    vec![
        (
            "id",
            json!({
                "type": "integer",
                "minimum": 1,
                "description": "Record id for get, update and delete",
            }),
        ),
        (
            "data",
            json!({ "type": "object", "description": "Record fields for create and update" }),
        ),
        (
            "page",
            json!({
                "type": "integer",
                "minimum": 1,
                "description": "Page to start from; with per-page, only this page is fetched",
            }),
        ),
        (
            "per-page",
            json!({
                "type": "integer",
                "minimum": 1,
                "maximum": max_page_size,
                "description": "Page size",
            }),
        ),
    ]
}

fn days() -> Value {
    json!({ "type": "integer", "minimum": 1, "maximum": 366, "default": 30 })
}

fn items() -> Value {
    json!({ "type": "array", "items": { "type": "object" } })
}

fn tag() -> Value {
    json!({ "type": "string", "description": "Tag name for list-by-tag" })
}

fn group_properties(group: ToolGroup) -> Vec<(&'static str, Value)> {
    match group {
        ToolGroup::Entity => vec![
            ("department_id", id()),
            ("tag", tag()),
            (
                "updates",
                json!({
                    "type": "array",
                    "items": { "type": "object", "required": ["account_id"] },
                    "description": "Permission changes, each with an account_id",
                }),
            ),
        ],
        ToolGroup::ProjectWorkflow => vec![
            ("project_id", id()),
            ("client_id", id()),
            ("people_id", id()),
            ("tag", tag()),
            ("start_date", date("Range start, YYYY-MM-DD")),
            ("end_date", date("Range end, YYYY-MM-DD")),
            ("days", days()),
            ("items", items()),
            (
                "order",
                json!({
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "Task template ids in their new order",
                }),
            ),
        ],
        ToolGroup::TimeTracking => vec![
            ("people_id", id()),
            ("start_date", date("Range start, YYYY-MM-DD")),
            ("end_date", date("Range end, YYYY-MM-DD")),
            ("days", days()),
            (
                "year",
                json!({
                    "type": "integer",
                    "description": "Calendar year, default the current one",
                }),
            ),
            ("items", items()),
        ],
    }
}
