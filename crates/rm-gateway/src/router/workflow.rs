//! `manage-project-workflow` operations beyond CRUD.

use super::params::{date_range, require_object, upcoming_window};
use super::records::{bulk_value, date_of, field_u64, has_tag, sort_by_date};
use super::{Call, HandlerFuture, Route};
use crate::domain::error::GatewayResult;
use crate::domain::resources::{ResourceFamily, ResourceSpec};
use crate::domain::types::{ListQuery, ResponseFormat};
use crate::gateway::Gateway;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};

pub(super) const ROUTES: &[Route] = &[
    Route {
        family: ResourceFamily::Projects,
        operations: &[
            "list-active",
            "list-by-client",
            "list-by-tag",
            "list-with-team-size",
            "hierarchy",
        ],
        handler: projects,
    },
    Route {
        family: ResourceFamily::Tasks,
        operations: &[
            "list-by-person",
            "list-by-project",
            "list-in-range",
            "bulk-create",
        ],
        handler: tasks,
    },
    Route {
        family: ResourceFamily::Milestones,
        operations: &["list-upcoming", "list-by-project"],
        handler: milestones,
    },
    Route {
        family: ResourceFamily::Phases,
        operations: &["list-by-project"],
        handler: phases,
    },
    Route {
        family: ResourceFamily::ProjectTasks,
        operations: &["list-by-project", "bulk-create", "reorder"],
        handler: project_tasks,
    },
];

/// POST every item to the family's collection, one at a time
pub(super) async fn bulk_create(
    gateway: &Gateway,
    spec: &'static ResourceSpec,
    items: Vec<Value>,
    format: ResponseFormat,
) -> GatewayResult<Value> {
    let outcome = gateway
        .run_bulk(items, move |_, item| async move {
            gateway.create(spec, require_object(item)?, format).await
        })
        .await?;
    bulk_value(&outcome)
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum ProjectsRequest {
    ListActive {
        #[serde(flatten)]
        query: ListQuery,
    },
    ListByClient {
        client_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
    ListByTag {
        tag: String,
        #[serde(flatten)]
        query: ListQuery,
    },
    /// Projects enriched with the number of distinct people scheduled on them
    ListWithTeamSize {
        #[serde(flatten)]
        query: ListQuery,
    },
    /// Project with its phases, milestones and task templates
    Hierarchy { project_id: u64 },
}

fn projects(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::Projects.spec();
        let format = call.format;

        match call.parse::<ProjectsRequest>()? {
            ProjectsRequest::ListActive { query } => gateway
                .list(spec, &query.filter("active", 1), format)
                .await
                .map(Value::Array),
            ProjectsRequest::ListByClient { client_id, query } => gateway
                .list(spec, &query.filter("client_id", client_id), format)
                .await
                .map(Value::Array),
            ProjectsRequest::ListByTag { tag, query } => {
                let mut records = gateway.list(spec, &query, format).await?;
                records.retain(|project| has_tag(project, &tag));
                Ok(Value::Array(records))
            }
            ProjectsRequest::ListWithTeamSize { query } => {
                list_with_team_size(gateway, &query, format).await
            }
            ProjectsRequest::Hierarchy { project_id } => {
                hierarchy(gateway, project_id, format).await
            }
        }
    })
}

/// People on a task: `people_id` or a `people_ids` list
fn task_people(task: &Value) -> Vec<u64> {
    let mut people: Vec<u64> = field_u64(task, "people_id").into_iter().collect();
    if let Some(Value::Array(ids)) = task.get("people_ids") {
        people.extend(ids.iter().filter_map(|id| match id {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }));
    }
    people
}

async fn list_with_team_size(
    gateway: &Gateway,
    query: &ListQuery,
    format: ResponseFormat,
) -> GatewayResult<Value> {
    let projects = gateway
        .list(ResourceFamily::Projects.spec(), query, format)
        .await?;
    let tasks = gateway
        .list(ResourceFamily::Tasks.spec(), &ListQuery::new(), format)
        .await?;

    let mut teams: HashMap<u64, BTreeSet<u64>> = HashMap::new();
    for task in &tasks {
        if let Some(project_id) = field_u64(task, "project_id") {
            teams.entry(project_id).or_default().extend(task_people(task));
        }
    }

    let enriched = projects
        .into_iter()
        .map(|mut project| {
            let size = field_u64(&project, "project_id")
                .and_then(|id| teams.get(&id))
                .map_or(0, BTreeSet::len);
            if let Value::Object(fields) = &mut project {
                fields.insert("team_size".to_string(), json!(size));
            }
            project
        })
        .collect();
    Ok(Value::Array(enriched))
}

async fn hierarchy(
    gateway: &Gateway,
    project_id: u64,
    format: ResponseFormat,
) -> GatewayResult<Value> {
    let project = gateway
        .get(ResourceFamily::Projects.spec(), project_id, format)
        .await?;

    let by_project = ListQuery::new().filter("project_id", project_id);
    let phases = gateway
        .list(ResourceFamily::Phases.spec(), &by_project, format)
        .await?;
    let mut milestones = gateway
        .list(ResourceFamily::Milestones.spec(), &by_project, format)
        .await?;
    let project_tasks = gateway
        .list(ResourceFamily::ProjectTasks.spec(), &by_project, format)
        .await?;
    sort_by_date(&mut milestones, &["date", "end_date"]);

    let phase_ids: BTreeSet<u64> = phases
        .iter()
        .filter_map(|phase| field_u64(phase, "phase_id"))
        .collect();
    let milestone_count = milestones.len();

    let mut by_phase: HashMap<u64, Vec<Value>> = HashMap::new();
    let mut unphased = Vec::new();
    for milestone in milestones {
        match field_u64(&milestone, "phase_id").filter(|id| phase_ids.contains(id)) {
            Some(phase_id) => by_phase.entry(phase_id).or_default().push(milestone),
            None => unphased.push(milestone),
        }
    }

    let phases: Vec<Value> = phases
        .into_iter()
        .map(|mut phase| {
            let nested = field_u64(&phase, "phase_id")
                .and_then(|id| by_phase.remove(&id))
                .unwrap_or_default();
            if let Value::Object(fields) = &mut phase {
                fields.insert("milestones".to_string(), Value::Array(nested));
            }
            phase
        })
        .collect();

    let summary = json!({
        "phase_count": phases.len(),
        "milestone_count": milestone_count,
        "project_task_count": project_tasks.len(),
    });
    Ok(json!({
        "project": project,
        "phases": phases,
        "milestones": unphased,
        "project_tasks": project_tasks,
        "summary": summary,
    }))
}

// =============================================================================
// Tasks
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum TasksRequest {
    ListByPerson {
        people_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
    ListByProject {
        project_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
    ListInRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
        #[serde(flatten)]
        query: ListQuery,
    },
    BulkCreate {
        items: Vec<Value>,
    },
}

fn tasks(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::Tasks.spec();
        let format = call.format;

        let query = match call.parse::<TasksRequest>()? {
            TasksRequest::ListByPerson { people_id, query } => query.filter("people_id", people_id),
            TasksRequest::ListByProject { project_id, query } => {
                query.filter("project_id", project_id)
            }
            TasksRequest::ListInRange {
                start_date,
                end_date,
                query,
            } => date_range(query, start_date, end_date)?,
            TasksRequest::BulkCreate { items } => {
                return bulk_create(gateway, spec, items, format).await
            }
        };
        gateway.list(spec, &query, format).await.map(Value::Array)
    })
}

// =============================================================================
// Milestones and phases
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum MilestonesRequest {
    /// Milestones dated from today through `days` ahead, soonest first
    ListUpcoming {
        days: Option<u32>,
        #[serde(flatten)]
        query: ListQuery,
    },
    ListByProject {
        project_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
}

fn milestones(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::Milestones.spec();
        let format = call.format;

        match call.parse::<MilestonesRequest>()? {
            MilestonesRequest::ListUpcoming { days, query } => {
                let (today, until) = upcoming_window(gateway.today(), days)?;
                let query = date_range(query, today, until)?;
                let today = today.to_string();

                let mut records = gateway.list(spec, &query, format).await?;
                records.retain(|m| {
                    date_of(m, &["date", "end_date"]).map_or(true, |date| date >= today.as_str())
                });
                sort_by_date(&mut records, &["date", "end_date"]);
                Ok(Value::Array(records))
            }
            MilestonesRequest::ListByProject { project_id, query } => gateway
                .list(spec, &query.filter("project_id", project_id), format)
                .await
                .map(Value::Array),
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum PhasesRequest {
    ListByProject {
        project_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
}

fn phases(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::Phases.spec();
        let PhasesRequest::ListByProject { project_id, query } = call.parse()?;
        gateway
            .list(spec, &query.filter("project_id", project_id), call.format)
            .await
            .map(Value::Array)
    })
}

// =============================================================================
// Project tasks
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum ProjectTasksRequest {
    ListByProject {
        project_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
    BulkCreate {
        items: Vec<Value>,
    },
    /// Ids in their new order; each gets `sort_order` = position + 1
    Reorder {
        order: Vec<u64>,
    },
}

fn project_tasks(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::ProjectTasks.spec();
        let format = call.format;

        match call.parse::<ProjectTasksRequest>()? {
            ProjectTasksRequest::ListByProject { project_id, query } => gateway
                .list(spec, &query.filter("project_id", project_id), format)
                .await
                .map(Value::Array),
            ProjectTasksRequest::BulkCreate { items } => {
                bulk_create(gateway, spec, items, format).await
            }
            ProjectTasksRequest::Reorder { order } => {
                let outcome = gateway
                    .run_bulk(order, move |position, id| async move {
                        let change = json!({ "sort_order": position + 1 });
                        gateway.update(spec, id, change, format).await
                    })
                    .await?;
                bulk_value(&outcome)
            }
        }
    })
}
