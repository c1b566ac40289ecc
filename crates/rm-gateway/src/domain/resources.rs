//! Resource family catalogue.
//!
//! Each family maps to one upstream collection path and an identifier field.
//! Families are grouped under the consolidated tool that exposes them.

use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::OutputValidator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Consolidated tool a family is exposed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolGroup {
    /// `manage-entity`, discriminated by `entity_type`
    Entity,
    /// `manage-project-workflow`, discriminated by `workflow_type`
    ProjectWorkflow,
    /// `manage-time-tracking`, discriminated by `tracking_type`
    TimeTracking,
}

/// Coarse entity grouping; outer dispatch key of the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceFamily {
    People,
    Departments,
    Roles,
    Accounts,
    Statuses,
    TimeOffTypes,
    Clients,
    Projects,
    Tasks,
    Milestones,
    Phases,
    ProjectTasks,
    LoggedTime,
    TimeOff,
    PublicHolidays,
    TeamHolidays,
}

/// Static description of one family's upstream collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
    pub family: ResourceFamily,
    /// Collection path, e.g. `/people`
    pub path: &'static str,
    /// Identifier field carried by every record
    pub id_field: &'static str,
    pub group: ToolGroup,
    pub description: &'static str,
}

impl ResourceSpec {
    const fn new(
        family: ResourceFamily,
        path: &'static str,
        id_field: &'static str,
        group: ToolGroup,
        description: &'static str,
    ) -> Self {
        Self {
            family,
            path,
            id_field,
            group,
            description,
        }
    }

    /// Path of one record in the collection
    pub fn item_path(&self, id: u64) -> String {
        format!("{}/{}", self.path, id)
    }

    /// Validator for get/create/update responses
    pub fn record_validator(&self) -> OutputValidator {
        OutputValidator::Record {
            id_field: self.id_field,
        }
    }

    /// Validator for list pages
    pub fn list_validator(&self) -> OutputValidator {
        OutputValidator::RecordList
    }
}

static RESOURCE_SPECS: [ResourceSpec; 16] = [
    // --- manage-entity ---
    ResourceSpec::new(
        ResourceFamily::People,
        "/people",
        "people_id",
        ToolGroup::Entity,
        "People who can be scheduled",
    ),
    ResourceSpec::new(
        ResourceFamily::Departments,
        "/departments",
        "department_id",
        ToolGroup::Entity,
        "Departments people belong to",
    ),
    ResourceSpec::new(
        ResourceFamily::Roles,
        "/roles",
        "role_id",
        ToolGroup::Entity,
        "Job roles",
    ),
    ResourceSpec::new(
        ResourceFamily::Accounts,
        "/accounts",
        "account_id",
        ToolGroup::Entity,
        "User accounts and their permissions",
    ),
    ResourceSpec::new(
        ResourceFamily::Statuses,
        "/status",
        "status_id",
        ToolGroup::Entity,
        "Custom schedule statuses",
    ),
    ResourceSpec::new(
        ResourceFamily::TimeOffTypes,
        "/timeoff-types",
        "timeoff_type_id",
        ToolGroup::Entity,
        "Kinds of time off",
    ),
    ResourceSpec::new(
        ResourceFamily::Clients,
        "/clients",
        "client_id",
        ToolGroup::Entity,
        "Clients that own projects",
    ),
    // --- manage-project-workflow ---
    ResourceSpec::new(
        ResourceFamily::Projects,
        "/projects",
        "project_id",
        ToolGroup::ProjectWorkflow,
        "Projects",
    ),
    ResourceSpec::new(
        ResourceFamily::Tasks,
        "/tasks",
        "task_id",
        ToolGroup::ProjectWorkflow,
        "Scheduled allocations of people to projects",
    ),
    ResourceSpec::new(
        ResourceFamily::Milestones,
        "/milestones",
        "milestone_id",
        ToolGroup::ProjectWorkflow,
        "Project milestones",
    ),
    ResourceSpec::new(
        ResourceFamily::Phases,
        "/phases",
        "phase_id",
        ToolGroup::ProjectWorkflow,
        "Project phases",
    ),
    ResourceSpec::new(
        ResourceFamily::ProjectTasks,
        "/project-tasks",
        "task_meta_id",
        ToolGroup::ProjectWorkflow,
        "Named task templates within a project",
    ),
    // --- manage-time-tracking ---
    ResourceSpec::new(
        ResourceFamily::LoggedTime,
        "/logged-time",
        "logged_time_id",
        ToolGroup::TimeTracking,
        "Logged time entries",
    ),
    ResourceSpec::new(
        ResourceFamily::TimeOff,
        "/timeoffs",
        "timeoff_id",
        ToolGroup::TimeTracking,
        "Time off bookings",
    ),
    ResourceSpec::new(
        ResourceFamily::PublicHolidays,
        "/public-holidays",
        "holiday_id",
        ToolGroup::TimeTracking,
        "Public holidays by region",
    ),
    ResourceSpec::new(
        ResourceFamily::TeamHolidays,
        "/team-holidays",
        "holiday_id",
        ToolGroup::TimeTracking,
        "Company-wide holidays",
    ),
];

impl ResourceFamily {
    pub const ALL: [ResourceFamily; 16] = [
        ResourceFamily::People,
        ResourceFamily::Departments,
        ResourceFamily::Roles,
        ResourceFamily::Accounts,
        ResourceFamily::Statuses,
        ResourceFamily::TimeOffTypes,
        ResourceFamily::Clients,
        ResourceFamily::Projects,
        ResourceFamily::Tasks,
        ResourceFamily::Milestones,
        ResourceFamily::Phases,
        ResourceFamily::ProjectTasks,
        ResourceFamily::LoggedTime,
        ResourceFamily::TimeOff,
        ResourceFamily::PublicHolidays,
        ResourceFamily::TeamHolidays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceFamily::People => "people",
            ResourceFamily::Departments => "departments",
            ResourceFamily::Roles => "roles",
            ResourceFamily::Accounts => "accounts",
            ResourceFamily::Statuses => "statuses",
            ResourceFamily::TimeOffTypes => "time-off-types",
            ResourceFamily::Clients => "clients",
            ResourceFamily::Projects => "projects",
            ResourceFamily::Tasks => "tasks",
            ResourceFamily::Milestones => "milestones",
            ResourceFamily::Phases => "phases",
            ResourceFamily::ProjectTasks => "project-tasks",
            ResourceFamily::LoggedTime => "logged-time",
            ResourceFamily::TimeOff => "time-off",
            ResourceFamily::PublicHolidays => "public-holidays",
            ResourceFamily::TeamHolidays => "team-holidays",
        }
    }

    pub fn spec(&self) -> &'static ResourceSpec {
        // ALL and RESOURCE_SPECS share ordering
        &RESOURCE_SPECS[*self as usize]
    }

    pub fn group(&self) -> ToolGroup {
        self.spec().group
    }

    /// Families exposed through one consolidated tool
    pub fn in_group(group: ToolGroup) -> impl Iterator<Item = ResourceFamily> {
        Self::ALL.into_iter().filter(move |f| f.group() == group)
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceFamily {
    type Err = GatewayError;

    fn from_str(s: &str) -> GatewayResult<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| GatewayError::validation(format!("unknown resource family '{}'", s)))
    }
}

/// Dispatch key of the operation router
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub family: ResourceFamily,
    pub operation: String,
}

impl OperationKey {
    pub fn new(family: ResourceFamily, operation: impl Into<String>) -> Self {
        Self {
            family,
            operation: operation.into(),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family, self.operation)
    }
}
