//! `manage-entity` operations beyond CRUD: people and accounts.

use super::records::{bulk_value, has_tag};
use super::{Call, HandlerFuture, Route};
use crate::domain::error::GatewayError;
use crate::domain::resources::ResourceFamily;
use crate::domain::types::ListQuery;
use crate::gateway::Gateway;
use serde::Deserialize;
use serde_json::{Map, Value};

pub(super) const ROUTES: &[Route] = &[
    Route {
        family: ResourceFamily::People,
        operations: &["list-active", "list-by-department", "list-by-tag"],
        handler: people,
    },
    Route {
        family: ResourceFamily::Accounts,
        operations: &["list-active", "update-permissions"],
        handler: accounts,
    },
];

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum PeopleRequest {
    ListActive {
        #[serde(flatten)]
        query: ListQuery,
    },
    ListByDepartment {
        department_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
    /// Tags are nested records, so this filter runs client-side
    ListByTag {
        tag: String,
        #[serde(flatten)]
        query: ListQuery,
    },
}

fn people(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::People.spec();
        let format = call.format;

        let records = match call.parse::<PeopleRequest>()? {
            PeopleRequest::ListActive { query } => {
                gateway.list(spec, &query.filter("active", 1), format).await?
            }
            PeopleRequest::ListByDepartment {
                department_id,
                query,
            } => {
                let query = query.filter("department_id", department_id);
                gateway.list(spec, &query, format).await?
            }
            PeopleRequest::ListByTag { tag, query } => {
                let mut records = gateway.list(spec, &query, format).await?;
                records.retain(|person| has_tag(person, &tag));
                records
            }
        };
        Ok(Value::Array(records))
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum AccountsRequest {
    ListActive {
        #[serde(flatten)]
        query: ListQuery,
    },
    /// Each update is `{account_id, ...fields}`; items are checked one by one
    UpdatePermissions { updates: Vec<Value> },
}

#[derive(Debug, Deserialize)]
struct PermissionUpdate {
    account_id: u64,
    #[serde(flatten)]
    changes: Map<String, Value>,
}

fn accounts(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::Accounts.spec();
        let format = call.format;

        match call.parse::<AccountsRequest>()? {
            AccountsRequest::ListActive { query } => gateway
                .list(spec, &query.filter("active", 1), format)
                .await
                .map(Value::Array),
            AccountsRequest::UpdatePermissions { updates } => {
                let outcome = gateway
                    .run_bulk(updates, move |_, item| async move {
                        let update: PermissionUpdate = serde_json::from_value(item)?;
                        if update.changes.is_empty() {
                            return Err(GatewayError::validation(format!(
                                "no changes given for account {}",
                                update.account_id
                            )));
                        }
                        gateway
                            .update(spec, update.account_id, Value::Object(update.changes), format)
                            .await
                    })
                    .await?;
                bulk_value(&outcome)
            }
        }
    })
}
