//! Direct CRUD shared by every family.

use super::params::require_object;
use super::{Call, HandlerFuture};
use crate::domain::resources::ResourceFamily;
use crate::domain::types::ListQuery;
use crate::gateway::Gateway;
use serde::Deserialize;
use serde_json::{json, Value};

const ALL: &[&str] = &["list", "get", "create", "update", "delete"];

/// Accounts are provisioned outside the API
const READ_UPDATE: &[&str] = &["list", "get", "update"];

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum CrudRequest {
    List {
        #[serde(flatten)]
        query: ListQuery,
    },
    Get {
        id: u64,
    },
    Create {
        data: Value,
    },
    Update {
        id: u64,
        data: Value,
    },
    Delete {
        id: u64,
    },
}

pub(super) fn operations(family: ResourceFamily) -> &'static [&'static str] {
    match family {
        ResourceFamily::Accounts => READ_UPDATE,
        _ => ALL,
    }
}

pub(super) fn handle(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = call.family.spec();
        let format = call.format;

        match call.parse::<CrudRequest>()? {
            CrudRequest::List { query } => gateway.list(spec, &query, format).await.map(Value::Array),
            CrudRequest::Get { id } => gateway.get(spec, id, format).await,
            CrudRequest::Create { data } => {
                gateway.create(spec, require_object(data)?, format).await
            }
            CrudRequest::Update { id, data } => {
                gateway
                    .update(spec, id, require_object(data)?, format)
                    .await
            }
            CrudRequest::Delete { id } => {
                gateway.delete(spec, id, format).await?;
                Ok(json!({ "deleted": true, spec.id_field: id }))
            }
        }
    })
}
