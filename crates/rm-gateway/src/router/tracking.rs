//! `manage-time-tracking` operations beyond CRUD.

use super::params::{date_range, upcoming_window, year_window};
use super::records::{date_of, field_f64, field_u64, is_truthy, sort_by_date};
use super::workflow::bulk_create;
use super::{Call, HandlerFuture, Route};
use crate::domain::error::GatewayResult;
use crate::domain::resources::ResourceFamily;
use crate::domain::types::{ListQuery, ResponseFormat};
use crate::gateway::Gateway;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub(super) const ROUTES: &[Route] = &[
    Route {
        family: ResourceFamily::LoggedTime,
        operations: &[
            "list-billable",
            "list-by-person",
            "bulk-create",
            "person-summary",
        ],
        handler: logged_time,
    },
    Route {
        family: ResourceFamily::TimeOff,
        operations: &["list-by-person", "list-upcoming", "bulk-create"],
        handler: time_off,
    },
    Route {
        family: ResourceFamily::PublicHolidays,
        operations: &["list-for-year"],
        handler: public_holidays,
    },
    Route {
        family: ResourceFamily::TeamHolidays,
        operations: &["list-upcoming"],
        handler: team_holidays,
    },
];

/// Drop records that ended before `today`, then sort soonest first
fn upcoming_only(
    mut records: Vec<Value>,
    today: NaiveDate,
    end_fields: &[&str],
    start_fields: &[&str],
) -> Vec<Value> {
    let today = today.to_string();
    records.retain(|r| date_of(r, end_fields).map_or(true, |date| date >= today.as_str()));
    sort_by_date(&mut records, start_fields);
    records
}

// =============================================================================
// Logged time
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum LoggedTimeRequest {
    ListBillable {
        #[serde(flatten)]
        query: ListQuery,
    },
    ListByPerson {
        people_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
    BulkCreate {
        items: Vec<Value>,
    },
    /// Hours per person over an optional window, busiest first
    PersonSummary {
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        people_id: Option<u64>,
        #[serde(flatten)]
        query: ListQuery,
    },
}

fn logged_time(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::LoggedTime.spec();
        let format = call.format;

        let query = match call.parse::<LoggedTimeRequest>()? {
            LoggedTimeRequest::ListBillable { query } => query.filter("billable", 1),
            LoggedTimeRequest::ListByPerson { people_id, query } => {
                query.filter("people_id", people_id)
            }
            LoggedTimeRequest::BulkCreate { items } => {
                return bulk_create(gateway, spec, items, format).await
            }
            LoggedTimeRequest::PersonSummary {
                start_date,
                end_date,
                people_id,
                query,
            } => {
                return person_summary(gateway, query, start_date, end_date, people_id, format)
                    .await
            }
        };
        gateway.list(spec, &query, format).await.map(Value::Array)
    })
}

#[derive(Debug, Default)]
struct PersonHours {
    hours: f64,
    billable_hours: f64,
    entries: usize,
}

async fn person_summary(
    gateway: &Gateway,
    mut query: ListQuery,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    people_id: Option<u64>,
    format: ResponseFormat,
) -> GatewayResult<Value> {
    match (start_date, end_date) {
        (Some(start), Some(end)) => query = date_range(query, start, end)?,
        (Some(start), None) => query = query.filter("start_date", start.to_string()),
        (None, Some(end)) => query = query.filter("end_date", end.to_string()),
        (None, None) => {}
    }
    if let Some(people_id) = people_id {
        query = query.filter("people_id", people_id);
    }

    let entries = gateway
        .list(ResourceFamily::LoggedTime.spec(), &query, format)
        .await?;

    let mut per_person: BTreeMap<u64, PersonHours> = BTreeMap::new();
    for entry in &entries {
        let Some(person) = field_u64(entry, "people_id") else {
            continue;
        };
        let hours = field_f64(entry, "hours").unwrap_or(0.0);
        let totals = per_person.entry(person).or_default();
        totals.hours += hours;
        if is_truthy(entry, "billable") {
            totals.billable_hours += hours;
        }
        totals.entries += 1;
    }

    let mut people: Vec<(u64, PersonHours)> = per_person.into_iter().collect();
    // Busiest first; BTreeMap order breaks ties by people_id
    people.sort_by(|a, b| b.1.hours.total_cmp(&a.1.hours));

    let total_hours: f64 = people.iter().map(|(_, p)| p.hours).sum();
    let billable_hours: f64 = people.iter().map(|(_, p)| p.billable_hours).sum();
    let summary: Vec<Value> = people
        .into_iter()
        .map(|(people_id, p)| {
            json!({
                "people_id": people_id,
                "hours": p.hours,
                "billable_hours": p.billable_hours,
                "non_billable_hours": p.hours - p.billable_hours,
                "entries": p.entries,
            })
        })
        .collect();

    Ok(json!({
        "people": summary,
        "totals": {
            "hours": total_hours,
            "billable_hours": billable_hours,
            "entries": entries.len(),
        }
    }))
}

// =============================================================================
// Time off
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum TimeOffRequest {
    ListByPerson {
        people_id: u64,
        #[serde(flatten)]
        query: ListQuery,
    },
    ListUpcoming {
        days: Option<u32>,
        #[serde(flatten)]
        query: ListQuery,
    },
    BulkCreate {
        items: Vec<Value>,
    },
}

fn time_off(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::TimeOff.spec();
        let format = call.format;

        match call.parse::<TimeOffRequest>()? {
            TimeOffRequest::ListByPerson { people_id, query } => gateway
                .list(spec, &query.filter("people_id", people_id), format)
                .await
                .map(Value::Array),
            TimeOffRequest::ListUpcoming { days, query } => {
                let (today, until) = upcoming_window(gateway.today(), days)?;
                let query = date_range(query, today, until)?;
                let records = gateway.list(spec, &query, format).await?;
                Ok(Value::Array(upcoming_only(
                    records,
                    today,
                    &["end_date", "start_date"],
                    &["start_date", "end_date"],
                )))
            }
            TimeOffRequest::BulkCreate { items } => bulk_create(gateway, spec, items, format).await,
        }
    })
}

// =============================================================================
// Holidays
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum PublicHolidaysRequest {
    /// Holidays of one calendar year, default the current one
    ListForYear {
        year: Option<i32>,
        #[serde(flatten)]
        query: ListQuery,
    },
}

fn public_holidays(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::PublicHolidays.spec();
        let PublicHolidaysRequest::ListForYear { year, query } = call.parse()?;

        let (start, end) = year_window(gateway.today(), year)?;
        let query = date_range(query, start, end)?;
        let mut records = gateway.list(spec, &query, call.format).await?;
        sort_by_date(&mut records, &["date", "start_date"]);
        Ok(Value::Array(records))
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
enum TeamHolidaysRequest {
    ListUpcoming {
        days: Option<u32>,
        #[serde(flatten)]
        query: ListQuery,
    },
}

fn team_holidays(gateway: &Gateway, call: Call) -> HandlerFuture<'_> {
    Box::pin(async move {
        let spec = ResourceFamily::TeamHolidays.spec();
        let TeamHolidaysRequest::ListUpcoming { days, query } = call.parse()?;

        let (today, until) = upcoming_window(gateway.today(), days)?;
        let query = date_range(query, today, until)?;
        let records = gateway.list(spec, &query, call.format).await?;
        Ok(Value::Array(upcoming_only(
            records,
            today,
            &["end_date", "date", "start_date"],
            &["date", "start_date"],
        )))
    })
}
