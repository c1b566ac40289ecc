//! Handler input and parameter helpers.

use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::resources::ResourceFamily;
use crate::domain::types::{ListQuery, ResponseFormat};
use chrono::{Datelike, Days, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Look-ahead used by `list-upcoming` when the caller gives no `days`
pub const DEFAULT_UPCOMING_DAYS: u32 = 30;
pub const MAX_UPCOMING_DAYS: u32 = 366;

/// One routed operation as seen by a handler
#[derive(Debug, Clone)]
pub struct Call {
    pub family: ResourceFamily,
    pub operation: String,
    /// Caller parameters with `operation` inserted as the enum tag
    pub params: Value,
    pub format: ResponseFormat,
}

impl Call {
    /// Deserialize the parameters into a family's typed request
    pub fn parse<T: DeserializeOwned>(&self) -> GatewayResult<T> {
        serde_json::from_value(self.params.clone()).map_err(|e| {
            GatewayError::validation(format!(
                "invalid parameters for {}/{}: {}",
                self.family, self.operation, e
            ))
        })
    }
}

/// Create/update payloads must be JSON objects
pub fn require_object(data: Value) -> GatewayResult<Value> {
    match data {
        Value::Object(_) => Ok(data),
        other => Err(GatewayError::validation(format!(
            "data must be a JSON object, got {}",
            other
        ))),
    }
}

/// Add an inclusive `start_date`/`end_date` window to a query
pub fn date_range(query: ListQuery, start: NaiveDate, end: NaiveDate) -> GatewayResult<ListQuery> {
    if start > end {
        return Err(GatewayError::validation(format!(
            "start_date {} is after end_date {}",
            start, end
        )));
    }
    Ok(query
        .filter("start_date", start.to_string())
        .filter("end_date", end.to_string()))
}

/// Window from `today` to `today + days`
pub fn upcoming_window(today: NaiveDate, days: Option<u32>) -> GatewayResult<(NaiveDate, NaiveDate)> {
    let days = days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    if days == 0 || days > MAX_UPCOMING_DAYS {
        return Err(GatewayError::validation(format!(
            "days must be between 1 and {}",
            MAX_UPCOMING_DAYS
        )));
    }
    let end = today
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| GatewayError::validation("date window out of range"))?;
    Ok((today, end))
}

/// First and last day of a calendar year; defaults to the year of `today`
pub fn year_window(today: NaiveDate, year: Option<i32>) -> GatewayResult<(NaiveDate, NaiveDate)> {
    let year = year.unwrap_or_else(|| today.year());
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(GatewayError::validation(format!("invalid year {}", year))),
    }
}
