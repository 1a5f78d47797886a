//! Placeholder resolution for generated queries

use crate::query::{TABLE_PLACEHOLDER, TIME_COLUMN, TIME_FILTER_PLACEHOLDER};
use crate::types::TimeRange;
use chrono::{DateTime, Duration, SubsecRound, Utc};

const CLICKHOUSE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Substitutes `{table}` and `{timefilter}` in query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    table: String,
}

impl QueryTemplate {
    /// Create a template for `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Table name substituted for `{table}`
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Half-open predicate selecting `range`
    ///
    /// `DateTime` columns have second precision, so the window is widened to
    /// whole seconds: the start is floored and the end is ceiled.
    pub fn time_filter(&self, range: &TimeRange) -> String {
        format!(
            "{col} >= {start} AND {col} < {end}",
            col = TIME_COLUMN,
            start = to_datetime(range.start.trunc_subsecs(0)),
            end = to_datetime(ceil_seconds(range.end)),
        )
    }

    /// Resolve both placeholders in `sql`
    pub fn resolve(&self, sql: &str, range: &TimeRange) -> String {
        sql.replace(TIME_FILTER_PLACEHOLDER, &self.time_filter(range))
            .replace(TABLE_PLACEHOLDER, &self.table)
    }
}

fn ceil_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    let floored = instant.trunc_subsecs(0);
    if floored == instant {
        return instant;
    }
    floored
        .checked_add_signed(Duration::seconds(1))
        .unwrap_or(instant)
}

fn to_datetime(instant: DateTime<Utc>) -> String {
    format!(
        "toDateTime('{}', 'UTC')",
        instant.format(CLICKHOUSE_DATETIME)
    )
}
