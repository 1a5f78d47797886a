//! Sankey query generation
//!
//! Turns a [`SankeyQuery`] into a single ClickHouse query that:
//!
//! 1. measures the observed time span of the filtered window (`range`),
//! 2. ranks raw dimension tuples by volume and keeps the top `limit` (`rows`),
//! 3. re-aggregates the filtered window, replacing every dimension value not
//!    present in `rows` with `'Other'`,
//! 4. orders the buckets by normalized rate, descending.
//!
//! The `{table}` and `{timefilter}` placeholders are left untouched; they are
//! resolved by the store layer (see [`crate::store::template`]).

use crate::error::{Error, Result};
use crate::query::column::QueryColumn;
use crate::query::filter::QueryFilter;
use crate::types::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the flows table
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Placeholder substituted with the time-window predicate
pub const TIME_FILTER_PLACEHOLDER: &str = "{timefilter}";

/// Flow timestamp column, shared by the span metric and `{timefilter}`
pub const TIME_COLUMN: &str = "TimeReceived";

/// Minimum number of dimensions (a graph needs one adjacency)
pub const MIN_DIMENSIONS: usize = 2;

/// Sankey request as received on the wire
///
/// ```json
/// {
///   "start": "2022-04-10T15:45:10Z",
///   "end": "2022-04-11T15:45:10Z",
///   "dimensions": ["SrcAS", "InIfProvider", "ExporterName"],
///   "limit": 10,
///   "filter": "DstCountry = 'FR'"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SankeyRequest {
    /// Start of the window (RFC 3339)
    pub start: DateTime<Utc>,
    /// End of the window (RFC 3339)
    pub end: DateTime<Utc>,
    /// Dimension identifiers, in graph layer order
    pub dimensions: Vec<String>,
    /// Number of top tuples to keep
    ///
    /// Signed so that non-positive values are reported as invalid requests
    /// rather than decode failures.
    pub limit: i64,
    /// Raw filter predicate; empty means no filter
    #[serde(default)]
    pub filter: QueryFilter,
}

/// Validated sankey request descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct SankeyQuery {
    range: TimeRange,
    dimensions: Vec<QueryColumn>,
    limit: u64,
    filter: QueryFilter,
}

/// Query text together with the dimensions it selects
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    /// Query text with `{table}`/`{timefilter}` placeholders
    pub sql: String,
    /// Dimensions in the order they appear in the `dimensions` array
    pub dimensions: Vec<QueryColumn>,
}

impl SankeyQuery {
    /// Create a validated descriptor
    ///
    /// Rejects fewer than two dimensions and a zero limit.
    pub fn new(
        range: TimeRange,
        dimensions: Vec<QueryColumn>,
        limit: u64,
        filter: QueryFilter,
    ) -> Result<Self> {
        if dimensions.len() < MIN_DIMENSIONS {
            return Err(Error::invalid(format!(
                "at least {} dimensions are required, got {}",
                MIN_DIMENSIONS,
                dimensions.len()
            )));
        }
        if limit == 0 {
            return Err(Error::invalid("limit must be at least 1"));
        }
        Ok(Self {
            range,
            dimensions,
            limit,
            filter,
        })
    }

    /// Time window
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Requested dimensions, in layer order
    pub fn dimensions(&self) -> &[QueryColumn] {
        &self.dimensions
    }

    /// Number of top tuples kept
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Filter predicate
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    /// Render the query text
    pub fn to_sql(&self) -> RenderedQuery {
        let table = TABLE_PLACEHOLDER;
        let timefilter = TIME_FILTER_PLACEHOLDER;
        let time = TIME_COLUMN;
        let filter = self.filter.where_suffix();
        let limit = self.limit;

        let fields = self
            .dimensions
            .iter()
            .map(|c| c.select_raw())
            .collect::<Vec<_>>()
            .join(", ");
        let buckets = self
            .dimensions
            .iter()
            .map(|c| c.bucket_expression())
            .collect::<Vec<_>>()
            .join(",\n  ");

        let sql = format!(
            "
WITH
 (SELECT MAX({time}) - MIN({time}) FROM {table} WHERE {timefilter}{filter}) AS range,
 rows AS (SELECT {fields} FROM {table} WHERE {timefilter}{filter} GROUP BY {fields} ORDER BY SUM(Bytes) DESC LIMIT {limit})
SELECT
 SUM(Bytes*SamplingRate*8/range) AS bps,
 [{buckets}] AS dimensions
FROM {table}
WHERE {timefilter}{filter}
GROUP BY dimensions
ORDER BY bps DESC"
        );

        RenderedQuery {
            sql,
            dimensions: self.dimensions.clone(),
        }
    }
}

impl TryFrom<SankeyRequest> for SankeyQuery {
    type Error = Error;

    fn try_from(request: SankeyRequest) -> Result<Self> {
        let range = TimeRange::new(request.start, request.end)?;
        if request.limit <= 0 {
            return Err(Error::invalid(format!(
                "limit must be a positive integer, got {}",
                request.limit
            )));
        }
        let dimensions = request
            .dimensions
            .iter()
            .map(|d| d.parse::<QueryColumn>())
            .collect::<Result<Vec<_>>>()?;
        SankeyQuery::new(range, dimensions, request.limit as u64, request.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2022, 4, 10, 15, 45, 10).unwrap(),
            Utc.with_ymd_and_hms(2022, 4, 11, 15, 45, 10).unwrap(),
        )
        .unwrap()
    }

    fn assert_same_lines(got: &str, expected: &str) {
        let got: Vec<&str> = got.split('\n').collect();
        let expected: Vec<&str> = expected.split('\n').collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_two_dimensions_no_filter() {
        let query = SankeyQuery::new(
            window(),
            vec![QueryColumn::SrcAS, QueryColumn::ExporterName],
            5,
            QueryFilter::none(),
        )
        .unwrap();

        let expected = "
WITH
 (SELECT MAX(TimeReceived) - MIN(TimeReceived) FROM {table} WHERE {timefilter}) AS range,
 rows AS (SELECT SrcAS, ExporterName FROM {table} WHERE {timefilter} GROUP BY SrcAS, ExporterName ORDER BY SUM(Bytes) DESC LIMIT 5)
SELECT
 SUM(Bytes*SamplingRate*8/range) AS bps,
 [if(SrcAS IN (SELECT SrcAS FROM rows), concat(toString(SrcAS), ': ', dictGetOrDefault('asns', 'name', SrcAS, '???')), 'Other'),
  if(ExporterName IN (SELECT ExporterName FROM rows), ExporterName, 'Other')] AS dimensions
FROM {table}
WHERE {timefilter}
GROUP BY dimensions
ORDER BY bps DESC";

        let rendered = query.to_sql();
        assert_same_lines(&rendered.sql, expected);
        assert!(!rendered.sql.contains("AND ("));
        assert_eq!(
            rendered.dimensions,
            vec![QueryColumn::SrcAS, QueryColumn::ExporterName]
        );
    }

    #[test]
    fn test_two_dimensions_with_filter() {
        let query = SankeyQuery::new(
            window(),
            vec![QueryColumn::SrcAS, QueryColumn::ExporterName],
            10,
            QueryFilter::new("DstCountry = 'FR'"),
        )
        .unwrap();

        let expected = "
WITH
 (SELECT MAX(TimeReceived) - MIN(TimeReceived) FROM {table} WHERE {timefilter} AND (DstCountry = 'FR')) AS range,
 rows AS (SELECT SrcAS, ExporterName FROM {table} WHERE {timefilter} AND (DstCountry = 'FR') GROUP BY SrcAS, ExporterName ORDER BY SUM(Bytes) DESC LIMIT 10)
SELECT
 SUM(Bytes*SamplingRate*8/range) AS bps,
 [if(SrcAS IN (SELECT SrcAS FROM rows), concat(toString(SrcAS), ': ', dictGetOrDefault('asns', 'name', SrcAS, '???')), 'Other'),
  if(ExporterName IN (SELECT ExporterName FROM rows), ExporterName, 'Other')] AS dimensions
FROM {table}
WHERE {timefilter} AND (DstCountry = 'FR')
GROUP BY dimensions
ORDER BY bps DESC";

        assert_same_lines(&query.to_sql().sql, expected);
    }

    #[test]
    fn test_bucket_count_matches_dimensions() {
        let dimensions = vec![
            QueryColumn::ExporterGroup,
            QueryColumn::InIfProvider,
            QueryColumn::DstAS,
            QueryColumn::OutIfConnectivity,
        ];
        let query =
            SankeyQuery::new(window(), dimensions.clone(), 3, QueryFilter::none()).unwrap();
        let sql = query.to_sql().sql;

        assert_eq!(sql.matches("FROM rows)").count(), dimensions.len());
        let mut last = 0;
        for column in &dimensions {
            let needle = format!("if({} IN", column);
            let pos = sql.find(&needle).expect("bucket expression present");
            assert!(pos > last, "{} out of order", column);
            last = pos;
        }
    }

    #[test]
    fn test_filter_applies_to_every_where_clause() {
        let query = SankeyQuery::new(
            window(),
            vec![QueryColumn::InIfName, QueryColumn::OutIfName],
            1,
            QueryFilter::new("Proto = 6"),
        )
        .unwrap();
        let sql = query.to_sql().sql;
        assert_eq!(sql.matches("WHERE {timefilter} AND (Proto = 6)").count(), 3);
        assert_eq!(sql.matches("WHERE").count(), 3);
    }

    #[test]
    fn test_single_dimension_rejected() {
        let result = SankeyQuery::new(
            window(),
            vec![QueryColumn::SrcAS],
            10,
            QueryFilter::none(),
        );
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let result = SankeyQuery::new(
            window(),
            vec![QueryColumn::SrcAS, QueryColumn::DstAS],
            0,
            QueryFilter::none(),
        );
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_request_conversion() {
        let request: SankeyRequest = serde_json::from_value(serde_json::json!({
            "start": "2022-04-10T15:45:10Z",
            "end": "2022-04-11T15:45:10Z",
            "dimensions": ["SrcAS", "InIfProvider", "ExporterName"],
            "limit": 10,
            "filter": "DstCountry = 'FR'"
        }))
        .unwrap();
        let query = SankeyQuery::try_from(request).unwrap();

        assert_eq!(query.range(), window());
        assert_eq!(
            query.dimensions(),
            &[
                QueryColumn::SrcAS,
                QueryColumn::InIfProvider,
                QueryColumn::ExporterName
            ]
        );
        assert_eq!(query.limit(), 10);
        assert_eq!(query.filter().as_str(), Some("DstCountry = 'FR'"));
    }

    #[test]
    fn test_request_without_filter_field() {
        let request: SankeyRequest = serde_json::from_value(serde_json::json!({
            "start": "2022-04-10T15:45:10Z",
            "end": "2022-04-11T15:45:10Z",
            "dimensions": ["SrcAS", "ExporterName"],
            "limit": 5
        }))
        .unwrap();
        let query = SankeyQuery::try_from(request).unwrap();
        assert!(query.filter().is_empty());
    }

    #[test]
    fn test_request_rejections() {
        let base = SankeyRequest {
            start: window().start,
            end: window().end,
            dimensions: vec!["SrcAS".into(), "ExporterName".into()],
            limit: 10,
            filter: QueryFilter::none(),
        };

        let mut negative = base.clone();
        negative.limit = -1;
        assert!(matches!(
            SankeyQuery::try_from(negative),
            Err(Error::InvalidRequest(_))
        ));

        let mut reversed = base.clone();
        std::mem::swap(&mut reversed.start, &mut reversed.end);
        assert!(matches!(
            SankeyQuery::try_from(reversed),
            Err(Error::InvalidRequest(_))
        ));

        let mut unknown = base;
        unknown.dimensions.push("Nexthop".into());
        assert!(matches!(
            SankeyQuery::try_from(unknown),
            Err(Error::UnknownDimension(ref d)) if d == "Nexthop"
        ));
    }
}
