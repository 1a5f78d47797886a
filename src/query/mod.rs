//! Query generation for flow graphs
//!
//! ```text
//! SankeyRequest (wire)
//!      │  TryFrom: resolve dimensions, validate window and limit
//!      ▼
//! SankeyQuery
//!      │  to_sql()
//!      ▼
//! RenderedQuery { sql with {table}/{timefilter}, dimensions }
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use kuba_sankey::query::{QueryColumn, QueryFilter, SankeyQuery};
//! use kuba_sankey::types::TimeRange;
//!
//! let range = TimeRange::new(
//!     Utc.with_ymd_and_hms(2022, 4, 10, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2022, 4, 11, 0, 0, 0).unwrap(),
//! )
//! .unwrap();
//! let query = SankeyQuery::new(
//!     range,
//!     vec![QueryColumn::SrcAS, QueryColumn::ExporterName],
//!     5,
//!     QueryFilter::none(),
//! )
//! .unwrap();
//! assert!(query.to_sql().sql.contains("LIMIT 5"));
//! ```

pub mod column;
pub mod filter;
pub mod sankey;

pub use column::{ColumnKind, QueryColumn, DICTIONARY_FALLBACK, OTHER};
pub use filter::QueryFilter;
pub use sankey::{
    RenderedQuery, SankeyQuery, SankeyRequest, MIN_DIMENSIONS, TABLE_PLACEHOLDER, TIME_COLUMN,
    TIME_FILTER_PLACEHOLDER,
};
