//! Flow store integration
//!
//! The sankey engine never talks to a database directly. Generated queries
//! are handed to a [`FlowStore`], which resolves the `{table}` and
//! `{timefilter}` placeholders, runs the query and returns fully
//! materialized rows in the store's order (weight-descending).

pub mod clickhouse;
pub mod template;

use crate::error::StoreError;
use crate::graph::SankeyRow;
use crate::types::TimeRange;
use async_trait::async_trait;

pub use clickhouse::ClickHouseStore;
pub use template::QueryTemplate;

/// Executes sankey queries against a columnar flow store
#[async_trait]
pub trait FlowStore: Send + Sync + 'static {
    /// Identifier used in logs
    fn store_id(&self) -> &str;

    /// Run `sql` over `range` and return its rows
    ///
    /// `sql` still contains the `{table}`/`{timefilter}` placeholders.
    /// Failures are returned as-is; callers do not retry.
    async fn select_sankey(
        &self,
        sql: &str,
        range: TimeRange,
    ) -> Result<Vec<SankeyRow>, StoreError>;
}
