//! Sankey request pipeline
//!
//! ```text
//! SankeyRequest ──prepare──▶ SankeyQuery ──to_sql──▶ RenderedQuery
//!                                                        │
//!                                   FlowStore::select_sankey
//!                                                        │
//!                                                        ▼
//!                           SankeyGraph ◀──build_graph── rows
//! ```
//!
//! Each call works on its own data; a single service can be shared across
//! concurrent requests.

use crate::config::SankeyConfig;
use crate::error::{Error, Result};
use crate::graph::{build_graph, SankeyGraph};
use crate::metrics;
use crate::query::{SankeyQuery, SankeyRequest};
use crate::store::FlowStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Validate a wire request into a query descriptor within `limits`
pub fn prepare(limits: &SankeyConfig, request: SankeyRequest) -> Result<SankeyQuery> {
    let query = SankeyQuery::try_from(request)?;

    if query.dimensions().len() > limits.max_dimensions {
        return Err(Error::invalid(format!(
            "at most {} dimensions are allowed, got {}",
            limits.max_dimensions,
            query.dimensions().len()
        )));
    }
    if query.limit() > limits.max_limit {
        return Err(Error::invalid(format!(
            "limit {} exceeds maximum {}",
            query.limit(),
            limits.max_limit
        )));
    }
    Ok(query)
}

/// Runs sankey requests against a flow store
#[derive(Clone)]
pub struct SankeyService {
    store: Arc<dyn FlowStore>,
    limits: SankeyConfig,
}

impl SankeyService {
    /// Create a service over `store` enforcing `limits`
    pub fn new(store: Arc<dyn FlowStore>, limits: SankeyConfig) -> Self {
        Self { store, limits }
    }

    /// Run a request end to end
    pub async fn execute(&self, request: SankeyRequest) -> Result<SankeyGraph> {
        let result = self.run(request).await;
        metrics::record_request(metrics::outcome_label(&result));
        result
    }

    async fn run(&self, request: SankeyRequest) -> Result<SankeyGraph> {
        let query = prepare(&self.limits, request).map_err(|e| {
            warn!(error = %e, "Rejected sankey request");
            e
        })?;

        let rendered = query.to_sql();
        debug!(sql = %rendered.sql, range = %query.range(), "Generated sankey query");

        let started = Instant::now();
        let rows = self
            .store
            .select_sankey(&rendered.sql, query.range())
            .await
            .map_err(|e| {
                error!(store = self.store.store_id(), error = %e, "Sankey query failed");
                Error::Store(e)
            })?;
        metrics::record_query_duration(started.elapsed());

        let graph = build_graph(&rendered.dimensions, rows).map_err(|e| {
            error!(error = %e, "Store returned inconsistent sankey rows");
            e
        })?;
        metrics::record_graph_links(graph.links.len());

        debug!(
            rows = graph.rows.len(),
            nodes = graph.nodes.len(),
            links = graph.links.len(),
            "Built sankey graph"
        );
        Ok(graph)
    }
}
