//! Kuba Sankey - flow-graph queries for the network-traffic console
//!
//! This library provides:
//! - Top-N sankey query generation for the ClickHouse flows table, with
//!   `Other` bucketing of everything outside the top tuples
//! - Construction of the layered flow graph (nodes + aggregated links) from
//!   the weighted tuples the store returns
//! - A pluggable flow store, with a ClickHouse HTTP implementation
//! - An axum HTTP API serving `POST /api/v0/console/sankey`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod graph;
pub mod query;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Prometheus metrics
pub mod metrics;

/// Flow store abstraction and the ClickHouse implementation
pub mod store;

/// Request pipeline tying query generation, store and graph together
pub mod service;

/// HTTP router and handlers
pub mod api;

// Re-export main types
pub use error::{Error, Result, StoreError};
pub use graph::{build_graph, SankeyGraph, SankeyLink, SankeyRow};
pub use query::{QueryColumn, QueryFilter, SankeyQuery, SankeyRequest};
pub use service::SankeyService;
pub use types::TimeRange;
