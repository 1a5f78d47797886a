//! Flow graph construction
//!
//! Converts the weighted dimension tuples returned by the store into the
//! layered graph consumed by the sankey renderer.
//!
//! # Ordering rules
//!
//! - **Nodes** appear in first-encounter order, scanning rows in the order
//!   received and each row left to right.
//! - **Links** join adjacent dimensions of a row. Rows sharing the same
//!   `(source, target)` pair accumulate into one link. Links are sorted by
//!   accumulated weight, descending; equal weights keep first-encounter order.
//!
//! An `"Other"` value is labelled `"Other <dimension>"` so that the catch-all
//! buckets of different layers stay distinct nodes. Any other value is used
//! verbatim.

use crate::error::{Error, Result};
use crate::query::column::{QueryColumn, OTHER};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One row returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyRow {
    /// Normalized rate, in bits per second
    pub bps: f64,
    /// One value per requested dimension, possibly `"Other"`
    pub dimensions: Vec<String>,
}

impl SankeyRow {
    /// Convenience constructor
    pub fn new<S: Into<String>>(bps: f64, dimensions: impl IntoIterator<Item = S>) -> Self {
        Self {
            bps,
            dimensions: dimensions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Aggregated flow between two adjacent nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyLink {
    /// Source node label
    pub source: String,
    /// Target node label
    pub target: String,
    /// Accumulated rate
    pub bps: f64,
}

/// Graph and raw data handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SankeyGraph {
    /// Dimension tuples, in store order
    pub rows: Vec<Vec<String>>,
    /// Rates, same indexing as `rows`
    pub bps: Vec<f64>,
    /// Distinct node labels, in first-encounter order
    pub nodes: Vec<String>,
    /// Links sorted by rate, descending
    pub links: Vec<SankeyLink>,
}

/// Label of the node for `value` at the layer of `column`
pub fn node_label(column: QueryColumn, value: &str) -> String {
    if value == OTHER {
        format!("{} {}", OTHER, column)
    } else {
        value.to_string()
    }
}

/// Insertion-ordered set of node labels
#[derive(Debug, Default)]
struct NodeSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl NodeSet {
    fn insert(&mut self, label: &str) {
        if !self.seen.contains(label) {
            self.seen.insert(label.to_string());
            self.order.push(label.to_string());
        }
    }
}

/// Link weights keyed by `(source, target)`
///
/// `links` holds entries in first-encounter order; `index` maps a key to its
/// slot so repeated pairs accumulate in place.
#[derive(Debug, Default)]
struct LinkAccumulator {
    links: Vec<SankeyLink>,
    index: HashMap<(String, String), usize>,
}

impl LinkAccumulator {
    fn add(&mut self, source: String, target: String, bps: f64) {
        let key = (source, target);
        match self.index.get(&key) {
            Some(&slot) => self.links[slot].bps += bps,
            None => {
                self.index.insert(key.clone(), self.links.len());
                self.links.push(SankeyLink {
                    source: key.0,
                    target: key.1,
                    bps,
                });
            },
        }
    }

    fn into_sorted(mut self) -> Vec<SankeyLink> {
        // sort_by is stable: equal weights keep first-encounter order
        self.links.sort_by(|a, b| b.bps.total_cmp(&a.bps));
        self.links
    }
}

fn check_row(index: usize, row: &SankeyRow, width: usize) -> Result<()> {
    if row.dimensions.len() != width {
        return Err(Error::MalformedRow {
            index,
            reason: format!(
                "expected {} dimension values, got {}",
                width,
                row.dimensions.len()
            ),
        });
    }
    if !row.bps.is_finite() || row.bps < 0.0 {
        return Err(Error::MalformedRow {
            index,
            reason: format!("weight must be a non-negative number, got {}", row.bps),
        });
    }
    Ok(())
}

/// Build the flow graph for `rows` grouped by `dimensions`
///
/// Rows must already be ordered by weight, descending; that order is kept
/// for `rows`/`bps` and drives node discovery. The whole batch is rejected
/// if any row has the wrong width or a negative weight.
pub fn build_graph(dimensions: &[QueryColumn], mut rows: Vec<SankeyRow>) -> Result<SankeyGraph> {
    for (index, row) in rows.iter_mut().enumerate() {
        check_row(index, row, dimensions.len())?;
        // -0.0 passes the sign check but sorts below 0.0 under total_cmp
        row.bps += 0.0;
    }

    let mut nodes = NodeSet::default();
    let mut links = LinkAccumulator::default();

    for row in &rows {
        let labels: Vec<String> = dimensions
            .iter()
            .zip(&row.dimensions)
            .map(|(column, value)| node_label(*column, value))
            .collect();

        for label in &labels {
            nodes.insert(label);
        }
        for pair in labels.windows(2) {
            links.add(pair[0].clone(), pair[1].clone(), row.bps);
        }
    }

    let (rows, bps): (Vec<Vec<String>>, Vec<f64>) = rows
        .into_iter()
        .map(|r| (r.dimensions, r.bps))
        .unzip();

    Ok(SankeyGraph {
        rows,
        bps,
        nodes: nodes.order,
        links: links.into_sorted(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: [QueryColumn; 3] = [
        QueryColumn::SrcAS,
        QueryColumn::InIfProvider,
        QueryColumn::ExporterName,
    ];

    #[test]
    fn test_other_label_includes_dimension() {
        assert_eq!(
            node_label(QueryColumn::InIfProvider, "Other"),
            "Other InIfProvider"
        );
        assert_eq!(node_label(QueryColumn::SrcAS, "AS100"), "AS100");
        // only the exact literal is rewritten
        assert_eq!(node_label(QueryColumn::SrcAS, "other"), "other");
    }

    #[test]
    fn test_other_at_different_positions_stays_distinct() {
        let rows = vec![
            SankeyRow::new(10.0, ["Other", "p1", "r1"]),
            SankeyRow::new(5.0, ["AS1", "Other", "r1"]),
        ];
        let graph = build_graph(&DIMS, rows).unwrap();
        assert_eq!(
            graph.nodes,
            vec!["Other SrcAS", "p1", "r1", "AS1", "Other InIfProvider"]
        );
    }

    #[test]
    fn test_links_accumulate() {
        let rows = vec![
            SankeyRow::new(10.0, ["AS1", "p1", "r1"]),
            SankeyRow::new(7.0, ["AS2", "p1", "r1"]),
        ];
        let graph = build_graph(&DIMS, rows).unwrap();
        assert_eq!(graph.links.len(), 3);
        assert_eq!(graph.links[0].source, "p1");
        assert_eq!(graph.links[0].target, "r1");
        assert_eq!(graph.links[0].bps, 17.0);
    }

    #[test]
    fn test_equal_weights_keep_first_encounter_order() {
        let rows = vec![SankeyRow::new(3.0, ["AS1", "p1", "r1"])];
        let graph = build_graph(&DIMS, rows).unwrap();
        let pairs: Vec<(&str, &str)> = graph
            .links
            .iter()
            .map(|l| (l.source.as_str(), l.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("AS1", "p1"), ("p1", "r1")]);
    }

    #[test]
    fn test_empty_result() {
        let graph = build_graph(&DIMS, Vec::new()).unwrap();
        assert_eq!(graph, SankeyGraph::default());
    }

    #[test]
    fn test_width_mismatch_rejects_batch() {
        let rows = vec![
            SankeyRow::new(10.0, ["AS1", "p1", "r1"]),
            SankeyRow::new(5.0, ["AS1", "p1"]),
        ];
        let err = build_graph(&DIMS, rows).unwrap_err();
        assert!(matches!(err, Error::MalformedRow { index: 1, .. }));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let rows = vec![SankeyRow::new(-1.0, ["AS1", "p1", "r1"])];
        assert!(matches!(
            build_graph(&DIMS, rows),
            Err(Error::MalformedRow { index: 0, .. })
        ));
    }

    #[test]
    fn test_nan_weight_rejected() {
        let rows = vec![SankeyRow::new(f64::NAN, ["AS1", "p1", "r1"])];
        assert!(build_graph(&DIMS, rows).is_err());
    }

    #[test]
    fn test_zero_weight_accepted() {
        let rows = vec![SankeyRow::new(0.0, ["AS1", "p1", "r1"])];
        let graph = build_graph(&DIMS, rows).unwrap();
        assert_eq!(graph.links.len(), 2);
        assert!(graph.links.iter().all(|l| l.bps == 0.0));
    }

    #[test]
    fn test_negative_zero_ties_with_zero() {
        let rows = vec![
            SankeyRow::new(-0.0, ["AS1", "r1"]),
            SankeyRow::new(0.0, ["AS2", "r2"]),
        ];
        let graph = build_graph(&DIMS[..2], rows).unwrap();

        assert_eq!(graph.links[0].source, "AS1");
        assert_eq!(graph.links[1].source, "AS2");
        assert!(graph.links.iter().all(|l| l.bps.is_sign_positive()));
        assert!(graph.bps.iter().all(|bps| bps.is_sign_positive()));
        assert_eq!(
            serde_json::to_string(&graph.bps).unwrap(),
            "[0.0,0.0]"
        );
    }

    #[test]
    fn test_serialized_shape() {
        let rows = vec![SankeyRow::new(1.0, ["AS1", "Other"])];
        let graph = build_graph(&DIMS[..2], rows).unwrap();
        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "rows": [["AS1", "Other"]],
                "bps": [1.0],
                "nodes": ["AS1", "Other InIfProvider"],
                "links": [{"source": "AS1", "target": "Other InIfProvider", "bps": 1.0}]
            })
        );
    }
}
