//! ClickHouse HTTP interface store
//!
//! Queries are POSTed to the HTTP interface with `FORMAT JSONEachRow`
//! appended, and each output line is decoded as a [`SankeyRow`]:
//!
//! ```text
//! {"bps":9677,"dimensions":["AS100","Other","router1"]}
//! ```

use super::template::QueryTemplate;
use super::FlowStore;
use crate::config::ClickHouseConfig;
use crate::error::StoreError;
use crate::graph::SankeyRow;
use crate::types::TimeRange;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// [`FlowStore`] backed by the ClickHouse HTTP interface
#[derive(Debug, Clone)]
pub struct ClickHouseStore {
    client: reqwest::Client,
    url: String,
    database: String,
    username: String,
    password: Option<String>,
    template: QueryTemplate,
}

impl ClickHouseStore {
    /// Build a store from configuration
    pub fn new(config: &ClickHouseConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            template: QueryTemplate::new(&config.table),
        })
    }
}

#[async_trait]
impl FlowStore for ClickHouseStore {
    fn store_id(&self) -> &str {
        "clickhouse"
    }

    async fn select_sankey(
        &self,
        sql: &str,
        range: TimeRange,
    ) -> Result<Vec<SankeyRow>, StoreError> {
        let query = format!("{}\nFORMAT JSONEachRow", self.template.resolve(sql, &range));

        let mut request = self
            .client
            .post(&self.url)
            .query(&[("database", self.database.as_str())])
            .header("X-ClickHouse-User", &self.username)
            .body(query);
        if let Some(password) = &self.password {
            request = request.header("X-ClickHouse-Key", password);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "ClickHouse rejected sankey query");
            return Err(StoreError::Query {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        let rows = parse_json_each_row(&body)?;
        debug!(rows = rows.len(), table = %self.template.table(), "ClickHouse query complete");
        Ok(rows)
    }
}

fn map_transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Connection(e.to_string())
    }
}

/// Decode a `JSONEachRow` body, skipping blank lines
pub(crate) fn parse_json_each_row(body: &str) -> Result<Vec<SankeyRow>, StoreError> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<SankeyRow>(line)
                .map_err(|e| StoreError::Decode(format!("line {}: {}", n + 1, e)))
        })
        .collect()
}
