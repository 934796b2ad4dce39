//! Fan-out and aggregation of backend responses.

use futures_util::future::join_all;
use serde_json::Value;

use crate::config::{AppConfig, BackendList, FanoutMode, ServiceIdentity};
use crate::fanout::client::{DownstreamClient, DownstreamResult};
use crate::fanout::AggregateError;
use crate::observability::tracing::TraceContext;

/// Builds the aggregate response for the configured path.
#[derive(Debug, Clone)]
pub struct Aggregator {
    identity: ServiceIdentity,
    backends: BackendList,
    mode: FanoutMode,
    client: DownstreamClient,
}

impl Aggregator {
    pub fn new(config: &AppConfig, client: DownstreamClient) -> Self {
        Self {
            identity: config.identity.clone(),
            backends: config.backends.clone(),
            mode: config.downstream.mode,
            client,
        }
    }

    pub fn backends(&self) -> &BackendList {
        &self.backends
    }

    /// Identity element followed by every backend's spliced result, in
    /// configured order.
    pub async fn aggregate(&self, trace: Option<&TraceContext>) -> Result<Vec<Value>, AggregateError> {
        let results = match self.mode {
            FanoutMode::Parallel => {
                join_all(self.backends.iter().map(|url| self.client.fetch(url, trace)))
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>, _>>()?
            }
            FanoutMode::Sequential => {
                let mut results = Vec::with_capacity(self.backends.len());
                for url in &self.backends {
                    results.push(self.client.fetch(url, trace).await?);
                }
                results
            }
        };

        Ok(assemble(&self.identity, results))
    }
}

/// Concatenate the identity and backend results.
pub fn assemble(identity: &ServiceIdentity, results: Vec<DownstreamResult>) -> Vec<Value> {
    let mut response = Vec::with_capacity(results.len() + 1);
    response.push(identity.to_value());
    for result in results {
        response.extend(result.into_elements());
    }
    response
}
