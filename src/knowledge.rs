use crate::solution::Solution;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub title: String,
    pub text: String,
}

/// Free-text lookup over troubleshooting documents.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<KnowledgeHit>>;
}

/// Related documents for a solution. Lookup failures and lookups that outlive
/// `timeout` are logged and yield nothing; actionless solutions are never looked up.
pub async fn enrich(
    kb: Option<&dyn KnowledgeBase>,
    solution: &Solution,
    top_k: usize,
    timeout: Duration,
) -> Vec<KnowledgeHit> {
    let Some(kb) = kb else { return Vec::new() };
    if !solution.is_actionable() {
        return Vec::new();
    }
    match tokio::time::timeout(timeout, kb.search(&solution.root_cause, top_k)).await {
        Ok(Ok(mut hits)) => {
            hits.truncate(top_k);
            hits
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "knowledge base lookup failed, skipping enrichment");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs_f64(), "knowledge base lookup timed out, skipping enrichment");
            Vec::new()
        }
    }
}
