//! Fetch → analyze → solve, with the per-invocation state machine.
//!
//! A `Pipeline` owns its store handle and read-only settings; invocations
//! share nothing mutable and can run concurrently on any number of tasks.

use crate::anomaly::{analyze, AnalysisError, AnomalyReport};
use crate::config::{AnalysisConfig, Settings};
use crate::knowledge::{enrich, KnowledgeBase, KnowledgeHit};
use crate::query::LogQuery;
use crate::report;
use crate::solution::{format_solution, map_root_cause, Solution};
use crate::store::{LogLine, LogStore, StoreError};
use crate::timerange::{parse_time_range, TimeWindow};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("analysis cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Fetching,
    Analyzing,
    Reported,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub window: TimeWindow,
    pub query: LogQuery,
    pub lines: Vec<LogLine>,
}

#[derive(Debug)]
pub enum Outcome {
    Reported {
        report: AnomalyReport,
        solution: Solution,
        related: Vec<KnowledgeHit>,
        text: String,
    },
    /// The store answered with zero lines; nothing was scored.
    NoLogs { window: TimeWindow, text: String },
    Failed { error: PipelineError, text: String },
}

impl Outcome {
    /// `NoLogs` counts as reported: the fetch succeeded and a report was produced.
    pub fn state(&self) -> PipelineState {
        match self {
            Outcome::Reported { .. } | Outcome::NoLogs { .. } => PipelineState::Reported,
            Outcome::Failed { .. } => PipelineState::Failed,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Outcome::Reported { text, .. } | Outcome::NoLogs { text, .. } | Outcome::Failed { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Outcome::Reported { text, .. } | Outcome::NoLogs { text, .. } | Outcome::Failed { text, .. } => text,
        }
    }
}

/// Drive `work` to completion unless `cancel` fires first, in which case
/// `work` is dropped along with any in-flight fetch.
pub async fn until_cancelled<F: Future>(work: F, cancel: &CancellationToken) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!("pipeline cancelled");
            Err(PipelineError::Cancelled)
        }
        out = work => Ok(out),
    }
}

pub struct Pipeline<S> {
    store: S,
    analysis: AnalysisConfig,
    fetch_timeout: Duration,
    limit: usize,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
}

impl<S: LogStore> Pipeline<S> {
    pub fn new(store: S, settings: &Settings) -> Self {
        Self {
            store,
            analysis: settings.analysis.clone(),
            fetch_timeout: settings.store.timeout(),
            limit: settings.store.limit,
            knowledge: None,
        }
    }

    pub fn with_knowledge(mut self, kb: Arc<dyn KnowledgeBase>) -> Self {
        self.knowledge = Some(kb);
        self
    }

    pub fn analysis_config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Resolve the window, build the query and fetch, bounded by the fetch timeout.
    pub async fn fetch(&self, time_range: &str, pattern: Option<&str>) -> Result<Fetched, PipelineError> {
        let window = parse_time_range(time_range);
        let query = LogQuery::build(window, pattern, self.limit);
        match tokio::time::timeout(self.fetch_timeout, self.store.query_range(&query)).await {
            Ok(Ok(lines)) => Ok(Fetched { window, query, lines }),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout(self.fetch_timeout).into()),
        }
    }

    pub fn analyze(&self, lines: &[LogLine]) -> Result<AnomalyReport, PipelineError> {
        Ok(analyze(lines, self.analysis.top_sources)?)
    }

    pub fn solve(&self, report: &AnomalyReport) -> Solution {
        let solution = map_root_cause(&report.pattern_counts, &report.top_sources);
        if solution.is_actionable() {
            solution.with_report_context(report)
        } else {
            solution
        }
    }

    pub async fn run(&self, time_range: &str, pattern: Option<&str>) -> Outcome {
        tracing::debug!(state = ?PipelineState::Fetching, %time_range, "pipeline");
        let fetched = match self.fetch(time_range, pattern).await {
            Ok(f) => f,
            Err(e) => return self.fail(e),
        };
        if fetched.lines.is_empty() {
            tracing::info!(%time_range, "no logs in window");
            return Outcome::NoLogs {
                window: fetched.window,
                text: report::render_no_logs(time_range, pattern),
            };
        }

        tracing::debug!(state = ?PipelineState::Analyzing, lines = fetched.lines.len(), "pipeline");
        let analysis = match self.analyze(&fetched.lines) {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        let solution = self.solve(&analysis);
        let related = enrich(
            self.knowledge.as_deref(),
            &solution,
            self.analysis.knowledge_hits,
            self.analysis.knowledge_timeout(),
        )
        .await;
        let text = report::render_report(time_range, pattern, &analysis, &solution, &related, &self.analysis);

        tracing::debug!(state = ?PipelineState::Reported, score = analysis.anomaly_score, "pipeline");
        Outcome::Reported { report: analysis, solution, related, text }
    }

    fn fail(&self, error: PipelineError) -> Outcome {
        let text = match &error {
            PipelineError::Store(e) => report::render_fetch_error(e),
            other => format!("failed to analyze logs: {}", other),
        };
        tracing::error!(state = ?PipelineState::Failed, error = %error, "pipeline");
        Outcome::Failed { error, text }
    }

    /// The combined report as text. Never fails; errors become messages.
    pub async fn run_report(&self, time_range: &str, pattern: Option<&str>) -> String {
        self.run(time_range, pattern).await.into_text()
    }

    /// Like `run`, but dropping the in-flight fetch when `cancel` fires.
    pub async fn run_cancellable(
        &self,
        time_range: &str,
        pattern: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PipelineError> {
        until_cancelled(self.run(time_range, pattern), cancel).await
    }

    /// `None` when cancelled; no partial report is produced.
    pub async fn run_report_cancellable(
        &self,
        time_range: &str,
        pattern: Option<&str>,
        cancel: &CancellationToken,
    ) -> Option<String> {
        self.run_cancellable(time_range, pattern, cancel).await.ok().map(Outcome::into_text)
    }

    pub async fn log_summary_cancellable(
        &self,
        time_range: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        until_cancelled(self.log_summary(time_range), cancel).await
    }

    /// Raw listing of the fetched lines, without analysis.
    pub async fn log_summary(&self, time_range: &str) -> String {
        match self.fetch(time_range, None).await {
            Ok(f) if f.lines.is_empty() => report::render_no_logs(time_range, None),
            Ok(f) => report::render_log_summary(time_range, &f.window, &f.lines),
            Err(PipelineError::Store(e)) => report::render_fetch_error(&e),
            Err(e) => e.to_string(),
        }
    }

    /// Root cause and remediation only.
    pub async fn solution_report(&self, time_range: &str, pattern: Option<&str>) -> String {
        match self.run(time_range, pattern).await {
            Outcome::Reported { solution, related, .. } => {
                let mut text = format_solution(&solution);
                if !related.is_empty() {
                    text.push_str("\n\n**Related Knowledge:**");
                    for hit in &related {
                        text.push_str(&format!("\n- {}: {}", hit.title, hit.text));
                    }
                }
                text
            }
            other => other.into_text(),
        }
    }
}
