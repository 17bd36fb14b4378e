//! Dispatch of free-form questions to a pipeline stage.
//!
//! The classifier is a seam: the keyword classifier is deterministic, and a
//! model-backed one can be plugged in behind `IntentClassifier`. Whatever
//! classifies, the dispatch table below is fixed.

use crate::pipeline::{until_cancelled, Pipeline, PipelineError};
use crate::store::LogStore;
use crate::timerange::find_time_phrase;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;

pub const HELP_TEXT: &str = "I can check logs for issues, list recent logs, search for a pattern \
(e.g. search \"timeout\" in the last 30 minutes) and suggest fixes for detected problems. \
Mention a window such as \"last 2 hours\".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Full analysis report.
    Report,
    /// Report restricted to lines matching a pattern.
    Search { pattern: String },
    /// Raw listing of recent lines.
    Logs,
    /// Root cause and remediation.
    Solution,
    Unknown,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> anyhow::Result<Intent>;
}

static RE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|`([^`]+)`|(?:^|\s)'([^']+)'"#).unwrap());

const SEARCH_WORDS: &[&str] = &["search", "find", "matching", "containing", "grep", "pattern"];
const SOLUTION_WORDS: &[&str] = &["solution", "fix", "resolve", "remediat", "root cause", "how do i"];
const LOGS_WORDS: &[&str] = &["show logs", "list logs", "fetch logs", "get logs", "raw logs", "retrieve"];
const REPORT_WORDS: &[&str] = &[
    "issue", "problem", "anomal", "error", "health", "check", "analy", "wrong", "fail", "status",
    "report", "logs",
];

fn quoted_term(query: &str) -> Option<String> {
    let caps = RE_QUOTED.captures(query)?;
    (1..=3)
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Keyword rules, checked search → solution → logs → report.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn detect(query: &str) -> Intent {
        let q = query.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| q.contains(w));
        if has(SEARCH_WORDS) {
            if let Some(pattern) = quoted_term(query) {
                return Intent::Search { pattern };
            }
        }
        if has(SOLUTION_WORDS) {
            Intent::Solution
        } else if has(LOGS_WORDS) {
            Intent::Logs
        } else if has(REPORT_WORDS) {
            Intent::Report
        } else {
            Intent::Unknown
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, query: &str) -> anyhow::Result<Intent> {
        Ok(Self::detect(query))
    }
}

pub struct Router<S> {
    pipeline: Pipeline<S>,
    classifier: Box<dyn IntentClassifier>,
}

impl<S: LogStore> Router<S> {
    pub fn new(pipeline: Pipeline<S>) -> Self {
        Self::with_classifier(pipeline, Box::new(KeywordClassifier))
    }

    pub fn with_classifier(pipeline: Pipeline<S>, classifier: Box<dyn IntentClassifier>) -> Self {
        Self { pipeline, classifier }
    }

    pub fn pipeline(&self) -> &Pipeline<S> {
        &self.pipeline
    }

    /// Classifier failures fall back to the keyword rules.
    pub async fn intent(&self, query: &str) -> Intent {
        match self.classifier.classify(query).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(error = %e, "intent classifier failed, using keyword rules");
                KeywordClassifier::detect(query)
            }
        }
    }

    pub async fn route(&self, query: &str) -> String {
        let intent = self.intent(query).await;
        let time_range = find_time_phrase(query)
            .unwrap_or_else(|| self.pipeline.analysis_config().default_window.clone());
        tracing::info!(?intent, %time_range, "routing query");
        match intent {
            Intent::Report => self.pipeline.run_report(&time_range, None).await,
            Intent::Search { pattern } => self.pipeline.run_report(&time_range, Some(&pattern)).await,
            Intent::Logs => self.pipeline.log_summary(&time_range).await,
            Intent::Solution => self.pipeline.solution_report(&time_range, None).await,
            Intent::Unknown => HELP_TEXT.to_string(),
        }
    }

    pub async fn route_cancellable(&self, query: &str, cancel: &CancellationToken) -> Result<String, PipelineError> {
        until_cancelled(self.route(query), cancel).await
    }
}
