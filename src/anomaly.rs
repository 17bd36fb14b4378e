use crate::patterns::{extract_patterns, PatternCounts};
use crate::sources::{rank_sources, unique_ips, SourceCount};
use crate::store::LogLine;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Scores above this flag an anomaly.
pub const ANOMALY_THRESHOLD: f64 = 10.0;

const ERROR_WEIGHT: f64 = 0.6;
const CRITICAL_WEIGHT: f64 = 0.4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("invariant violated: {errors} categorized errors out of {total_logs} logs")]
    InvariantViolation { total_logs: usize, errors: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score > 50.0 {
            Severity::Critical
        } else if score > 30.0 {
            Severity::High
        } else if score > ANOMALY_THRESHOLD {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn percent(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 * 100.0 / total as f64
    }
}

/// Two decimals, halves to even.
fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

pub fn error_rate(total_logs: usize, counts: &PatternCounts) -> f64 {
    percent(counts.total(), total_logs)
}

pub fn critical_rate(total_logs: usize, counts: &PatternCounts) -> f64 {
    percent(counts.critical_total(), total_logs)
}

/// Blend of overall and critical error rates, clamped to 100 and rounded
/// to two decimals, with its severity tier.
pub fn score(total_logs: usize, counts: &PatternCounts) -> Result<(f64, Severity), AnalysisError> {
    let errors = counts.total();
    if errors > total_logs {
        return Err(AnalysisError::InvariantViolation { total_logs, errors });
    }
    let raw = ERROR_WEIGHT * error_rate(total_logs, counts)
        + CRITICAL_WEIGHT * critical_rate(total_logs, counts);
    let s = round2(raw.min(100.0));
    Ok((s, Severity::from_score(s)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub total_logs: usize,
    pub pattern_counts: PatternCounts,
    pub total_errors: usize,
    pub error_rate: f64,
    pub critical_rate: f64,
    pub anomaly_score: f64,
    pub severity: Severity,
    pub unique_sources: usize,
    pub top_sources: Vec<SourceCount>,
    pub has_anomaly: bool,
}

impl AnomalyReport {
    /// Assemble a report from already-extracted parts.
    pub fn from_parts(
        total_logs: usize,
        pattern_counts: PatternCounts,
        unique_sources: usize,
        top_sources: Vec<SourceCount>,
    ) -> Result<Self, AnalysisError> {
        let (anomaly_score, severity) = score(total_logs, &pattern_counts)?;
        Ok(Self {
            total_logs,
            total_errors: pattern_counts.total(),
            error_rate: round2(error_rate(total_logs, &pattern_counts)),
            critical_rate: round2(critical_rate(total_logs, &pattern_counts)),
            pattern_counts,
            anomaly_score,
            severity,
            unique_sources,
            top_sources,
            has_anomaly: anomaly_score > ANOMALY_THRESHOLD,
        })
    }
}

/// Extract, score and rank in one pass over `lines`.
pub fn analyze(lines: &[LogLine], top_n: usize) -> Result<AnomalyReport, AnalysisError> {
    let counts = extract_patterns(lines);
    let ips = unique_ips(lines);
    let top = rank_sources(lines, top_n);
    let report = AnomalyReport::from_parts(lines.len(), counts, ips.len(), top)?;
    tracing::info!(
        total = report.total_logs,
        errors = report.total_errors,
        score = report.anomaly_score,
        severity = %report.severity,
        "anomaly detection complete"
    );
    Ok(report)
}
