//! Plain-text (markdown) renderings of pipeline results.

use crate::anomaly::AnomalyReport;
use crate::config::AnalysisConfig;
use crate::knowledge::KnowledgeHit;
use crate::patterns::classify_levels;
use crate::solution::Solution;
use crate::store::{LogLine, StoreError};
use crate::timerange::TimeWindow;
use itertools::Itertools;

/// Lines shown by the log listing before it is cut short.
pub const LISTING_LIMIT: usize = 100;

pub const ANOMALY_BANNER: &str = "⚠️ **Anomalies detected!** Further investigation recommended.";
pub const STABLE_BANNER: &str = "✅ System appears stable.";

pub fn render_no_logs(time_range: &str, pattern: Option<&str>) -> String {
    match pattern {
        Some(p) => format!("No logs found for {} matching pattern '{}'", time_range, p),
        None => format!("No logs found for {}", time_range),
    }
}

pub fn render_fetch_error(err: &StoreError) -> String {
    format!("error fetching logs: {}", err)
}

/// The combined single-call report.
pub fn render_report(
    time_range: &str,
    pattern: Option<&str>,
    report: &AnomalyReport,
    solution: &Solution,
    related: &[KnowledgeHit],
    cfg: &AnalysisConfig,
) -> String {
    let mut out = vec![
        format!("### Log Analytics Report ({})", time_range),
        format!("- **Total Logs**: {}", report.total_logs),
        format!("- **Anomaly Score**: {:.2}%", report.anomaly_score),
        format!("- **Severity Level**: {}", report.severity),
        format!("- **Unique IPs**: {}", report.unique_sources),
    ];
    if let Some(p) = pattern {
        out.push(format!("- **Filter**: `{}`", p));
    }
    out.push(String::new());

    if report.pattern_counts.is_empty() {
        out.push("**No common error patterns detected.**".to_string());
    } else {
        out.push("**Error Patterns Detected:**".to_string());
        for (c, n) in report.pattern_counts.ranked().into_iter().take(cfg.report_patterns) {
            out.push(format!("- {}: {} occurrences", c.title(), n));
        }
    }

    if !report.top_sources.is_empty() {
        out.push(String::new());
        out.push("**Top Error Sources:**".to_string());
        for s in report.top_sources.iter().take(cfg.report_sources) {
            out.push(format!("- {}: {} errors", s.source, s.count));
        }
    }

    out.push(String::new());
    out.push(format!("**Root Cause:** {}", solution.root_cause));
    if solution.is_actionable() {
        out.push(String::new());
        out.push("**Recommended Actions:**".to_string());
        for (i, a) in solution.actions.iter().enumerate() {
            out.push(format!("{}. {}", i + 1, a));
        }
    }

    if !related.is_empty() {
        out.push(String::new());
        out.push("**Related Knowledge:**".to_string());
        for hit in related {
            out.push(format!("- {}", hit.title));
        }
    }

    out.push(String::new());
    out.push(if report.has_anomaly { ANOMALY_BANNER } else { STABLE_BANNER }.to_string());
    out.into_iter().join("\n")
}

/// Numbered lines, at most `LISTING_LIMIT` of them.
pub fn render_log_listing(lines: &[LogLine]) -> String {
    if lines.is_empty() {
        return "No logs found for the specified time range.".to_string();
    }
    let mut out = lines
        .iter()
        .take(LISTING_LIMIT)
        .enumerate()
        .map(|(i, l)| {
            let ts = l
                .timestamp_utc()
                .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
                .unwrap_or_else(|| l.timestamp.clone());
            format!("[{}] {}: {}", i + 1, ts, l.line)
        })
        .join("\n");
    if lines.len() > LISTING_LIMIT {
        out.push_str(&format!("\n\n... and {} more log entries", lines.len() - LISTING_LIMIT));
    }
    out
}

pub fn render_log_summary(time_range: &str, window: &TimeWindow, lines: &[LogLine]) -> String {
    let lv = classify_levels(lines);
    format!(
        "Log Summary for {}:\nTotal logs retrieved: {}\nTime range: {}\nLevels: CRITICAL {}, ERROR {}, WARNING {}, INFO {}, DEBUG {}\n\nLogs:\n{}",
        time_range,
        lines.len(),
        window,
        lv.critical,
        lv.error,
        lv.warning,
        lv.info,
        lv.debug,
        render_log_listing(lines)
    )
}

/// Analysis-only view without root cause.
pub fn render_analysis_summary(report: &AnomalyReport) -> String {
    let mut out = vec![
        "**Log Analysis Summary**".to_string(),
        String::new(),
        format!("Total Logs Analyzed: {}", report.total_logs),
        format!("Anomaly Score: {:.2}%", report.anomaly_score),
        format!("Severity: {}", report.severity),
        format!("Has Anomaly: {}", if report.has_anomaly { "Yes" } else { "No" }),
        String::new(),
    ];
    if !report.pattern_counts.is_empty() {
        out.push("**Error Patterns Detected:**".to_string());
        for (c, n) in report.pattern_counts.iter() {
            out.push(format!("  - {}: {}", c.title(), n));
        }
        out.push(String::new());
    }
    if !report.top_sources.is_empty() {
        out.push("**Top Error Sources:**".to_string());
        for s in &report.top_sources {
            out.push(format!("  - {}: {} occurrences", s.source, s.count));
        }
        out.push(String::new());
    }
    out.push(if report.has_anomaly { ANOMALY_BANNER } else { STABLE_BANNER }.to_string());
    out.into_iter().join("\n")
}
