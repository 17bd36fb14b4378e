use chrono::{TimeZone, Utc};
use logmedic::anomaly::analyze;
use logmedic::config::AnalysisConfig;
use logmedic::report::{
    render_analysis_summary, render_log_listing, render_log_summary, render_no_logs, render_report,
    ANOMALY_BANNER, STABLE_BANNER,
};
use logmedic::solution::map_root_cause;
use logmedic::store::LogLine;
use logmedic::timerange::parse_time_range_at;

fn lines(texts: &[&str]) -> Vec<LogLine> {
    texts.iter().map(|t| LogLine::new("0", *t)).collect()
}

#[test]
fn no_logs_messages() {
    assert_eq!(render_no_logs("last 3 days", None), "No logs found for last 3 days");
    assert_eq!(
        render_no_logs("last 3 days", Some("panic")),
        "No logs found for last 3 days matching pattern 'panic'"
    );
}

#[test]
fn report_caps_pattern_and_source_rows() {
    let ls = lines(&[
        "authentication failure rhost=a",
        "authentication failure rhost=b",
        "authentication failure rhost=c",
        "authentication failure rhost=d",
        "request timeout",
        "permission denied",
        "service down",
        "database write error",
        "user unknown",
        "alert: child exit 3",
    ]);
    let report = analyze(&ls, 5).unwrap();
    let solution = map_root_cause(&report.pattern_counts, &report.top_sources);
    let cfg = AnalysisConfig::default();
    let text = render_report("last 1 hour", None, &report, &solution, &[], &cfg);

    let pattern_rows = text.lines().filter(|l| l.ends_with(" occurrences") && l.starts_with("- ")).count();
    assert_eq!(pattern_rows, 5);
    assert!(text.contains("- Authentication Failure: 4 occurrences"));
    assert!(!text.contains("Alert Exit"));

    let source_rows = text.lines().filter(|l| l.ends_with(" errors")).count();
    assert_eq!(source_rows, 3);
    assert!(text.ends_with(ANOMALY_BANNER));
}

#[test]
fn analysis_summary_view() {
    let report = analyze(&lines(&["disk error", "fine", "fine", "fine"]), 5).unwrap();
    let text = render_analysis_summary(&report);
    assert!(text.starts_with("**Log Analysis Summary**\n\nTotal Logs Analyzed: 4\nAnomaly Score: 15.00%\nSeverity: MEDIUM\nHas Anomaly: Yes"));
    assert!(text.contains("  - Other Errors: 1"));
    assert!(!text.contains("Top Error Sources"));

    let quiet = render_analysis_summary(&analyze(&lines(&["fine"]), 5).unwrap());
    assert!(quiet.contains("Has Anomaly: No"));
    assert!(quiet.ends_with(STABLE_BANNER));
}

#[test]
fn summary_includes_level_tally() {
    let now = Utc.with_ymd_and_hms(2024, 5, 29, 17, 0, 0).unwrap();
    let window = parse_time_range_at("last 1 hour", now);
    let ls = lines(&["FATAL: oom", "connection failed", "warn: slow", "debug tick", "hello"]);
    let text = render_log_summary("last 1 hour", &window, &ls);
    assert!(text.contains("Levels: CRITICAL 1, ERROR 1, WARNING 1, INFO 1, DEBUG 1"));
    assert!(text.contains("Time range: 2024-05-29T16:00:00Z to 2024-05-29T17:00:00Z"));
}

#[test]
fn empty_listing() {
    assert_eq!(render_log_listing(&[]), "No logs found for the specified time range.");
}
