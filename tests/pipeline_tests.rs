use async_trait::async_trait;
use logmedic::config::Settings;
use logmedic::knowledge::{KnowledgeBase, KnowledgeHit};
use logmedic::pipeline::{Outcome, Pipeline, PipelineError, PipelineState};
use logmedic::query::LogQuery;
use logmedic::report::{ANOMALY_BANNER, STABLE_BANNER};
use logmedic::store::{LogLine, LogStore, StoreError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

enum Fake {
    Lines(Vec<LogLine>),
    Down,
    Stall,
}

struct FakeStore {
    mode: Fake,
    seen: Mutex<Vec<String>>,
}

impl FakeStore {
    fn new(mode: Fake) -> Arc<Self> {
        Arc::new(Self { mode, seen: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl LogStore for FakeStore {
    async fn query_range(&self, query: &LogQuery) -> Result<Vec<LogLine>, StoreError> {
        self.seen.lock().unwrap().push(query.logql());
        match &self.mode {
            Fake::Lines(lines) => Ok(lines.clone()),
            Fake::Down => Err(StoreError::Unavailable("connection refused".into())),
            Fake::Stall => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

struct StaticKb(Vec<KnowledgeHit>);

#[async_trait]
impl KnowledgeBase for StaticKb {
    async fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<KnowledgeHit>> {
        Ok(self.0.clone())
    }
}

struct BrokenKb;

#[async_trait]
impl KnowledgeBase for BrokenKb {
    async fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<KnowledgeHit>> {
        anyhow::bail!("index offline")
    }
}

fn auth_and_timeouts() -> Vec<LogLine> {
    let mut out = Vec::new();
    for i in 0..12 {
        out.push(LogLine::new(
            "1717000000000000000",
            format!("sshd: authentication failure; rhost=203.0.113.{}", i % 2),
        ));
    }
    for _ in 0..3 {
        out.push(LogLine::new("1717000000000000000", "upstream timeout after 30s"));
    }
    while out.len() < 100 {
        out.push(LogLine::new("1717000000000000000", "GET /index.html 200"));
    }
    out
}

fn pipeline(store: Arc<FakeStore>) -> Pipeline<Arc<FakeStore>> {
    Pipeline::new(store, &Settings::default())
}

#[tokio::test]
async fn full_report_for_auth_failures() {
    let store = FakeStore::new(Fake::Lines(auth_and_timeouts()));
    let out = pipeline(store.clone()).run("last 1 hour", None).await;
    assert_eq!(out.state(), PipelineState::Reported);

    let Outcome::Reported { report, solution, related, text } = out else {
        panic!("expected a report");
    };
    assert_eq!(report.anomaly_score, 13.8);
    assert!(related.is_empty());
    assert_eq!(solution.context["Severity"], "MEDIUM");

    assert!(text.starts_with("### Log Analytics Report (last 1 hour)\n- **Total Logs**: 100\n"));
    assert!(text.contains("- **Anomaly Score**: 13.80%"));
    assert!(text.contains("- **Severity Level**: MEDIUM"));
    assert!(text.contains("- **Unique IPs**: 2"));
    assert!(text.contains("- Authentication Failure: 12 occurrences\n- Connection Timeout: 3 occurrences"));
    assert!(text.contains("- 203.0.113.0: 6 errors"));
    assert!(text.contains("**Root Cause:** High volume of authentication failures (12 occurrences)."));
    assert!(text.contains("**Recommended Actions:**\n1. "));
    assert!(text.ends_with(ANOMALY_BANNER));

    assert_eq!(store.seen.lock().unwrap().as_slice(), [r#"{job=~".+"}"#]);
}

#[tokio::test]
async fn empty_window_reports_no_logs() {
    let p = pipeline(FakeStore::new(Fake::Lines(Vec::new())));
    let out = p.run("last 1 hour", None).await;
    assert!(matches!(out, Outcome::NoLogs { .. }));
    assert_eq!(out.state(), PipelineState::Reported);
    assert_eq!(out.text(), "No logs found for last 1 hour");

    assert_eq!(
        p.run_report("last 15 minutes", Some("oom")).await,
        "No logs found for last 15 minutes matching pattern 'oom'"
    );
}

#[tokio::test]
async fn pattern_is_forwarded_and_echoed() {
    let store = FakeStore::new(Fake::Lines(vec![LogLine::new("0", "kernel: out of memory")]));
    let text = pipeline(store.clone()).run_report("last 2 hours", Some("memory")).await;
    assert!(text.contains("- **Filter**: `memory`"));
    assert!(text.contains("**No common error patterns detected.**"));
    assert!(text.ends_with(STABLE_BANNER));
    assert_eq!(store.seen.lock().unwrap()[0], r#"{job=~".+"} |~ "(?i)memory""#);
}

#[tokio::test]
async fn store_failure_is_a_message() {
    let out = pipeline(FakeStore::new(Fake::Down)).run("last 1 hour", None).await;
    assert_eq!(out.state(), PipelineState::Failed);
    assert!(matches!(out, Outcome::Failed { error: PipelineError::Store(StoreError::Unavailable(_)), .. }));
    assert_eq!(out.text(), "error fetching logs: log store unavailable: connection refused");
}

#[tokio::test]
async fn slow_store_times_out() {
    let mut settings = Settings::default();
    settings.store.timeout_secs = 1;
    let p = Pipeline::new(FakeStore::new(Fake::Stall), &settings);
    let out = p.run("last 1 hour", None).await;
    assert!(matches!(out, Outcome::Failed { error: PipelineError::Store(StoreError::Timeout(_)), .. }));
    assert!(out.text().starts_with("error fetching logs: log store did not answer within 1s"));
}

#[tokio::test]
async fn cancellation_produces_no_report() {
    let p = pipeline(FakeStore::new(Fake::Stall));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    assert!(p.run_report_cancellable("last 1 hour", None, &cancel).await.is_none());

    let res = p.run_cancellable("last 1 hour", None, &cancel).await;
    assert!(matches!(res, Err(PipelineError::Cancelled)));
}

#[tokio::test]
async fn uncancelled_run_completes() {
    let p = pipeline(FakeStore::new(Fake::Lines(auth_and_timeouts())));
    let text = p.run_report_cancellable("last 1 hour", None, &CancellationToken::new()).await.unwrap();
    assert!(text.contains("13.80%"));
}

#[tokio::test]
async fn knowledge_hits_are_listed() {
    let kb = StaticKb(vec![
        KnowledgeHit { title: "SSH hardening".into(), text: "Disable password auth.".into() },
        KnowledgeHit { title: "fail2ban".into(), text: "Ban repeat offenders.".into() },
    ]);
    let p = pipeline(FakeStore::new(Fake::Lines(auth_and_timeouts()))).with_knowledge(Arc::new(kb));
    let text = p.run_report("last 1 hour", None).await;
    assert!(text.contains("**Related Knowledge:**\n- SSH hardening\n- fail2ban"));

    let text = p.solution_report("last 1 hour", None).await;
    assert!(text.contains("- SSH hardening: Disable password auth."));
}

#[tokio::test]
async fn knowledge_failure_is_not_fatal() {
    let p = pipeline(FakeStore::new(Fake::Lines(auth_and_timeouts()))).with_knowledge(Arc::new(BrokenKb));
    let out = p.run("last 1 hour", None).await;
    assert_eq!(out.state(), PipelineState::Reported);
    assert!(!out.text().contains("Related Knowledge"));
}

#[tokio::test]
async fn log_summary_lists_lines() {
    let lines = vec![
        LogLine::new("1717000000000000000", "first"),
        LogLine::new("not-a-time", "second"),
    ];
    let text = pipeline(FakeStore::new(Fake::Lines(lines))).log_summary("last 1 hour").await;
    assert!(text.starts_with("Log Summary for last 1 hour:\nTotal logs retrieved: 2\nTime range: "));
    assert!(text.contains("[1] 2024-05-29T16:26:40.000Z: first"));
    assert!(text.contains("[2] not-a-time: second"));

    let text = pipeline(FakeStore::new(Fake::Down)).log_summary("last 1 hour").await;
    assert!(text.starts_with("error fetching logs:"));
}

#[tokio::test]
async fn listing_is_cut_after_a_hundred_lines() {
    let lines: Vec<LogLine> = (0..130).map(|i| LogLine::new("0", format!("line {}", i))).collect();
    let text = pipeline(FakeStore::new(Fake::Lines(lines))).log_summary("last 1 hour").await;
    assert!(text.contains("[100] "));
    assert!(!text.contains("[101] "));
    assert!(text.ends_with("... and 30 more log entries"));
}

#[tokio::test]
async fn tied_categories_pick_the_earlier_one() {
    let mut lines = Vec::new();
    for _ in 0..5 {
        lines.push(LogLine::new("0", "database connection error"));
        lines.push(LogLine::new("0", "backend service unavailable"));
    }
    let text = pipeline(FakeStore::new(Fake::Lines(lines))).solution_report("last 1 hour", None).await;
    assert!(text.starts_with("**Root Cause Analysis & Solutions**"));
    assert!(text.contains("**Root Cause:** Service unavailability detected (5 occurrences)."));
}

#[tokio::test]
async fn decomposed_stages_agree_with_run() {
    let p = pipeline(FakeStore::new(Fake::Lines(auth_and_timeouts())));
    let fetched = p.fetch("last 1 hour", None).await.unwrap();
    assert_eq!(fetched.lines.len(), 100);
    assert_eq!(fetched.window.duration(), chrono::Duration::hours(1));
    let report = p.analyze(&fetched.lines).unwrap();
    let solution = p.solve(&report);
    assert!(solution.root_cause.starts_with("High volume of authentication failures"));
    assert_eq!(solution.context["Total Errors"], "15");
}

struct SilentKb;

#[async_trait]
impl KnowledgeBase for SilentKb {
    async fn search(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<KnowledgeHit>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn silent_knowledge_base_does_not_stall_the_report() {
    let mut settings = Settings::default();
    settings.analysis.knowledge_timeout_secs = 1;
    let p = Pipeline::new(FakeStore::new(Fake::Lines(auth_and_timeouts())), &settings)
        .with_knowledge(Arc::new(SilentKb));
    let out = tokio::time::timeout(Duration::from_secs(5), p.run("last 1 hour", None))
        .await
        .expect("report should finish once the lookup times out");
    assert_eq!(out.state(), PipelineState::Reported);
    assert!(out.text().contains("13.80%"));
    assert!(!out.text().contains("Related Knowledge"));
}

#[tokio::test]
async fn cancelled_log_summary_stops_the_fetch() {
    let p = pipeline(FakeStore::new(Fake::Stall));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let res = tokio::time::timeout(Duration::from_secs(5), p.log_summary_cancellable("last 1 hour", &cancel))
        .await
        .expect("cancellation should end the listing promptly");
    assert!(matches!(res, Err(PipelineError::Cancelled)));

    let p = pipeline(FakeStore::new(Fake::Lines(vec![LogLine::new("0", "hello")])));
    let text = p.log_summary_cancellable("last 1 hour", &CancellationToken::new()).await.unwrap();
    assert!(text.contains("[1] "));
}
