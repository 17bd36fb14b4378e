use chrono::{DateTime, Duration, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Span used when the text names no recognizable range.
pub const DEFAULT_SPAN_HOURS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Hours,
    Minutes,
    Days,
}

impl Unit {
    fn span(self, n: i64) -> Option<Duration> {
        match self {
            Unit::Hours => Duration::try_hours(n),
            Unit::Minutes => Duration::try_minutes(n),
            Unit::Days => Duration::try_days(n),
        }
    }
}

// Scanned in order; the long unit names win over the one-letter forms.
static RULES: Lazy<Vec<(Regex, Unit)>> = Lazy::new(|| {
    [
        (r"last\s+(\d+)\s*hours?", Unit::Hours),
        (r"last\s+(\d+)\s*minutes?", Unit::Minutes),
        (r"last\s+(\d+)\s*days?", Unit::Days),
        (r"last\s+(\d+)\s*h", Unit::Hours),
        (r"last\s+(\d+)\s*m", Unit::Minutes),
        (r"last\s+(\d+)\s*d", Unit::Days),
    ]
    .into_iter()
    .map(|(pat, unit)| (Regex::new(pat).unwrap(), unit))
    .collect()
});

/// Absolute `[start, end)` window. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn trailing(end: DateTime<Utc>, span: Duration) -> Option<Self> {
        end.checked_sub_signed(span).and_then(|start| Self::new(start, end))
    }

    /// The trailing hour ending at `now`.
    pub fn default_at(now: DateTime<Utc>) -> Self {
        Self { start: now - Duration::hours(DEFAULT_SPAN_HOURS), end: now }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn start_nanos(&self) -> Option<i64> {
        self.start.timestamp_nanos_opt()
    }

    pub fn end_nanos(&self) -> Option<i64> {
        self.end.timestamp_nanos_opt()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_rfc3339(), self.end_rfc3339())
    }
}

/// Parse phrases such as "last 2 hours", "last 45m" or "check the last 3 days".
/// Anything else yields the trailing hour.
pub fn parse_time_range(text: &str) -> TimeWindow {
    parse_time_range_at(text, Utc::now())
}

pub fn parse_time_range_at(text: &str, now: DateTime<Utc>) -> TimeWindow {
    let text = text.trim().to_lowercase();
    for (re, unit) in RULES.iter() {
        let Some(caps) = re.captures(&text) else { continue };
        let window = caps[1]
            .parse::<i64>()
            .ok()
            .and_then(|n| unit.span(n))
            .and_then(|span| TimeWindow::trailing(now, span));
        return match window {
            Some(w) => w,
            None => {
                tracing::debug!(input = %text, "time range not usable, falling back to default window");
                TimeWindow::default_at(now)
            }
        };
    }
    TimeWindow::default_at(now)
}

/// The first "last N <unit>" phrase inside free text, as written.
pub fn find_time_phrase(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    RULES.iter().find_map(|(re, _)| re.find(&lower).map(|m| m.as_str().to_string()))
}
