use crate::timerange::TimeWindow;
use std::collections::BTreeMap;

/// Matches every stream that carries a `job` label.
pub const ANY_JOB_SELECTOR: &str = r#"{job=~".+"}"#;

/// Entries requested per call.
pub const DEFAULT_LIMIT: usize = 1000;

/// A store request: stream selector, optional line filter and window.
/// Building it never looks at log content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub selector: String,
    pub pattern: Option<String>,
    pub window: TimeWindow,
    pub limit: usize,
}

impl LogQuery {
    pub fn build(window: TimeWindow, pattern: Option<&str>, limit: usize) -> Self {
        let pattern = pattern.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);
        Self { selector: ANY_JOB_SELECTOR.to_string(), pattern, window, limit }
    }

    pub fn with_selector(mut self, selector: String) -> Self {
        self.selector = selector;
        self
    }

    /// Render as LogQL. The pattern becomes a case-insensitive regex line filter.
    pub fn logql(&self) -> String {
        match &self.pattern {
            Some(p) => format!(r#"{} |~ "(?i){}""#, self.selector, escape_literal(p)),
            None => self.selector.clone(),
        }
    }
}

/// `{k="v", ...}` from exact-match label filters.
pub fn label_selector(filters: &BTreeMap<String, String>) -> String {
    if filters.is_empty() {
        return ANY_JOB_SELECTOR.to_string();
    }
    let parts: Vec<String> = filters
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, k, escape_literal(v)))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out
}
