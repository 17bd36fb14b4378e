use crate::store::LogLine;
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// PAM-style remote host field, e.g. "rhost=203.0.113.7".
static RE_RHOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"rhost=(\S+)").unwrap());

// Loose dotted quad; octet ranges are not validated.
static RE_IPV4: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

/// Default number of ranked sources.
pub const DEFAULT_TOP_SOURCES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

pub fn extract_source(line: &str) -> Option<&str> {
    RE_RHOST.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Most frequent `rhost=` tokens. Equal counts keep first-seen order.
pub fn rank_sources(lines: &[LogLine], top_n: usize) -> Vec<SourceCount> {
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut ranked: Vec<SourceCount> = Vec::new();
    for l in lines {
        let Some(src) = extract_source(&l.line) else { continue };
        match index.get(src) {
            Some(&i) => ranked[i].count += 1,
            None => {
                index.insert(src, ranked.len());
                ranked.push(SourceCount { source: src.to_string(), count: 1 });
            }
        }
    }
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}

/// Distinct IPv4-looking tokens anywhere in the lines, first-seen order.
pub fn unique_ips(lines: &[LogLine]) -> Vec<String> {
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut out = Vec::new();
    for l in lines {
        for m in RE_IPV4.find_iter(&l.line) {
            if seen.insert(m.as_str()) {
                out.push(m.as_str().to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rhost_token_stops_at_whitespace() {
        assert_eq!(
            extract_source("pam_unix(sshd:auth): authentication failure; rhost=10.1.2.3 user=root"),
            Some("10.1.2.3")
        );
        assert_eq!(extract_source("no host here"), None);
    }
}
