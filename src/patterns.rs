use crate::store::LogLine;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Error categories, declared in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    AuthenticationFailure,
    ConnectionTimeout,
    PermissionDenied,
    ServiceUnavailable,
    DatabaseError,
    UnknownUser,
    FailedLogin,
    AlertExit,
    OtherErrors,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::AuthenticationFailure,
        Category::ConnectionTimeout,
        Category::PermissionDenied,
        Category::ServiceUnavailable,
        Category::DatabaseError,
        Category::UnknownUser,
        Category::FailedLogin,
        Category::AlertExit,
        Category::OtherErrors,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::AuthenticationFailure => "authentication_failure",
            Category::ConnectionTimeout => "connection_timeout",
            Category::PermissionDenied => "permission_denied",
            Category::ServiceUnavailable => "service_unavailable",
            Category::DatabaseError => "database_error",
            Category::UnknownUser => "unknown_user",
            Category::FailedLogin => "failed_login",
            Category::AlertExit => "alert_exit",
            Category::OtherErrors => "other_errors",
        }
    }

    /// "authentication_failure" -> "Authentication Failure"
    pub fn title(self) -> String {
        self.as_str()
            .split('_')
            .map(|w| {
                let mut c = w.chars();
                match c.next() {
                    Some(f) => f.to_uppercase().chain(c).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Categories weighted into the critical rate.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            Category::AuthenticationFailure | Category::DatabaseError | Category::ServiceUnavailable
        )
    }

    fn index(self) -> usize {
        self as usize
    }

    fn matches(self, l: &str) -> bool {
        match self {
            Category::AuthenticationFailure => {
                l.contains("authentication failure") || (l.contains("auth") && l.contains("fail"))
            }
            Category::ConnectionTimeout => l.contains("timeout") || l.contains("timed out"),
            Category::PermissionDenied => l.contains("permission denied") || l.contains("denied"),
            Category::ServiceUnavailable => l.contains("unavailable") || l.contains("down"),
            Category::DatabaseError => {
                l.contains("database") && (l.contains("error") || l.contains("fail"))
            }
            Category::UnknownUser => l.contains("user unknown") || l.contains("unknown user"),
            Category::FailedLogin => {
                l.contains("failed") && (l.contains("login") || l.contains("logon"))
            }
            Category::AlertExit => l.contains("alert") && l.contains("exit"),
            Category::OtherErrors => {
                l.contains("error") || l.contains("fail") || l.contains("critical")
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First matching category for a line, if any.
pub fn classify(line: &str) -> Option<Category> {
    let lower = line.to_lowercase();
    Category::ALL.into_iter().find(|c| c.matches(&lower))
}

/// Occurrences per category. Iteration follows precedence order and skips zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternCounts {
    counts: [usize; 9],
}

impl PatternCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: Category, n: usize) {
        self.counts[category.index()] += n;
    }

    pub fn get(&self, category: Category) -> usize {
        self.counts[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.get(c)))
            .filter(|(_, n)| *n > 0)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn critical_total(&self) -> usize {
        self.iter().filter(|(c, _)| c.is_critical()).map(|(_, n)| n).sum()
    }

    /// Highest count; ties go to the earlier category.
    pub fn dominant(&self) -> Option<(Category, usize)> {
        self.iter().fold(None, |best, (c, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((c, n)),
        })
    }

    /// Non-zero entries by descending count, precedence order among equals.
    pub fn ranked(&self) -> Vec<(Category, usize)> {
        let mut v: Vec<(Category, usize)> = self.iter().collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }
}

impl FromIterator<(Category, usize)> for PatternCounts {
    fn from_iter<I: IntoIterator<Item = (Category, usize)>>(iter: I) -> Self {
        let mut out = PatternCounts::new();
        for (c, n) in iter {
            out.add(c, n);
        }
        out
    }
}

impl Serialize for PatternCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (c, n) in self.iter() {
            map.serialize_entry(c.as_str(), &n)?;
        }
        map.end()
    }
}

pub fn extract_patterns(lines: &[LogLine]) -> PatternCounts {
    let mut counts = PatternCounts::new();
    for l in lines {
        if let Some(c) = classify(&l.line) {
            counts.add(c, 1);
        }
    }
    counts
}

/// Coarse level tally, independent of the error categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LevelCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub debug: usize,
}

pub fn classify_levels(lines: &[LogLine]) -> LevelCounts {
    let mut out = LevelCounts::default();
    for l in lines {
        let s = l.line.to_lowercase();
        if s.contains("critical") || s.contains("fatal") {
            out.critical += 1;
        } else if s.contains("error") || s.contains("fail") {
            out.error += 1;
        } else if s.contains("warn") || s.contains("alert") {
            out.warning += 1;
        } else if s.contains("debug") {
            out.debug += 1;
        } else {
            out.info += 1;
        }
    }
    out
}
