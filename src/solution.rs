//! Root-cause mapping from the dominant error category to remediation steps.

use crate::anomaly::AnomalyReport;
use crate::patterns::{Category, PatternCounts};
use crate::sources::SourceCount;
use serde::Serialize;
use std::collections::BTreeMap;

pub const NO_ANOMALY_ROOT_CAUSE: &str =
    "No anomalies detected. System appears to be functioning normally.";

/// One knowledge-table row. `{count}` in `root_cause` is replaced with the
/// number of occurrences.
struct Remedy {
    category: Category,
    root_cause: &'static str,
    actions: &'static [&'static str],
}

static KNOWLEDGE: &[Remedy] = &[
    Remedy {
        category: Category::AuthenticationFailure,
        root_cause: "High volume of authentication failures ({count} occurrences). This indicates potential brute force attack or misconfigured authentication system.",
        actions: &[
            "Review authentication logs for brute force attack patterns",
            "Implement rate limiting on authentication endpoints",
            "Enable fail2ban or similar intrusion prevention system",
            "Review and strengthen password policies",
            "Consider implementing multi-factor authentication (MFA)",
        ],
    },
    Remedy {
        category: Category::ConnectionTimeout,
        root_cause: "Multiple connection timeouts detected ({count} occurrences). This suggests network connectivity issues or overloaded services.",
        actions: &[
            "Check network connectivity and firewall rules",
            "Increase connection timeout values if appropriate",
            "Review server resource utilization (CPU, memory, network)",
            "Check for network congestion or bandwidth issues",
            "Verify DNS resolution is working correctly",
        ],
    },
    Remedy {
        category: Category::PermissionDenied,
        root_cause: "Permission denied errors ({count} occurrences). This indicates incorrect file permissions or access control configuration.",
        actions: &[
            "Review file and directory permissions",
            "Check user and group ownership",
            "Verify SELinux or AppArmor policies if enabled",
            "Review application access control lists (ACLs)",
            "Ensure service accounts have appropriate permissions",
        ],
    },
    Remedy {
        category: Category::ServiceUnavailable,
        root_cause: "Service unavailability detected ({count} occurrences). This suggests service crashes or resource exhaustion.",
        actions: &[
            "Check if the service is running: systemctl status <service>",
            "Review service logs for startup errors",
            "Verify service dependencies are available",
            "Check system resources (disk space, memory, CPU)",
            "Restart the service if appropriate",
        ],
    },
    Remedy {
        category: Category::DatabaseError,
        root_cause: "Database errors detected ({count} occurrences). This indicates database connectivity or query issues.",
        actions: &[
            "Check database connectivity and credentials",
            "Review database logs for specific errors",
            "Verify database server is running and accessible",
            "Check for database connection pool exhaustion",
            "Review and optimize slow queries",
        ],
    },
    Remedy {
        category: Category::UnknownUser,
        root_cause: "Unknown user attempts ({count} occurrences). This may indicate reconnaissance activity or misconfigured user accounts.",
        actions: &[
            "Verify user accounts exist in the system",
            "Check LDAP/AD integration if applicable",
            "Review user provisioning processes",
            "Implement proper user validation before authentication attempts",
            "Monitor for potential reconnaissance activities",
        ],
    },
    Remedy {
        category: Category::AlertExit,
        root_cause: "Service alert exits detected ({count} occurrences). This suggests configuration errors or missing dependencies.",
        actions: &[
            "Review the specific service configuration",
            "Check for configuration file syntax errors",
            "Verify all required dependencies are installed",
            "Review system logs for related errors",
            "Test configuration in a non-production environment first",
        ],
    },
];

static GENERIC_ACTIONS: &[&str] = &[
    "Review detailed error logs for more specific information",
    "Check system resource utilization",
    "Verify service configuration",
    "Consult service-specific documentation",
];

fn lookup(category: Category) -> Option<&'static Remedy> {
    KNOWLEDGE.iter().find(|r| r.category == category)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub root_cause: String,
    pub actions: Vec<String>,
    pub context: BTreeMap<String, String>,
}

impl Solution {
    pub fn no_anomaly() -> Self {
        Self {
            root_cause: NO_ANOMALY_ROOT_CAUSE.to_string(),
            actions: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Attach severity, error total and score from the analysis that produced it.
    pub fn with_report_context(mut self, report: &AnomalyReport) -> Self {
        self.context.insert("Severity".into(), report.severity.to_string());
        self.context.insert("Total Errors".into(), report.total_errors.to_string());
        self.context.insert("Anomaly Score".into(), format!("{:.2}%", report.anomaly_score));
        self
    }
}

pub fn map_root_cause(counts: &PatternCounts, top_sources: &[SourceCount]) -> Solution {
    let Some((category, count)) = counts.dominant() else {
        return Solution::no_anomaly();
    };

    let (mut root_cause, actions): (String, Vec<String>) = match lookup(category) {
        Some(r) => (
            r.root_cause.replace("{count}", &count.to_string()),
            r.actions.iter().map(|s| s.to_string()).collect(),
        ),
        None => (
            format!("Multiple errors of type '{}' detected ({} occurrences).", category, count),
            GENERIC_ACTIONS.iter().map(|s| s.to_string()).collect(),
        ),
    };

    let mut context = BTreeMap::new();
    context.insert("Dominant Pattern".to_string(), category.title());
    context.insert("Occurrences".to_string(), count.to_string());
    if let Some(top) = top_sources.first() {
        root_cause.push_str(&format!(" Primary source: {} ({} occurrences).", top.source, top.count));
        context.insert(
            "Top Error Source".to_string(),
            format!("{} ({} occurrences)", top.source, top.count),
        );
    }

    tracing::debug!(%category, count, actions = actions.len(), "mapped root cause");
    Solution { root_cause, actions, context }
}

/// Numbered, sectioned rendering of a solution.
pub fn format_solution(solution: &Solution) -> String {
    let mut parts = vec![
        "**Root Cause Analysis & Solutions**".to_string(),
        String::new(),
        format!("**Root Cause:** {}", solution.root_cause),
    ];
    if solution.is_actionable() {
        parts.push(String::new());
        parts.push("**Recommended Solutions:**".to_string());
        for (i, a) in solution.actions.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, a));
        }
    }
    if !solution.context.is_empty() {
        parts.push(String::new());
        parts.push("**Additional Information:**".to_string());
        for (k, v) in &solution.context {
            parts.push(format!("  - {}: {}", k, v));
        }
    }
    parts.join("\n")
}
