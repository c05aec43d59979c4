//! Configuration consistency findings.

use serde::Serialize;

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// May indicate a potential issue.
    Warning,
    /// Configuration is invalid.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone, Serialize)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: String,
    pub message: String,
    /// Location within the configuration (e.g., "dashboards.onboard.bindings[2]").
    pub location: String,
}

impl CheckFinding {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            location: location.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for CheckFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.category, self.location, self.message
        )
    }
}
