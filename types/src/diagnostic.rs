use std::path::Path;

use serde::Deserialize;

/// Severity level for an audit finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Error,
    Warning,
    Info,
}

impl AuditSeverity {
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A single finding from one audit run over one document.
///
/// Fields are private; construction goes through [`AuditDiagnostic::new`]
/// and readers use the accessors. Immutable once built.
#[derive(Debug, Clone)]
pub struct AuditDiagnostic {
    severity: AuditSeverity,
    message: String,
    /// 1-based line number as reported by the engine. `0` means the engine
    /// could not resolve a line; display and attachment clamp it to 1.
    line: u32,
}

impl AuditDiagnostic {
    #[must_use]
    pub fn new(severity: AuditSeverity, message: String, line: u32) -> Self {
        Self {
            severity,
            message,
            line,
        }
    }

    #[must_use]
    pub fn severity(&self) -> AuditSeverity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Raw line number as reported by the engine (may be 0).
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Line number for display and attachment: always ≥ 1.
    #[must_use]
    pub fn display_line(&self) -> u32 {
        self.line.max(1)
    }

    /// Format as `path:line: severity: message`.
    #[must_use]
    pub fn display_with_path(&self, path: &Path) -> String {
        format!(
            "{}:{}: {}: {}",
            path.display(),
            self.display_line(),
            self.severity.label(),
            self.message,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn severity_labels() {
        assert_eq!(AuditSeverity::Error.label(), "error");
        assert_eq!(AuditSeverity::Warning.label(), "warning");
        assert_eq!(AuditSeverity::Info.label(), "info");
    }

    #[test]
    fn is_error_only_for_error() {
        assert!(AuditSeverity::Error.is_error());
        assert!(!AuditSeverity::Warning.is_error());
        assert!(!AuditSeverity::Info.is_error());
    }

    #[test]
    fn severity_deserializes_lowercase() {
        let sev: AuditSeverity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(sev, AuditSeverity::Warning);
        assert!(serde_json::from_str::<AuditSeverity>("\"fatal\"").is_err());
    }

    #[test]
    fn display_line_clamps_zero_to_one() {
        let diag = AuditDiagnostic::new(AuditSeverity::Warning, "tab character".to_string(), 0);
        assert_eq!(diag.line(), 0);
        assert_eq!(diag.display_line(), 1);
    }

    #[test]
    fn display_line_passes_positive_through() {
        let diag = AuditDiagnostic::new(AuditSeverity::Error, "missing brace".to_string(), 42);
        assert_eq!(diag.display_line(), 42);
    }

    #[test]
    fn display_with_path_format() {
        let diag = AuditDiagnostic::new(AuditSeverity::Warning, "line too long".to_string(), 12);
        let path = PathBuf::from("src/Foo.java");
        assert_eq!(
            diag.display_with_path(&path),
            "src/Foo.java:12: warning: line too long"
        );
    }
}
