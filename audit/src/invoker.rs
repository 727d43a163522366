//! Audit invocation — one synchronous engine run over one document.

use std::path::Path;
use std::sync::Arc;

use gutter_types::AuditDiagnostic;

use crate::ruleset::{Ruleset, RulesetParseError};

/// Fatal failure inside the analysis engine: an I/O error reading the
/// document, or an internal fault in the engine itself.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EngineFault(String);

impl EngineFault {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Raw result of one engine run.
#[derive(Debug, Default)]
pub struct AuditReport {
    /// Findings in the order the engine produced them.
    pub diagnostics: Vec<AuditDiagnostic>,
    /// Non-fatal internal audit exceptions the engine recovered from.
    /// These accompany the findings instead of aborting the run.
    pub faults: Vec<String>,
}

/// External analysis engine collaborator.
///
/// `run` is synchronous and potentially slow (full file parse plus rule
/// evaluation); callers that cannot block dispatch it to a worker.
pub trait AuditEngine: Send + Sync {
    /// Run the engine over `document` with the given ruleset, or with the
    /// engine's built-in default ruleset when `ruleset` is `None`.
    fn run(&self, document: &Path, ruleset: Option<&Ruleset>) -> Result<AuditReport, EngineFault>;
}

/// Classified audit failure.
///
/// Both variants are absorbed at the overlay boundary — the worst
/// user-visible effect is an empty annotation list, never a crash.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("malformed ruleset configuration: {0}")]
    ConfigParse(#[from] RulesetParseError),
    #[error("audit execution failed: {reason}")]
    Execution { reason: String },
}

/// Ruleset configuration as handed over by the provider: the raw document
/// text plus, when known, where it came from (for logging only).
#[derive(Debug, Clone)]
pub struct RulesetSource {
    pub url: Option<url::Url>,
    pub content: String,
}

/// Supplies the currently configured ruleset, if any.
///
/// Implementations re-read their backing store on every call; the invoker
/// deliberately does not cache rulesets across audit runs.
pub trait RulesetProvider: Send + Sync {
    fn current_ruleset_url(&self) -> Option<url::Url>;

    fn current_ruleset_content(&self) -> Option<String>;

    /// Bundle URL and content into a [`RulesetSource`], or `None` when no
    /// ruleset is configured (the engine default applies).
    fn current_source(&self) -> Option<RulesetSource> {
        self.current_ruleset_content().map(|content| RulesetSource {
            url: self.current_ruleset_url(),
            content,
        })
    }
}

/// Ordered diagnostics plus informational audit warnings from one run.
#[derive(Debug, Default)]
pub struct AuditOutcome {
    diagnostics: Vec<AuditDiagnostic>,
    warnings: Vec<String>,
}

impl AuditOutcome {
    #[must_use]
    pub fn diagnostics(&self) -> &[AuditDiagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<AuditDiagnostic> {
        self.diagnostics
    }

    /// Engine-internal problems reported alongside the findings.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Runs the engine over one document with the currently configured ruleset.
pub struct AuditInvoker {
    engine: Arc<dyn AuditEngine>,
}

impl AuditInvoker {
    #[must_use]
    pub fn new(engine: Arc<dyn AuditEngine>) -> Self {
        Self { engine }
    }

    /// Execute one audit.
    ///
    /// An absent `source` means "use the engine's default ruleset". A
    /// present but malformed source fails with [`AuditError::ConfigParse`]
    /// without reaching the engine; an engine fault surfaces as
    /// [`AuditError::Execution`].
    pub fn run(
        &self,
        document: &Path,
        source: Option<&RulesetSource>,
    ) -> Result<AuditOutcome, AuditError> {
        let ruleset = match source {
            Some(source) => {
                let ruleset = Ruleset::parse(&source.content)?;
                tracing::debug!(
                    document = %document.display(),
                    ruleset = ruleset.name(),
                    url = source.url.as_ref().map(url::Url::as_str),
                    "running audit with configured ruleset"
                );
                Some(ruleset)
            }
            None => {
                tracing::debug!(
                    document = %document.display(),
                    "running audit with engine default ruleset"
                );
                None
            }
        };

        let report = self
            .engine
            .run(document, ruleset.as_ref())
            .map_err(|fault| AuditError::Execution {
                reason: fault.to_string(),
            })?;

        if !report.faults.is_empty() {
            tracing::debug!(
                document = %document.display(),
                count = report.faults.len(),
                "audit completed with internal problems"
            );
        }

        Ok(AuditOutcome {
            diagnostics: report.diagnostics,
            warnings: report.faults,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gutter_types::AuditSeverity;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Engine double: records the ruleset it was called with and replays a
    /// scripted result.
    struct ScriptedEngine {
        result: Mutex<Option<Result<AuditReport, EngineFault>>>,
        seen_ruleset: Mutex<Option<Option<String>>>,
    }

    impl ScriptedEngine {
        fn returning(result: Result<AuditReport, EngineFault>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                seen_ruleset: Mutex::new(None),
            })
        }

        fn seen_ruleset(&self) -> Option<Option<String>> {
            self.seen_ruleset.lock().unwrap().clone()
        }
    }

    impl AuditEngine for ScriptedEngine {
        fn run(
            &self,
            _document: &Path,
            ruleset: Option<&Ruleset>,
        ) -> Result<AuditReport, EngineFault> {
            *self.seen_ruleset.lock().unwrap() = Some(ruleset.map(|r| r.name().to_string()));
            self.result.lock().unwrap().take().expect("engine re-run")
        }
    }

    fn make_diag(line: u32) -> AuditDiagnostic {
        AuditDiagnostic::new(AuditSeverity::Warning, "finding".to_string(), line)
    }

    #[test]
    fn absent_source_uses_engine_default() {
        let engine = ScriptedEngine::returning(Ok(AuditReport {
            diagnostics: vec![make_diag(3)],
            faults: vec![],
        }));
        let invoker = AuditInvoker::new(engine.clone());

        let outcome = invoker.run(&PathBuf::from("/src/Foo.java"), None).unwrap();
        assert_eq!(outcome.diagnostics().len(), 1);
        assert_eq!(engine.seen_ruleset(), Some(None));
    }

    #[test]
    fn configured_ruleset_reaches_engine() {
        let engine = ScriptedEngine::returning(Ok(AuditReport::default()));
        let invoker = AuditInvoker::new(engine.clone());
        let source = RulesetSource {
            url: None,
            content: "<ruleset name=\"team\"><rule key=\"a\"/></ruleset>".to_string(),
        };

        invoker
            .run(&PathBuf::from("/src/Foo.java"), Some(&source))
            .unwrap();
        assert_eq!(engine.seen_ruleset(), Some(Some("team".to_string())));
    }

    #[test]
    fn malformed_ruleset_fails_before_engine_runs() {
        let engine = ScriptedEngine::returning(Ok(AuditReport::default()));
        let invoker = AuditInvoker::new(engine.clone());
        let source = RulesetSource {
            url: None,
            content: "<ruleset><rule key=".to_string(),
        };

        let err = invoker
            .run(&PathBuf::from("/src/Foo.java"), Some(&source))
            .unwrap_err();
        assert!(matches!(err, AuditError::ConfigParse(_)));
        assert_eq!(engine.seen_ruleset(), None, "engine must not run");
    }

    #[test]
    fn engine_fault_maps_to_execution_error() {
        let engine = ScriptedEngine::returning(Err(EngineFault::new("cannot read file")));
        let invoker = AuditInvoker::new(engine);

        let err = invoker.run(&PathBuf::from("/src/Foo.java"), None).unwrap_err();
        match err {
            AuditError::Execution { reason } => assert_eq!(reason, "cannot read file"),
            other => panic!("expected Execution, got {other:?}"),
        }
    }

    #[test]
    fn internal_faults_become_warnings_without_dropping_diagnostics() {
        let engine = ScriptedEngine::returning(Ok(AuditReport {
            diagnostics: vec![make_diag(1), make_diag(2)],
            faults: vec!["rule `x` crashed on token 14".to_string()],
        }));
        let invoker = AuditInvoker::new(engine);

        let outcome = invoker.run(&PathBuf::from("/src/Foo.java"), None).unwrap();
        assert_eq!(outcome.diagnostics().len(), 2);
        assert_eq!(outcome.warnings().len(), 1);
    }
}
