//! Simulated host walkthrough: open a view, change the file, close it.
//!
//! Wires the overlay to stand-in collaborators (a toy audit engine, a
//! printing line tracker) and drives one full session lifecycle. Run with
//! `RUST_LOG=debug` to watch the registry work.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use gutter_audit::{AuditEngine, AuditReport, EngineFault, Ruleset};
use gutter_config::{FileRulesetProvider, GutterConfig};
use gutter_overlay::host::{
    EventSink, FileWatch, LineAnchor, LineTracker, SessionEventSource, SessionResolver,
};
use gutter_overlay::{HostCollaborators, OverlayManager, OverlayOptions, SessionEventKind};
use gutter_types::{AuditDiagnostic, AuditSeverity, DocumentId, SessionId};

const MAX_LINE_LENGTH: usize = 60;

/// Toy engine: checks line length and trailing whitespace, honoring the
/// configured ruleset's selection and severity overrides.
struct SimEngine;

impl SimEngine {
    fn severity_for(ruleset: Option<&Ruleset>, key: &str) -> Option<AuditSeverity> {
        match ruleset {
            // No ruleset configured: every check runs at warning level.
            None => Some(AuditSeverity::Warning),
            Some(r) => r
                .rule(key)
                .map(|rule| rule.severity().unwrap_or(AuditSeverity::Warning)),
        }
    }
}

impl AuditEngine for SimEngine {
    fn run(&self, document: &Path, ruleset: Option<&Ruleset>) -> Result<AuditReport, EngineFault> {
        let text = std::fs::read_to_string(document)
            .map_err(|e| EngineFault::new(format!("reading {}: {e}", document.display())))?;

        let line_length = Self::severity_for(ruleset, "line-length");
        let trailing = Self::severity_for(ruleset, "trailing-whitespace");

        let mut diagnostics = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let number = index as u32 + 1;
            if let Some(severity) = line_length
                && line.chars().count() > MAX_LINE_LENGTH
            {
                diagnostics.push(AuditDiagnostic::new(
                    severity,
                    format!("line exceeds {MAX_LINE_LENGTH} characters"),
                    number,
                ));
            }
            if let Some(severity) = trailing
                && line != line.trim_end()
            {
                diagnostics.push(AuditDiagnostic::new(
                    severity,
                    "trailing whitespace".to_string(),
                    number,
                ));
            }
        }
        Ok(AuditReport {
            diagnostics,
            faults: vec![],
        })
    }
}

/// One-document host: session 1 always shows `document`.
struct SimHost {
    document: DocumentId,
    sink: Mutex<Option<EventSink>>,
}

impl SessionEventSource for SimHost {
    fn subscribe(&self, sink: EventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }
}

impl SessionResolver for SimHost {
    fn is_source(&self, session: SessionId) -> bool {
        session == SessionId::new(1)
    }

    fn document_for(&self, session: SessionId) -> Option<DocumentId> {
        self.is_source(session).then(|| self.document.clone())
    }
}

struct LoggingWatch;

impl FileWatch for LoggingWatch {
    fn watch(&self, document: &DocumentId) {
        tracing::info!(%document, "file watch attached");
    }

    fn unwatch(&self, document: &DocumentId) {
        tracing::info!(%document, "file watch detached");
    }
}

struct PrintingAnchor {
    document: DocumentId,
    line: u32,
}

impl LineAnchor for PrintingAnchor {
    fn show(&self, diagnostic: &AuditDiagnostic) {
        println!(
            "  + {}:{}: {}: {}",
            self.document,
            self.line,
            diagnostic.severity().label(),
            diagnostic.message()
        );
    }

    fn clear(&self) {
        println!("  - {}:{}: marker removed", self.document, self.line);
    }
}

struct PrintingTracker;

impl LineTracker for PrintingTracker {
    fn has_line_space(&self, document: &DocumentId) -> bool {
        document.path().exists()
    }

    fn anchor(&self, document: &DocumentId, line: u32) -> Option<Arc<dyn LineAnchor>> {
        Some(Arc::new(PrintingAnchor {
            document: document.clone(),
            line,
        }))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let dir = tempfile::tempdir().context("creating scratch dir")?;

    // A source file with two findings: a long line and trailing whitespace.
    let source_path = dir.path().join("Foo.java");
    std::fs::write(
        &source_path,
        "class Foo {\n    void run() { System.out.println(\"a very long statement indeed\"); }\n    int x = 1; \n}\n",
    )?;

    // Team ruleset: demote line-length to info, keep trailing-whitespace.
    let ruleset_path = dir.path().join("ruleset.xml");
    std::fs::write(
        &ruleset_path,
        "<ruleset name=\"demo\">\n  <rule key=\"line-length\" severity=\"info\"/>\n  <rule key=\"trailing-whitespace\" severity=\"warning\"/>\n</ruleset>\n",
    )?;

    let config_path = dir.path().join("config.toml");
    let ruleset_url = url::Url::from_file_path(&ruleset_path)
        .map_err(|()| anyhow::anyhow!("ruleset path is not absolute"))?;
    std::fs::write(
        &config_path,
        format!("[ruleset]\nurl = \"{ruleset_url}\"\n\n[audit]\ntimeout_secs = 5\n"),
    )?;

    let config = Arc::new(GutterConfig::load_from(&config_path)?);
    let document = DocumentId::new(&source_path);
    let host = Arc::new(SimHost {
        document: document.clone(),
        sink: Mutex::new(None),
    });

    let mut manager = OverlayManager::start(
        host.as_ref(),
        HostCollaborators {
            resolver: host.clone(),
            tracker: Arc::new(PrintingTracker),
            watch: Arc::new(LoggingWatch),
            engine: Arc::new(SimEngine),
            rulesets: Arc::new(FileRulesetProvider::new(config.clone())),
        },
        OverlayOptions {
            audit_timeout: config.audit_timeout(),
        },
    );
    let sink = manager.sink();

    println!("== open view ==");
    sink.session(SessionEventKind::Opened, SessionId::new(1));
    manager.run_until_idle().await;
    println!("annotations: {}", manager.annotation_count(&document));

    println!("== fix the trailing whitespace, file changes on disk ==");
    std::fs::write(
        &source_path,
        "class Foo {\n    void run() { System.out.println(\"a very long statement indeed\"); }\n    int x = 1;\n}\n",
    )?;
    sink.file_changed(document.clone());
    manager.run_until_idle().await;
    println!("annotations: {}", manager.annotation_count(&document));

    println!("== close view ==");
    sink.session(SessionEventKind::Closed, SessionId::new(1));
    manager.run_until_idle().await;
    println!("annotations: {}", manager.annotation_count(&document));

    Ok(())
}
