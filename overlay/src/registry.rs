//! Overlay registry — session and annotation bookkeeping.
//!
//! Two maps, treated as one consistent unit: `sessions` (which view shows
//! which file) and `annotations` (which markers are attached per file). A
//! per-document generation counter stamps every scheduled audit so stale
//! completions can be recognized and discarded at apply time.
//!
//! The registry is purely synchronous and holds no locks; the manager
//! serializes every mutation by owning it behind `&mut self`.

use std::collections::HashMap;

use gutter_types::{AuditDiagnostic, DocumentId, SessionId};

use crate::annotation::Annotation;
use crate::host::LineTracker;

/// Result of closing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The session was not tracked; nothing changed.
    Untracked,
    /// The session was removed but other sessions still display the
    /// document; its annotations stay attached.
    Remaining(DocumentId),
    /// The last session for the document closed; all annotations were
    /// released and the document dropped from the registry.
    LastClosed(DocumentId),
}

#[derive(Default)]
pub struct OverlayRegistry {
    sessions: HashMap<SessionId, DocumentId>,
    annotations: HashMap<DocumentId, Vec<Annotation>>,
    generations: HashMap<DocumentId, u64>,
}

impl OverlayRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `session` is currently tracked.
    #[must_use]
    pub fn is_known(&self, session: SessionId) -> bool {
        self.sessions.contains_key(&session)
    }

    /// Whether at least one tracked session displays `document`.
    #[must_use]
    pub fn is_tracked(&self, document: &DocumentId) -> bool {
        self.sessions.values().any(|d| d == document)
    }

    /// Number of tracked sessions displaying `document`.
    #[must_use]
    pub fn session_count(&self, document: &DocumentId) -> usize {
        self.sessions.values().filter(|d| *d == document).count()
    }

    /// Number of tracked sessions.
    #[must_use]
    pub fn tracked_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of attached annotations for `document`.
    #[must_use]
    pub fn annotation_count(&self, document: &DocumentId) -> usize {
        self.annotations.get(document).map_or(0, Vec::len)
    }

    /// Track a session and make sure the document has an annotation slot.
    ///
    /// Idempotent: opening an already-tracked session leaves the session
    /// map untouched. Whether to re-audit afterwards is the caller's
    /// decision, not the registry's.
    pub fn open(&mut self, session: SessionId, document: DocumentId) {
        self.annotations.entry(document.clone()).or_default();
        match self.sessions.get(&session) {
            None => {
                self.sessions.insert(session, document);
            }
            Some(existing) if *existing == document => {}
            Some(existing) => {
                // The host reused a session handle without a close event.
                // Keep the original mapping; a close will arrive eventually.
                tracing::warn!(
                    %session,
                    tracked = %existing,
                    requested = %document,
                    "session already tracked for a different document, keeping existing mapping"
                );
            }
        }
    }

    /// Untrack a session, releasing the document's annotations when this
    /// was the last session displaying it.
    pub fn close(&mut self, session: SessionId) -> CloseOutcome {
        let Some(document) = self.sessions.remove(&session) else {
            tracing::debug!(%session, "close for untracked session, nothing to clean up");
            return CloseOutcome::Untracked;
        };

        if self.is_tracked(&document) {
            tracing::debug!(
                %session,
                %document,
                remaining = self.session_count(&document),
                "session closed, document still displayed elsewhere"
            );
            return CloseOutcome::Remaining(document);
        }

        self.clear_annotations(&document);
        if self.annotations.remove(&document).is_none() {
            // Inconsistent state: tracked session without an annotation
            // slot. Nothing to clean up; not fatal.
            tracing::debug!(%document, "no annotation list to remove");
        }
        self.generations.remove(&document);
        CloseOutcome::LastClosed(document)
    }

    /// Stamp a new audit generation for `document`.
    ///
    /// Returns `None` (and schedules nothing) when no tracked session
    /// displays the document — a file change racing a close lands here.
    pub fn begin_refresh(&mut self, document: &DocumentId) -> Option<u64> {
        if !self.is_tracked(document) {
            tracing::debug!(%document, "refresh requested for untracked document, skipping");
            return None;
        }
        self.annotations.entry(document.clone()).or_default();
        let generation = self.generations.entry(document.clone()).or_insert(0);
        *generation += 1;
        Some(*generation)
    }

    /// Apply a completed audit.
    ///
    /// Discards the result when the document is no longer tracked or when
    /// `generation` is not the most recently scheduled one. Otherwise the
    /// existing annotations are released first, then each diagnostic is
    /// clamped to line ≥ 1, resolved to an anchor, and attached.
    pub fn apply_refresh(
        &mut self,
        document: &DocumentId,
        generation: u64,
        diagnostics: Vec<AuditDiagnostic>,
        tracker: &dyn LineTracker,
    ) {
        if !self.accepts(document, generation) {
            return;
        }

        self.clear_annotations(document);

        if !tracker.has_line_space(document) {
            // Virtual or non-materialized file: nothing to attach to.
            tracing::debug!(%document, "document has no line tracking, leaving overlay empty");
            return;
        }

        let slot = self.annotations.entry(document.clone()).or_default();
        for diagnostic in diagnostics {
            let line = diagnostic.display_line();
            match tracker.anchor(document, line) {
                Some(anchor) => {
                    let mut annotation = Annotation::new(diagnostic);
                    annotation.attach(anchor);
                    slot.push(annotation);
                }
                None => {
                    tracing::debug!(%document, line, "no anchor for line, skipping diagnostic");
                }
            }
        }
    }

    /// Record a failed audit: the document ends with zero annotations.
    /// Stale or untracked completions are discarded exactly like results.
    pub fn apply_failed_refresh(&mut self, document: &DocumentId, generation: u64) {
        if !self.accepts(document, generation) {
            return;
        }
        self.clear_annotations(document);
    }

    /// Whether a completion for (`document`, `generation`) may be applied.
    fn accepts(&self, document: &DocumentId, generation: u64) -> bool {
        if !self.is_tracked(document) {
            tracing::debug!(%document, "audit completed for untracked document, discarding");
            return false;
        }
        let current = self.generations.get(document).copied();
        if current != Some(generation) {
            tracing::debug!(
                %document,
                generation,
                current,
                "stale audit completion, discarding"
            );
            return false;
        }
        true
    }

    /// Release every annotation for `document` before discarding them.
    fn clear_annotations(&mut self, document: &DocumentId) {
        let Some(annotations) = self.annotations.get_mut(document) else {
            tracing::debug!(%document, "nothing to clear");
            return;
        };
        for annotation in annotations.iter_mut() {
            annotation.release();
        }
        annotations.clear();
    }
}
