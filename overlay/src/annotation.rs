//! Annotation handle — one diagnostic bound to one line of one document.

use std::fmt;
use std::sync::Arc;

use gutter_types::AuditDiagnostic;

use crate::host::LineAnchor;

/// An attachable overlay marker wrapping one audit finding.
///
/// States: detached (initial) → attached → detached (after release).
/// Attach happens at most once; release is idempotent. Dropping an
/// annotation releases it, so no removal path — including error paths
/// during a refresh — can leak a visible marker in the editor.
pub struct Annotation {
    diagnostic: AuditDiagnostic,
    anchor: Option<Arc<dyn LineAnchor>>,
}

impl Annotation {
    #[must_use]
    pub fn new(diagnostic: AuditDiagnostic) -> Self {
        Self {
            diagnostic,
            anchor: None,
        }
    }

    #[must_use]
    pub fn diagnostic(&self) -> &AuditDiagnostic {
        &self.diagnostic
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.anchor.is_some()
    }

    /// Bind to a line and render the marker. A second attach on an
    /// already-attached handle is a logged no-op.
    pub fn attach(&mut self, anchor: Arc<dyn LineAnchor>) {
        if self.anchor.is_some() {
            tracing::debug!(
                line = self.diagnostic.display_line(),
                "annotation already attached, ignoring re-attach"
            );
            return;
        }
        anchor.show(&self.diagnostic);
        self.anchor = Some(anchor);
    }

    /// Remove the marker. No-op when already detached.
    pub fn release(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            anchor.clear();
        }
    }
}

impl Drop for Annotation {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotation")
            .field("diagnostic", &self.diagnostic)
            .field("attached", &self.anchor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gutter_types::AuditSeverity;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAnchor {
        shows: AtomicUsize,
        clears: AtomicUsize,
    }

    impl LineAnchor for CountingAnchor {
        fn show(&self, _diagnostic: &AuditDiagnostic) {
            self.shows.fetch_add(1, Ordering::SeqCst);
        }

        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn make_annotation() -> Annotation {
        Annotation::new(AuditDiagnostic::new(
            AuditSeverity::Warning,
            "unused import".to_string(),
            4,
        ))
    }

    #[test]
    fn starts_detached() {
        let annotation = make_annotation();
        assert!(!annotation.is_attached());
    }

    #[test]
    fn attach_shows_marker_once() {
        let anchor = Arc::new(CountingAnchor::default());
        let mut annotation = make_annotation();

        annotation.attach(anchor.clone());
        assert!(annotation.is_attached());
        assert_eq!(anchor.shows.load(Ordering::SeqCst), 1);

        // Re-attach is a no-op, even with a different anchor.
        annotation.attach(Arc::new(CountingAnchor::default()));
        assert_eq!(anchor.shows.load(Ordering::SeqCst), 1);
        assert!(annotation.is_attached());
    }

    #[test]
    fn release_clears_marker_and_is_idempotent() {
        let anchor = Arc::new(CountingAnchor::default());
        let mut annotation = make_annotation();
        annotation.attach(anchor.clone());

        annotation.release();
        assert!(!annotation.is_attached());
        assert_eq!(anchor.clears.load(Ordering::SeqCst), 1);

        annotation.release();
        assert_eq!(anchor.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_on_detached_handle_is_a_noop() {
        let mut annotation = make_annotation();
        annotation.release();
        assert!(!annotation.is_attached());
    }

    #[test]
    fn drop_releases_attached_handle() {
        let anchor = Arc::new(CountingAnchor::default());
        {
            let mut annotation = make_annotation();
            annotation.attach(anchor.clone());
        }
        assert_eq!(anchor.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_after_release_does_not_double_clear() {
        let anchor = Arc::new(CountingAnchor::default());
        {
            let mut annotation = make_annotation();
            annotation.attach(anchor.clone());
            annotation.release();
        }
        assert_eq!(anchor.clears.load(Ordering::SeqCst), 1);
    }
}
