//! Session event routing — classify, filter, dispatch.
//!
//! The router turns host notifications into registry operations. Opened and
//! activated are handled identically; both are filtered so that sessions
//! without a source document and sessions that are already tracked never
//! reach the registry. In particular, re-activating a tracked session does
//! NOT re-run the audit — only an explicit file change or a fresh open does.

use std::sync::Arc;

use gutter_types::{DocumentId, SessionId};

use crate::dispatch::AuditDispatcher;
use crate::host::{FileWatch, SessionEventKind, SessionResolver};
use crate::registry::{CloseOutcome, OverlayRegistry};

pub(crate) struct SessionRouter {
    resolver: Arc<dyn SessionResolver>,
    watch: Arc<dyn FileWatch>,
}

impl SessionRouter {
    pub fn new(resolver: Arc<dyn SessionResolver>, watch: Arc<dyn FileWatch>) -> Self {
        Self { resolver, watch }
    }

    pub fn handle_session(
        &self,
        kind: SessionEventKind,
        session: SessionId,
        registry: &mut OverlayRegistry,
        dispatcher: &AuditDispatcher,
    ) {
        match kind {
            SessionEventKind::Opened | SessionEventKind::Activated => {
                self.hook_up(session, registry, dispatcher);
            }
            SessionEventKind::Closed => {
                self.release(session, registry);
            }
        }
    }

    /// File-change notifications re-audit in place: no session-open
    /// semantics, and documents nobody displays anymore are skipped.
    pub fn handle_file_change(
        &self,
        document: DocumentId,
        registry: &mut OverlayRegistry,
        dispatcher: &AuditDispatcher,
    ) {
        if let Some(generation) = registry.begin_refresh(&document) {
            dispatcher.schedule(document, generation);
        }
    }

    fn hook_up(
        &self,
        session: SessionId,
        registry: &mut OverlayRegistry,
        dispatcher: &AuditDispatcher,
    ) {
        if !self.resolver.is_source(session) {
            tracing::debug!(%session, "hook up not applicable, session has no source document");
            return;
        }
        if registry.is_known(session) {
            tracing::debug!(%session, "session already tracked, not re-auditing");
            return;
        }
        let Some(document) = self.resolver.document_for(session) else {
            tracing::warn!(%session, "source session did not resolve to a document");
            return;
        };

        let newly_tracked = !registry.is_tracked(&document);
        registry.open(session, document.clone());
        if newly_tracked {
            self.watch.watch(&document);
        }
        if let Some(generation) = registry.begin_refresh(&document) {
            dispatcher.schedule(document, generation);
        }
    }

    fn release(&self, session: SessionId, registry: &mut OverlayRegistry) {
        if !self.resolver.is_source(session) && !registry.is_known(session) {
            tracing::debug!(%session, "release not applicable");
            return;
        }
        match registry.close(session) {
            CloseOutcome::LastClosed(document) => self.watch.unwatch(&document),
            CloseOutcome::Remaining(_) | CloseOutcome::Untracked => {}
        }
    }
}
