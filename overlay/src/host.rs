//! Host collaborator boundary.
//!
//! Everything the overlay needs from the embedding editor is expressed as a
//! trait here: session lifecycle notifications, session-to-file resolution,
//! per-document file watching, and line tracking for annotation rendering.
//! The overlay never talks to a concrete UI framework.

use std::sync::Arc;

use gutter_types::{AuditDiagnostic, DocumentId, SessionId};
use tokio::sync::mpsc;

use crate::manager::OverlayEvent;

/// Kind of a session lifecycle notification.
///
/// Closed enumeration: the boundary only constructs the kinds below, so
/// dispatch is an exhaustive match with no runtime "impossible event" arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    Opened,
    Activated,
    Closed,
}

impl SessionEventKind {
    /// Map a host notification name to an event kind.
    ///
    /// Hosts normalize their framework's property names to these before
    /// pushing. Unknown names are not session events; [`EventSink`] logs
    /// and drops them.
    #[must_use]
    pub fn classify(property: &str) -> Option<Self> {
        match property {
            "opened" => Some(Self::Opened),
            "activated" => Some(Self::Activated),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// One notification delivered to the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A session lifecycle change for one editor view.
    Session {
        kind: SessionEventKind,
        session: SessionId,
    },
    /// A document currently on screen changed on disk.
    FileChanged(DocumentId),
}

/// Clonable handle the host pushes notifications through.
///
/// Pushes never block the host's dispatch context: a full channel drops the
/// event with a warning instead of stalling the editor.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<OverlayEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<OverlayEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn internal_tx(&self) -> mpsc::Sender<OverlayEvent> {
        self.tx.clone()
    }

    /// Push a session lifecycle event.
    pub fn session(&self, kind: SessionEventKind, session: SessionId) {
        self.push(HostEvent::Session { kind, session });
    }

    /// Classify a raw host notification name and push the result.
    ///
    /// Names that do not map to a session event are logged and discarded.
    pub fn raw_session(&self, property: &str, session: SessionId) {
        match SessionEventKind::classify(property) {
            Some(kind) => self.session(kind, session),
            None => {
                tracing::debug!(property, %session, "unsupported host event, discarding");
            }
        }
    }

    /// Push a file-modification notification for a tracked document.
    pub fn file_changed(&self, document: DocumentId) {
        self.push(HostEvent::FileChanged(document));
    }

    fn push(&self, event: HostEvent) {
        if self.tx.try_send(OverlayEvent::Host(event)).is_err() {
            tracing::warn!("overlay event channel full or closed; dropping host event");
        }
    }
}

/// The host's session notification source. Subscribed exactly once at
/// startup; all subsequent lifecycle notifications flow through the sink.
pub trait SessionEventSource {
    fn subscribe(&self, sink: EventSink);
}

/// Resolves sessions to the documents behind them.
pub trait SessionResolver: Send + Sync {
    /// Whether the session displays an auditable source document.
    fn is_source(&self, session: SessionId) -> bool;

    /// Canonical identity of the file behind the session. Two sessions
    /// viewing the same file must resolve to equal identities.
    fn document_for(&self, session: SessionId) -> Option<DocumentId>;
}

/// Per-document file-modification subscriptions.
///
/// The overlay watches a document while at least one session displays it
/// and unwatches when the last one closes.
pub trait FileWatch: Send + Sync {
    fn watch(&self, document: &DocumentId);
    fn unwatch(&self, document: &DocumentId);
}

/// A host-rendered marker slot on one line of one document.
pub trait LineAnchor: Send + Sync {
    /// Render the marker for `diagnostic` on this line.
    fn show(&self, diagnostic: &AuditDiagnostic);

    /// Remove the marker.
    fn clear(&self);
}

/// The host's line-tracking space for open documents.
pub trait LineTracker: Send + Sync {
    /// Whether `document` has a materialized line space. Virtual or
    /// non-materialized files do not, and get no annotations.
    fn has_line_space(&self, document: &DocumentId) -> bool;

    /// Anchor for a 1-based line, or `None` when the line cannot be
    /// resolved. Implementations are expected to clamp past-the-end lines
    /// to the last line rather than fail.
    fn anchor(&self, document: &DocumentId, line: u32) -> Option<Arc<dyn LineAnchor>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_names() {
        assert_eq!(
            SessionEventKind::classify("opened"),
            Some(SessionEventKind::Opened)
        );
        assert_eq!(
            SessionEventKind::classify("activated"),
            Some(SessionEventKind::Activated)
        );
        assert_eq!(
            SessionEventKind::classify("closed"),
            Some(SessionEventKind::Closed)
        );
    }

    #[test]
    fn classify_unknown_name_is_none() {
        assert_eq!(SessionEventKind::classify("iconified"), None);
        assert_eq!(SessionEventKind::classify(""), None);
    }
}
