//! OverlayManager facade — public API consumed by the host adapter.
//!
//! The host interacts with the overlay through this single type. It owns
//! the registry, routes session and file-change events, and applies audit
//! completions. Construction IS initialization — `start()` subscribes to
//! the host notification source exactly once; there is no two-phase init.
//!
//! Serialization discipline: every registry mutation happens inside
//! `poll_events` behind `&mut self`. Hosts that need to share the manager
//! across contexts wrap it in `Arc<Mutex<…>>`; audits themselves always
//! run on the blocking pool, never on the caller's context.

use std::sync::Arc;
use std::time::Duration;

use gutter_audit::{AuditEngine, AuditError, AuditInvoker, AuditOutcome, RulesetProvider};
use gutter_types::{DocumentId, SessionId};
use tokio::sync::mpsc;

use crate::dispatch::AuditDispatcher;
use crate::host::{
    EventSink, FileWatch, HostEvent, LineTracker, SessionEventSource, SessionResolver,
};
use crate::registry::OverlayRegistry;
use crate::router::SessionRouter;

/// Channel capacity for host events and audit completions.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default number of events processed per `run_until_idle` iteration.
const IDLE_POLL_BUDGET: usize = 64;

/// Everything the overlay needs from the embedding editor.
pub struct HostCollaborators {
    pub resolver: Arc<dyn SessionResolver>,
    pub tracker: Arc<dyn LineTracker>,
    pub watch: Arc<dyn FileWatch>,
    pub engine: Arc<dyn AuditEngine>,
    pub rulesets: Arc<dyn RulesetProvider>,
}

/// Tunables supplied by the plugin configuration.
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Bound on a single audit run; expiry is reported as an execution
    /// failure and leaves the document without annotations.
    pub audit_timeout: Duration,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            audit_timeout: Duration::from_secs(10),
        }
    }
}

/// One unit of work for the manager: a host notification or a finished
/// audit coming back from the worker.
pub(crate) enum OverlayEvent {
    Host(HostEvent),
    AuditCompleted {
        document: DocumentId,
        generation: u64,
        outcome: Result<AuditOutcome, AuditError>,
    },
}

pub struct OverlayManager {
    registry: OverlayRegistry,
    router: SessionRouter,
    dispatcher: AuditDispatcher,
    tracker: Arc<dyn LineTracker>,
    event_rx: mpsc::Receiver<OverlayEvent>,
    sink: EventSink,
}

impl OverlayManager {
    /// Construct the overlay and wire it to the host notification source.
    ///
    /// Must be called from within a tokio runtime; scheduled audits run on
    /// its blocking pool.
    pub fn start(
        source: &dyn SessionEventSource,
        collaborators: HostCollaborators,
        options: OverlayOptions,
    ) -> Self {
        let (tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let sink = EventSink::new(tx);

        let dispatcher = AuditDispatcher::new(
            AuditInvoker::new(collaborators.engine),
            collaborators.rulesets,
            options.audit_timeout,
            sink.internal_tx(),
        );
        let router = SessionRouter::new(collaborators.resolver, collaborators.watch);

        tracing::info!("attaching overlay to host session notifications");
        source.subscribe(sink.clone());

        Self {
            registry: OverlayRegistry::new(),
            router,
            dispatcher,
            tracker: collaborators.tracker,
            event_rx,
            sink,
        }
    }

    /// Handle for pushing notifications into the overlay (also handed to
    /// the host source at startup).
    #[must_use]
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Drain pending events, up to `budget`. Non-blocking; returns the
    /// number of events processed.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    /// Process events until the channel is drained and no audit is in
    /// flight. Intended for tests and simple embeddings; interactive hosts
    /// call `poll_events` from their tick instead.
    pub async fn run_until_idle(&mut self) {
        loop {
            if self.poll_events(IDLE_POLL_BUDGET) > 0 {
                continue;
            }
            if !self.dispatcher.idle() {
                tokio::time::sleep(Duration::from_millis(1)).await;
                continue;
            }
            // No audit in flight means every completion has been sent;
            // one more poll drains anything that raced the check.
            if self.poll_events(IDLE_POLL_BUDGET) == 0 {
                break;
            }
        }
    }

    fn handle_event(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::Host(HostEvent::Session { kind, session }) => {
                self.router
                    .handle_session(kind, session, &mut self.registry, &self.dispatcher);
            }
            OverlayEvent::Host(HostEvent::FileChanged(document)) => {
                self.router
                    .handle_file_change(document, &mut self.registry, &self.dispatcher);
            }
            OverlayEvent::AuditCompleted {
                document,
                generation,
                outcome,
            } => match outcome {
                Ok(outcome) => {
                    for warning in outcome.warnings() {
                        tracing::info!(%document, %warning, "audit reported an internal problem");
                    }
                    self.registry.apply_refresh(
                        &document,
                        generation,
                        outcome.into_diagnostics(),
                        self.tracker.as_ref(),
                    );
                }
                Err(error) => {
                    tracing::warn!(%document, %error, "audit failed, leaving overlay empty");
                    self.registry.apply_failed_refresh(&document, generation);
                }
            },
        }
    }

    #[must_use]
    pub fn is_known(&self, session: SessionId) -> bool {
        self.registry.is_known(session)
    }

    #[must_use]
    pub fn is_tracked(&self, document: &DocumentId) -> bool {
        self.registry.is_tracked(document)
    }

    #[must_use]
    pub fn tracked_session_count(&self) -> usize {
        self.registry.tracked_session_count()
    }

    #[must_use]
    pub fn annotation_count(&self, document: &DocumentId) -> usize {
        self.registry.annotation_count(document)
    }
}
