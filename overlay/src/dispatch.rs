//! Background audit dispatch.
//!
//! Audits are slow (full file parse plus rule evaluation) and must never
//! run on the host's notification context. Each scheduled audit runs the
//! synchronous invoker on the blocking pool under a deadline; the outcome
//! comes back to the manager as an event, where it is applied under the
//! same serialized context as every other registry mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gutter_audit::{AuditError, AuditInvoker, RulesetProvider};
use gutter_types::DocumentId;
use tokio::sync::mpsc;

use crate::manager::OverlayEvent;

pub(crate) struct AuditDispatcher {
    invoker: Arc<AuditInvoker>,
    rulesets: Arc<dyn RulesetProvider>,
    timeout: Duration,
    tx: mpsc::Sender<OverlayEvent>,
    in_flight: Arc<AtomicUsize>,
}

impl AuditDispatcher {
    pub fn new(
        invoker: AuditInvoker,
        rulesets: Arc<dyn RulesetProvider>,
        timeout: Duration,
        tx: mpsc::Sender<OverlayEvent>,
    ) -> Self {
        Self {
            invoker: Arc::new(invoker),
            rulesets,
            timeout,
            tx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whether no scheduled audit is still running or undelivered.
    pub fn idle(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Run one audit in the background and deliver the outcome as an
    /// [`OverlayEvent::AuditCompleted`] stamped with `generation`.
    pub fn schedule(&self, document: DocumentId, generation: u64) {
        let invoker = self.invoker.clone();
        let rulesets = self.rulesets.clone();
        let timeout = self.timeout;
        let tx = self.tx.clone();
        let in_flight = self.in_flight.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let path = document.path().to_path_buf();
            let work = tokio::task::spawn_blocking(move || {
                // Re-read the ruleset every run; edits apply on the next audit.
                let source = rulesets.current_source();
                invoker.run(&path, source.as_ref())
            });

            let outcome = match tokio::time::timeout(timeout, work).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => Err(AuditError::Execution {
                    reason: format!("audit task failed: {join_error}"),
                }),
                Err(_) => Err(AuditError::Execution {
                    reason: format!("audit timed out after {timeout:?}"),
                }),
            };

            let _ = tx
                .send(OverlayEvent::AuditCompleted {
                    document,
                    generation,
                    outcome,
                })
                .await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }
}
