//! Diagnostic overlay lifecycle manager.
//!
//! Keeps static-analysis markers on open editor views in lockstep with the
//! host's session lifecycle: opening a source view audits the file and
//! attaches one annotation per finding, file changes re-audit in place,
//! and closing the last view of a file tears every marker down. No stale
//! annotations, no double-registered sessions, and no failure mode worse
//! than "no markers for this document".

pub mod host;

mod annotation;
mod dispatch;
mod manager;
mod registry;
mod router;

pub use annotation::Annotation;
pub use host::{EventSink, HostEvent, SessionEventKind};
pub use manager::{HostCollaborators, OverlayManager, OverlayOptions};
pub use registry::{CloseOutcome, OverlayRegistry};
