//! Core domain types for Gutter.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the overlay.

mod diagnostic;
mod ids;

pub use diagnostic::{AuditDiagnostic, AuditSeverity};
pub use ids::{DocumentId, SessionId};
