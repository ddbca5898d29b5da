//! Application layer: the components that orchestrate domain state.
//!
//! `CardAuthenticator`, `SessionManager`, `AccountLedger`, `CashInventory`
//! and `TransactionEngine` each own one concern and serialize access to it
//! through keyed entity locks, so concurrent terminals interleave safely.

pub mod authenticator;
pub mod engine;
pub mod inventory;
pub mod ledger;
pub mod locks;
pub mod sessions;

use crate::domain::audit::AuditEvent;
use crate::domain::ports::AuditSinkRef;

/// Audit delivery is fire-and-forget; a sink failure must never fail the
/// operation that produced the event.
pub(crate) async fn emit_audit(sink: &AuditSinkRef, event: AuditEvent) {
    if let Err(err) = sink.emit(event).await {
        tracing::warn!(error = %err, "failed to emit audit event");
    }
}
