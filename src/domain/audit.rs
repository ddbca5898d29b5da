use crate::domain::card::CardId;
use crate::domain::machine::MachineId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Activity {
    Login,
    Logout,
    PinChange,
    CardBlock,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Failed,
}

/// The event contract for security-relevant actions.
///
/// Delivery is fire-and-forget: a sink failure is logged and swallowed,
/// never failing the operation that produced the event.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AuditEvent {
    pub card_id: CardId,
    pub machine_id: MachineId,
    pub activity: Activity,
    pub details: serde_json::Value,
    pub outcome: AuditOutcome,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        card_id: CardId,
        machine_id: MachineId,
        activity: Activity,
        details: serde_json::Value,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            card_id,
            machine_id,
            activity,
            details,
            outcome,
            at: Utc::now(),
        }
    }
}
