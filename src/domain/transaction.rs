use crate::domain::card::CardId;
use crate::domain::machine::MachineId;
use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Withdrawal,
    Deposit,
    Transfer,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Transfer => "TRANSFER",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// One row of the append-only money-movement history.
///
/// Written once per attempt that reached risk-bearing validation and never
/// mutated afterwards. FAILED rows exist so rejected withdrawals stay
/// auditable; the daily-limit check sums only COMPLETED withdrawals.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub card_id: CardId,
    pub machine_id: MachineId,
    pub kind: TransactionType,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl TransactionRecord {
    pub fn new(
        card_id: CardId,
        machine_id: MachineId,
        kind: TransactionType,
        amount: Amount,
        status: TransactionStatus,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            machine_id,
            kind,
            amount,
            status,
            created_at: Utc::now(),
            description,
        }
    }
}
