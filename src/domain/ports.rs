use crate::domain::account::{Account, AccountId};
use crate::domain::audit::AuditEvent;
use crate::domain::card::{Card, CardId};
use crate::domain::machine::{Machine, MachineId};
use crate::domain::session::{Session, SessionId};
use crate::domain::transaction::TransactionRecord;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn get(&self, id: CardId) -> Result<Option<Card>>;
    async fn get_by_number(&self, card_number: &str) -> Result<Option<Card>>;
    async fn get_by_account(&self, account_id: AccountId) -> Result<Option<Card>>;
    async fn store(&self, card: Card) -> Result<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, id: AccountId) -> Result<Option<Account>>;
    async fn get_by_number(&self, account_number: &str) -> Result<Option<Account>>;
    async fn store(&self, account: Account) -> Result<()>;
    async fn all(&self) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait MachineStore: Send + Sync {
    async fn get(&self, id: MachineId) -> Result<Option<Machine>>;
    async fn store(&self, machine: Machine) -> Result<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: SessionId) -> Result<Option<Session>>;
    async fn active_for_card(&self, card_id: CardId) -> Result<Option<Session>>;
    async fn active(&self) -> Result<Vec<Session>>;
    async fn store(&self, session: Session) -> Result<()>;
}

/// Append-only history of money movement.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, record: TransactionRecord) -> Result<()>;
    /// Most-recent-first, any status.
    async fn recent_for_card(
        &self,
        card_id: CardId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>>;
    /// Most-recent-first, COMPLETED only.
    async fn recent_completed_for_card(
        &self,
        card_id: CardId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>>;
    /// Sum of COMPLETED withdrawal amounts for the card on the given day.
    async fn completed_withdrawals_on(&self, card_id: CardId, day: NaiveDate) -> Result<Decimal>;
}

/// Receives security-relevant events. Implementations decide persistence;
/// callers treat emission as best-effort.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit(&self, event: AuditEvent) -> Result<()>;
}

pub type CardStoreRef = Arc<dyn CardStore>;
pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type MachineStoreRef = Arc<dyn MachineStore>;
pub type SessionStoreRef = Arc<dyn SessionStore>;
pub type TransactionLogRef = Arc<dyn TransactionLog>;
pub type AuditSinkRef = Arc<dyn AuditSink>;
