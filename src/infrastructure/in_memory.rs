use crate::domain::account::{Account, AccountId};
use crate::domain::audit::AuditEvent;
use crate::domain::card::{Card, CardId};
use crate::domain::machine::{Machine, MachineId};
use crate::domain::ports::{
    AccountStore, AuditSink, CardStore, MachineStore, SessionStore, TransactionLog,
};
use crate::domain::session::{Session, SessionId};
use crate::domain::transaction::{TransactionRecord, TransactionStatus, TransactionType};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory card store.
///
/// Uses `Arc<RwLock<HashMap<..>>>` for shared concurrent access. Lookup by
/// card number scans; the data sets here are terminal-scale, not bank-scale.
#[derive(Default, Clone)]
pub struct InMemoryCardStore {
    cards: Arc<RwLock<HashMap<CardId, Card>>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn get(&self, id: CardId) -> Result<Option<Card>> {
        let cards = self.cards.read().await;
        Ok(cards.get(&id).cloned())
    }

    async fn get_by_number(&self, card_number: &str) -> Result<Option<Card>> {
        let cards = self.cards.read().await;
        Ok(cards
            .values()
            .find(|card| card.card_number == card_number)
            .cloned())
    }

    async fn get_by_account(&self, account_id: AccountId) -> Result<Option<Card>> {
        let cards = self.cards.read().await;
        Ok(cards
            .values()
            .find(|card| card.account_id == account_id)
            .cloned())
    }

    async fn store(&self, card: Card) -> Result<()> {
        let mut cards = self.cards.write().await;
        cards.insert(card.id, card);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn get_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| account.account_number == account_number)
            .cloned())
    }

    async fn store(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by_key(|account| account.id);
        Ok(all)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMachineStore {
    machines: Arc<RwLock<HashMap<MachineId, Machine>>>,
}

impl InMemoryMachineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MachineStore for InMemoryMachineStore {
    async fn get(&self, id: MachineId) -> Result<Option<Machine>> {
        let machines = self.machines.read().await;
        Ok(machines.get(&id).cloned())
    }

    async fn store(&self, machine: Machine) -> Result<()> {
        let mut machines = self.machines.write().await;
        machines.insert(machine.id, machine);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn active_for_card(&self, card_id: CardId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|session| session.card_id == card_id && session.active)
            .cloned())
    }

    async fn active(&self) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|session| session.active)
            .cloned()
            .collect())
    }

    async fn store(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session);
        Ok(())
    }
}

/// Append-only in-memory transaction history, newest last.
#[derive(Default, Clone)]
pub struct InMemoryTransactionLog {
    records: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn append(&self, record: TransactionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn recent_for_card(
        &self,
        card_id: CardId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|record| record.card_id == card_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recent_completed_for_card(
        &self,
        card_id: CardId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|record| {
                record.card_id == card_id && record.status == TransactionStatus::Completed
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn completed_withdrawals_on(&self, card_id: CardId, day: NaiveDate) -> Result<Decimal> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| {
                record.card_id == card_id
                    && record.kind == TransactionType::Withdrawal
                    && record.status == TransactionStatus::Completed
                    && record.created_at.date_naive() == day
            })
            .map(|record| record.amount.value())
            .sum())
    }
}

/// Collects audit events in memory; tests use `events()` to assert on them.
#[derive(Default, Clone)]
pub struct InMemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn emit(&self, event: AuditEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }
}
