use cashpoint::application::authenticator::{AuthPolicy, CardAuthenticator};
use cashpoint::application::engine::TransactionEngine;
use cashpoint::application::inventory::CashInventory;
use cashpoint::application::ledger::AccountLedger;
use cashpoint::application::locks::EntityLocks;
use cashpoint::application::sessions::{SessionManager, SessionPolicy};
use cashpoint::domain::account::{Account, AccountId};
use cashpoint::domain::card::{Card, CardId};
use cashpoint::domain::machine::{Machine, MachineId, NoteBundle};
use cashpoint::domain::money::Balance;
use cashpoint::domain::ports::{AccountStore, CardStore, MachineStore};
use cashpoint::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryAuditSink, InMemoryCardStore, InMemoryMachineStore,
    InMemorySessionStore, InMemoryTransactionLog,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Everything wired against shared in-memory stores, the way a terminal
/// process would assemble it.
pub struct TestBank {
    pub authenticator: CardAuthenticator,
    pub sessions: SessionManager,
    pub engine: TransactionEngine,
    pub cards: Arc<InMemoryCardStore>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub machines: Arc<InMemoryMachineStore>,
    pub log: Arc<InMemoryTransactionLog>,
    pub audit: Arc<InMemoryAuditSink>,
    pub ledger: Arc<AccountLedger>,
    pub inventory: Arc<CashInventory>,
}

/// Two accounts with one card each, one stocked machine.
///
/// Card 1 ("4000-0000-0000-0001", PIN 1234) → account 1 (ACC-1001, 5000).
/// Card 2 ("4000-0000-0000-0002", PIN 5678) → account 2 (ACC-1002, 1000).
/// Machine 1: {2000:10, 500:20, 100:50}, online.
pub async fn bank() -> TestBank {
    let cards = Arc::new(InMemoryCardStore::new());
    let accounts = Arc::new(InMemoryAccountStore::new());
    let machines = Arc::new(InMemoryMachineStore::new());
    let session_store = Arc::new(InMemorySessionStore::new());
    let log = Arc::new(InMemoryTransactionLog::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let card_locks = Arc::new(EntityLocks::new());

    seed_account(&accounts, 1, "ACC-1001", dec!(5000)).await;
    seed_account(&accounts, 2, "ACC-1002", dec!(1000)).await;
    seed_card(&cards, 1, "4000-0000-0000-0001", 1, "1234", dec!(20000)).await;
    seed_card(&cards, 2, "4000-0000-0000-0002", 2, "5678", dec!(20000)).await;
    machines
        .store(Machine::new(
            MachineId(1),
            NoteBundle::with([(2000, 10), (500, 20), (100, 50)]),
        ))
        .await
        .unwrap();

    let ledger = Arc::new(AccountLedger::new(accounts.clone()));
    let inventory = Arc::new(CashInventory::new(machines.clone()));

    let authenticator = CardAuthenticator::new(
        cards.clone(),
        accounts.clone(),
        session_store.clone(),
        audit.clone(),
        card_locks.clone(),
        AuthPolicy::default(),
    );
    let sessions = SessionManager::new(
        session_store.clone(),
        cards.clone(),
        audit.clone(),
        card_locks,
        SessionPolicy::default(),
    );
    let engine = TransactionEngine::new(
        cards.clone(),
        accounts.clone(),
        machines.clone(),
        ledger.clone(),
        inventory.clone(),
        log.clone(),
    );

    TestBank {
        authenticator,
        sessions,
        engine,
        cards,
        accounts,
        machines,
        log,
        audit,
        ledger,
        inventory,
    }
}

pub async fn seed_account(
    store: &Arc<InMemoryAccountStore>,
    id: u32,
    number: &str,
    balance: Decimal,
) {
    store
        .store(Account::new(AccountId(id), number, Balance::new(balance)))
        .await
        .unwrap();
}

pub async fn seed_card(
    store: &Arc<InMemoryCardStore>,
    id: u32,
    number: &str,
    account: u32,
    pin: &str,
    daily_limit: Decimal,
) {
    store
        .store(Card::new(
            CardId(id),
            number,
            AccountId(account),
            pin,
            NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
            daily_limit.try_into().unwrap(),
        ))
        .await
        .unwrap();
}

/// Asserts the machine's aggregate cash balance equals the denomination sum.
pub async fn assert_cash_invariant(bank: &TestBank, machine: MachineId) {
    let position = bank.inventory.cash_position(machine).await.unwrap();
    assert_eq!(
        position.total.0,
        position.notes.total(),
        "cash balance must equal the denomination sum"
    );
}
