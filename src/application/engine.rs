use crate::application::inventory::CashInventory;
use crate::application::ledger::AccountLedger;
use crate::domain::account::AccountId;
use crate::domain::card::{CardId, CardStatus};
use crate::domain::machine::{MachineId, NoteBundle};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{AccountStoreRef, CardStoreRef, MachineStoreRef, TransactionLogRef};
use crate::domain::transaction::{TransactionRecord, TransactionStatus, TransactionType};
use crate::error::{AtmError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// What the deposit slot accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositReceipt {
    pub amount: Amount,
    pub notes: NoteBundle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub from: String,
    pub to: String,
    pub amount: Amount,
}

/// Orchestrates the three money-movement protocols against the ledger and
/// the cash inventory, and appends the transaction history.
///
/// A withdrawal that fails after the account was debited rolls the debit
/// back before returning, so the ledger and the drawer never disagree with
/// the reported outcome. Every rejection past basic input validation is
/// recorded as a FAILED row for auditability.
pub struct TransactionEngine {
    cards: CardStoreRef,
    accounts: AccountStoreRef,
    machines: MachineStoreRef,
    ledger: Arc<AccountLedger>,
    inventory: Arc<CashInventory>,
    log: TransactionLogRef,
}

impl TransactionEngine {
    pub fn new(
        cards: CardStoreRef,
        accounts: AccountStoreRef,
        machines: MachineStoreRef,
        ledger: Arc<AccountLedger>,
        inventory: Arc<CashInventory>,
        log: TransactionLogRef,
    ) -> Self {
        Self {
            cards,
            accounts,
            machines,
            ledger,
            inventory,
            log,
        }
    }

    /// Withdraws cash: validate, enforce the daily limit, debit the
    /// account, then allocate notes. Returns the denomination breakdown.
    pub async fn withdraw(
        &self,
        card_id: CardId,
        account_id: AccountId,
        machine_id: MachineId,
        amount: Decimal,
    ) -> Result<BTreeMap<u32, u32>> {
        // Client-input error: no record is written for this one.
        let amount = Amount::new(amount)?;

        if !self.machine_online(machine_id).await? {
            self.record_failure(card_id, machine_id, TransactionType::Withdrawal, amount)
                .await?;
            return Err(AtmError::MachineOffline);
        }

        let card = self
            .cards
            .get(card_id)
            .await?
            .filter(|c| c.status == CardStatus::Active && c.account_id == account_id);
        let Some(card) = card else {
            self.record_failure(card_id, machine_id, TransactionType::Withdrawal, amount)
                .await?;
            return Err(AtmError::CardInvalid);
        };

        let today = Utc::now().date_naive();
        let withdrawn_today = self.log.completed_withdrawals_on(card_id, today).await?;
        if withdrawn_today + amount.value() > card.daily_withdraw_limit.value() {
            self.record_failure(card_id, machine_id, TransactionType::Withdrawal, amount)
                .await?;
            return Err(AtmError::DailyLimitExceeded);
        }

        if let Err(err) = self.ledger.debit(account_id, amount).await {
            self.record_failure(card_id, machine_id, TransactionType::Withdrawal, amount)
                .await?;
            return Err(err);
        }

        match self.inventory.reserve_and_allocate(machine_id, amount).await {
            Ok(plan) => {
                self.log
                    .append(TransactionRecord::new(
                        card_id,
                        machine_id,
                        TransactionType::Withdrawal,
                        amount,
                        TransactionStatus::Completed,
                        None,
                    ))
                    .await?;
                info!(card = %card_id, machine = %machine_id, %amount, "withdrawal completed");
                Ok(plan)
            }
            Err(err) => {
                // The cash never left the drawer, so the debit must not
                // stand either.
                self.ledger.credit(account_id, amount).await?;
                self.record_failure(card_id, machine_id, TransactionType::Withdrawal, amount)
                    .await?;
                Err(err)
            }
        }
    }

    /// Deposits a note bundle: credit the account, load the drawer. Both
    /// take effect or neither does.
    pub async fn deposit(
        &self,
        card_id: CardId,
        account_id: AccountId,
        machine_id: MachineId,
        notes: NoteBundle,
    ) -> Result<DepositReceipt> {
        if notes.is_empty() {
            return Err(AtmError::NoCashInserted);
        }
        if notes.iter().any(|(_, count)| count == 0) {
            return Err(AtmError::InvalidNoteCount);
        }
        let amount = Amount::new(notes.total())?;

        if !self.machine_online(machine_id).await? {
            return Err(AtmError::MachineOffline);
        }

        let paired = self
            .cards
            .get(card_id)
            .await?
            .is_some_and(|c| c.account_id == account_id);
        if !paired {
            return Err(AtmError::CardInvalid);
        }

        self.ledger.credit(account_id, amount).await?;
        if let Err(err) = self.inventory.replenish(machine_id, &notes).await {
            // Drawer rejected the bundle: take the credit back so nothing
            // applied.
            self.ledger.debit(account_id, amount).await?;
            return Err(err);
        }

        self.log
            .append(TransactionRecord::new(
                card_id,
                machine_id,
                TransactionType::Deposit,
                amount,
                TransactionStatus::Completed,
                None,
            ))
            .await?;
        info!(card = %card_id, machine = %machine_id, %amount, "deposit completed");
        Ok(DepositReceipt { amount, notes })
    }

    /// Moves money between two accounts, attributed to the sender's card.
    /// No cash inventory is involved.
    pub async fn transfer(
        &self,
        from_account_number: &str,
        to_account_number: &str,
        machine_id: MachineId,
        amount: Decimal,
    ) -> Result<TransferReceipt> {
        let amount = Amount::new(amount)?;
        if from_account_number == to_account_number {
            return Err(AtmError::SameAccount);
        }

        let sender = self
            .accounts
            .get_by_number(from_account_number)
            .await?
            .ok_or(AtmError::SenderNotFound)?;
        let sender_card = self
            .cards
            .get_by_account(sender.id)
            .await?
            .ok_or(AtmError::SenderNotFound)?;
        let receiver = self
            .accounts
            .get_by_number(to_account_number)
            .await?
            .ok_or(AtmError::ReceiverNotFound)?;

        self.ledger.transfer(sender.id, receiver.id, amount).await?;

        self.log
            .append(TransactionRecord::new(
                sender_card.id,
                machine_id,
                TransactionType::Transfer,
                amount,
                TransactionStatus::Completed,
                Some(format!("{from_account_number} → {to_account_number}")),
            ))
            .await?;
        info!(
            from = from_account_number,
            to = to_account_number,
            %amount,
            "transfer completed"
        );
        Ok(TransferReceipt {
            from: from_account_number.to_string(),
            to: to_account_number.to_string(),
            amount,
        })
    }

    /// Bounded most-recent-first view of the card's completed transactions.
    pub async fn mini_statement(
        &self,
        card_id: CardId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        self.log.recent_completed_for_card(card_id, limit).await
    }

    /// Like the mini statement but including FAILED attempts.
    pub async fn recent_activity(
        &self,
        card_id: CardId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        self.log.recent_for_card(card_id, limit).await
    }

    pub async fn balance(&self, account_id: AccountId) -> Result<Balance> {
        self.ledger.balance(account_id).await
    }

    pub async fn daily_limit(&self, card_id: CardId) -> Result<Amount> {
        let card = self
            .cards
            .get(card_id)
            .await?
            .ok_or(AtmError::CardNotFound)?;
        Ok(card.daily_withdraw_limit)
    }

    async fn machine_online(&self, machine_id: MachineId) -> Result<bool> {
        Ok(self
            .machines
            .get(machine_id)
            .await?
            .is_some_and(|machine| machine.online))
    }

    async fn record_failure(
        &self,
        card_id: CardId,
        machine_id: MachineId,
        kind: TransactionType,
        amount: Amount,
    ) -> Result<()> {
        self.log
            .append(TransactionRecord::new(
                card_id,
                machine_id,
                kind,
                amount,
                TransactionStatus::Failed,
                None,
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Account;
    use crate::domain::card::Card;
    use crate::domain::machine::Machine;
    use crate::domain::ports::{AccountStore, CardStore, MachineStore};
    use crate::infrastructure::in_memory::{
        InMemoryAccountStore, InMemoryCardStore, InMemoryMachineStore, InMemoryTransactionLog,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    async fn engine() -> TransactionEngine {
        let cards = Arc::new(InMemoryCardStore::new());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let machines = Arc::new(InMemoryMachineStore::new());
        let log = Arc::new(InMemoryTransactionLog::new());

        accounts
            .store(Account::new(
                AccountId(1),
                "ACC-1001",
                Balance::new(dec!(5000)),
            ))
            .await
            .unwrap();
        accounts
            .store(Account::new(
                AccountId(2),
                "ACC-1002",
                Balance::new(dec!(1000)),
            ))
            .await
            .unwrap();
        cards
            .store(Card::new(
                CardId(1),
                "4000-0000-0000-0001",
                AccountId(1),
                "1234",
                NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
                dec!(20000).try_into().unwrap(),
            ))
            .await
            .unwrap();
        machines
            .store(Machine::new(
                MachineId(1),
                NoteBundle::with([(2000, 10), (500, 20), (100, 50)]),
            ))
            .await
            .unwrap();

        TransactionEngine::new(
            cards,
            accounts.clone(),
            machines.clone(),
            Arc::new(AccountLedger::new(accounts)),
            Arc::new(CashInventory::new(machines)),
            log,
        )
    }

    #[tokio::test]
    async fn test_withdraw_happy_path() {
        let engine = engine().await;

        let plan = engine
            .withdraw(CardId(1), AccountId(1), MachineId(1), dec!(2500))
            .await
            .unwrap();
        assert_eq!(plan, BTreeMap::from([(2000, 1), (500, 1)]));

        assert_eq!(
            engine.balance(AccountId(1)).await.unwrap(),
            Balance::new(dec!(2500))
        );

        let records = engine.mini_statement(CardId(1), 5).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, TransactionType::Withdrawal);
        assert_eq!(records[0].status, TransactionStatus::Completed);
    }

    #[tokio::test]
    async fn test_withdraw_invalid_amount_writes_no_record() {
        let engine = engine().await;

        let err = engine
            .withdraw(CardId(1), AccountId(1), MachineId(1), dec!(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AtmError::InvalidAmount));

        assert!(engine.recent_activity(CardId(1), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_card_account_mismatch() {
        let engine = engine().await;

        let err = engine
            .withdraw(CardId(1), AccountId(2), MachineId(1), dec!(500))
            .await
            .unwrap_err();
        assert!(matches!(err, AtmError::CardInvalid));

        let records = engine.recent_activity(CardId(1), 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_withdraw_rollback_on_cash_failure() {
        let engine = engine().await;

        // 4950 is not a multiple of the smallest note: the allocation is
        // rejected after the debit, which must then be undone.
        let err = engine
            .withdraw(CardId(1), AccountId(1), MachineId(1), dec!(4950))
            .await
            .unwrap_err();
        assert!(matches!(err, AtmError::AmountNotDispensable { multiple: 100 }));

        assert_eq!(
            engine.balance(AccountId(1)).await.unwrap(),
            Balance::new(dec!(5000))
        );
        let records = engine.recent_activity(CardId(1), 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_deposit_credits_and_replenishes() {
        let engine = engine().await;

        let receipt = engine
            .deposit(
                CardId(1),
                AccountId(1),
                MachineId(1),
                NoteBundle::with([(500, 2), (100, 3)]),
            )
            .await
            .unwrap();
        assert_eq!(receipt.amount.value(), dec!(1300));

        assert_eq!(
            engine.balance(AccountId(1)).await.unwrap(),
            Balance::new(dec!(6300))
        );
    }

    #[tokio::test]
    async fn test_deposit_validation() {
        let engine = engine().await;

        let err = engine
            .deposit(CardId(1), AccountId(1), MachineId(1), NoteBundle::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AtmError::NoCashInserted));

        let err = engine
            .deposit(
                CardId(1),
                AccountId(1),
                MachineId(1),
                NoteBundle::with([(500, 0)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AtmError::InvalidNoteCount));
    }

    #[tokio::test]
    async fn test_transfer_records_counterparties() {
        let engine = engine().await;

        let receipt = engine
            .transfer("ACC-1001", "ACC-1002", MachineId(1), dec!(750))
            .await
            .unwrap();
        assert_eq!(receipt.amount.value(), dec!(750));

        assert_eq!(
            engine.balance(AccountId(1)).await.unwrap(),
            Balance::new(dec!(4250))
        );
        assert_eq!(
            engine.balance(AccountId(2)).await.unwrap(),
            Balance::new(dec!(1750))
        );

        let records = engine.mini_statement(CardId(1), 5).await.unwrap();
        assert_eq!(records[0].kind, TransactionType::Transfer);
        assert_eq!(
            records[0].description.as_deref(),
            Some("ACC-1001 → ACC-1002")
        );
    }

    #[tokio::test]
    async fn test_transfer_rejects_same_and_unknown_accounts() {
        let engine = engine().await;

        assert!(matches!(
            engine
                .transfer("ACC-1001", "ACC-1001", MachineId(1), dec!(10))
                .await,
            Err(AtmError::SameAccount)
        ));
        assert!(matches!(
            engine
                .transfer("ACC-9999", "ACC-1002", MachineId(1), dec!(10))
                .await,
            Err(AtmError::SenderNotFound)
        ));
        assert!(matches!(
            engine
                .transfer("ACC-1001", "ACC-9999", MachineId(1), dec!(10))
                .await,
            Err(AtmError::ReceiverNotFound)
        ));
    }

    #[tokio::test]
    async fn test_daily_limit_query() {
        let engine = engine().await;
        assert_eq!(
            engine.daily_limit(CardId(1)).await.unwrap().value(),
            dec!(20000)
        );
        assert!(matches!(
            engine.daily_limit(CardId(9)).await,
            Err(AtmError::CardNotFound)
        ));
    }
}
