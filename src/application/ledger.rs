use crate::application::locks::EntityLocks;
use crate::domain::account::AccountId;
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::AccountStoreRef;
use crate::error::{AtmError, Result};

/// Owns every balance mutation.
///
/// Each debit/credit is a read-modify-write under the account's lock, so
/// two concurrent debits can never both observe the same pre-mutation
/// balance. A transfer takes both endpoints' locks in ascending-id order;
/// two opposite-direction transfers between the same pair therefore chase
/// the same first lock instead of deadlocking.
pub struct AccountLedger {
    accounts: AccountStoreRef,
    locks: EntityLocks<AccountId>,
}

impl AccountLedger {
    pub fn new(accounts: AccountStoreRef) -> Self {
        Self {
            accounts,
            locks: EntityLocks::new(),
        }
    }

    pub async fn balance(&self, id: AccountId) -> Result<Balance> {
        let account = self.accounts.get(id).await?.ok_or(AtmError::AccountNotFound)?;
        Ok(account.balance)
    }

    pub async fn credit(&self, id: AccountId, amount: Amount) -> Result<()> {
        let _guard = self.locks.acquire(id).await;
        let mut account = self.accounts.get(id).await?.ok_or(AtmError::AccountNotFound)?;
        account.credit(amount);
        self.accounts.store(account).await
    }

    /// Fails with `InsufficientFunds` and no mutation when the balance does
    /// not cover the amount.
    pub async fn debit(&self, id: AccountId, amount: Amount) -> Result<()> {
        let _guard = self.locks.acquire(id).await;
        let mut account = self.accounts.get(id).await?.ok_or(AtmError::AccountNotFound)?;
        account.debit(amount)?;
        self.accounts.store(account).await
    }

    /// Moves `amount` between two accounts; both sides take effect or
    /// neither does. The sender's balance is checked under the locks, so a
    /// racing transfer cannot overdraw it.
    pub async fn transfer(&self, from: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        if from == to {
            return Err(AtmError::SameAccount);
        }

        // Fixed global order: lower id first.
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let _first = self.locks.acquire(first).await;
        let _second = self.locks.acquire(second).await;

        let mut sender = self
            .accounts
            .get(from)
            .await?
            .ok_or(AtmError::SenderNotFound)?;
        let mut receiver = self
            .accounts
            .get(to)
            .await?
            .ok_or(AtmError::ReceiverNotFound)?;

        if sender.balance < Balance::from(amount) {
            return Err(AtmError::InsufficientBalance);
        }

        sender.debit(amount)?;
        receiver.credit(amount);

        self.accounts.store(sender).await?;
        self.accounts.store(receiver).await
    }
}
