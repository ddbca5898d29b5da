use crate::domain::money::{Amount, Balance};
use crate::error::AtmError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

/// A customer account holding the balance that money movement operates on.
///
/// The balance only changes through `AccountLedger`, which serializes
/// mutations per account id.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub account_number: String,
    pub balance: Balance,
    pub status: AccountStatus,
}

impl Account {
    pub fn new(id: AccountId, account_number: impl Into<String>, balance: Balance) -> Self {
        Self {
            id,
            account_number: account_number.into(),
            balance,
            status: AccountStatus::Active,
        }
    }

    /// Adds funds to the balance.
    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount.into();
    }

    /// Removes funds if the balance covers the amount; otherwise leaves the
    /// account untouched.
    pub fn debit(&mut self, amount: Amount) -> Result<(), AtmError> {
        let amount: Balance = amount.into();
        if self.balance >= amount {
            self.balance -= amount;
            Ok(())
        } else {
            Err(AtmError::InsufficientFunds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_credit() {
        let mut account = Account::new(AccountId(1), "ACC-1001", Balance::ZERO);
        account.credit(dec!(10.0).try_into().unwrap());
        assert_eq!(account.balance, Balance::new(dec!(10.0)));
    }

    #[test]
    fn test_account_debit_success() {
        let mut account = Account::new(AccountId(1), "ACC-1001", Balance::new(dec!(10.0)));

        let result = account.debit(dec!(4.0).try_into().unwrap());
        assert!(result.is_ok());
        assert_eq!(account.balance, Balance::new(dec!(6.0)));
    }

    #[test]
    fn test_account_debit_insufficient() {
        let mut account = Account::new(AccountId(1), "ACC-1001", Balance::new(dec!(10.0)));

        let result = account.debit(dec!(20.0).try_into().unwrap());
        assert!(matches!(result, Err(AtmError::InsufficientFunds)));
        assert_eq!(account.balance, Balance::new(dec!(10.0)));
    }
}
