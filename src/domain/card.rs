use crate::domain::account::AccountId;
use crate::domain::money::Amount;
use crate::domain::pin::PinVerifier;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Active,
    TempBlocked,
    Expired,
    Blocked,
    Lost,
    Closed,
    Suspended,
}

impl CardStatus {
    /// Statuses a terminal can never recover a card from.
    pub fn is_permanently_blocked(&self) -> bool {
        matches!(
            self,
            CardStatus::Blocked
                | CardStatus::Lost
                | CardStatus::Closed
                | CardStatus::Suspended
                | CardStatus::Expired
        )
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::TempBlocked => "TEMP_BLOCKED",
            CardStatus::Expired => "EXPIRED",
            CardStatus::Blocked => "BLOCKED",
            CardStatus::Lost => "LOST",
            CardStatus::Closed => "CLOSED",
            CardStatus::Suspended => "SUSPENDED",
        };
        f.write_str(name)
    }
}

/// The credential a terminal authenticates against.
///
/// Invariants: `failed_attempts` is zero whenever the status becomes
/// `Active`, and `locked_until` is set iff the status is `TempBlocked`.
/// Both are maintained by `CardAuthenticator`, which serializes every
/// read-modify-write per card id.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Card {
    pub id: CardId,
    pub card_number: String,
    pub account_id: AccountId,
    pub verifier: PinVerifier,
    pub status: CardStatus,
    pub failed_attempts: u8,
    pub locked_until: Option<DateTime<Utc>>,
    pub expiry_date: NaiveDate,
    pub daily_withdraw_limit: Amount,
}

impl Card {
    pub fn new(
        id: CardId,
        card_number: impl Into<String>,
        account_id: AccountId,
        pin: &str,
        expiry_date: NaiveDate,
        daily_withdraw_limit: Amount,
    ) -> Self {
        Self {
            id,
            card_number: card_number.into(),
            account_id,
            verifier: PinVerifier::derive(pin),
            status: CardStatus::Active,
            failed_attempts: 0,
            locked_until: None,
            expiry_date,
            daily_withdraw_limit,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now.date_naive()
    }

    /// True if a temporary lock exists and its window has elapsed.
    pub fn lock_elapsed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until <= now)
    }

    /// Returns the card to `Active` with a clean attempt counter.
    pub fn clear_lockout(&mut self) {
        self.failed_attempts = 0;
        self.locked_until = None;
        self.status = CardStatus::Active;
    }

    /// Trips the temporary block after too many PIN failures.
    pub fn temp_block(&mut self, until: DateTime<Utc>) {
        self.status = CardStatus::TempBlocked;
        self.locked_until = Some(until);
    }
}
