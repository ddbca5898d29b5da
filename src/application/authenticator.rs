use crate::application::emit_audit;
use crate::application::locks::EntityLocks;
use crate::domain::account::AccountId;
use crate::domain::audit::{Activity, AuditEvent, AuditOutcome};
use crate::domain::card::{CardId, CardStatus};
use crate::domain::machine::MachineId;
use crate::domain::pin::PinVerifier;
use crate::domain::ports::{AccountStoreRef, AuditSinkRef, CardStoreRef, SessionStoreRef};
use crate::error::{AtmError, Result};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Lockout policy for PIN verification.
#[derive(Debug, Clone, Copy)]
pub struct AuthPolicy {
    pub max_attempts: u8,
    pub lock_duration: Duration,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lock_duration: Duration::minutes(15),
        }
    }
}

/// What a successful PIN validation hands back to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub card_id: CardId,
    pub account_id: AccountId,
    pub account_number: String,
}

/// Card identity, PIN verification and the failed-attempt state machine.
///
/// Every evaluation runs as one unit under the card's lock: two concurrent
/// wrong PINs each observe the other's counter increment, so the threshold
/// trips after exactly `max_attempts` distinct failures.
pub struct CardAuthenticator {
    cards: CardStoreRef,
    accounts: AccountStoreRef,
    sessions: SessionStoreRef,
    audit: AuditSinkRef,
    locks: Arc<EntityLocks<CardId>>,
    policy: AuthPolicy,
}

impl CardAuthenticator {
    pub fn new(
        cards: CardStoreRef,
        accounts: AccountStoreRef,
        sessions: SessionStoreRef,
        audit: AuditSinkRef,
        locks: Arc<EntityLocks<CardId>>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            cards,
            accounts,
            sessions,
            audit,
            locks,
            policy,
        }
    }

    /// Admission check when a card is pushed into the slot, before any PIN
    /// is entered. Rejections are audited with their reason.
    pub async fn insert_card(&self, card_number: &str, machine_id: MachineId) -> Result<CardId> {
        let card = self
            .cards
            .get_by_number(card_number)
            .await?
            .ok_or(AtmError::CardNotFound)?;

        if card.status != CardStatus::Active {
            self.login_failed(card.id, machine_id, json!({ "reason": "Card not active" }))
                .await;
            return Err(AtmError::CardNotActive);
        }

        let _guard = self.locks.acquire(card.id).await;
        if self.sessions.active_for_card(card.id).await?.is_some() {
            self.login_failed(card.id, machine_id, json!({ "reason": "Card already in use" }))
                .await;
            return Err(AtmError::CardInUse);
        }

        Ok(card.id)
    }

    /// Verifies the PIN and drives the lockout state machine (steps below
    /// evaluate in order, all under the card's lock):
    ///
    /// 1. unknown card, 2. expiry (persisting the `Expired` transition),
    /// 3. permanent blocks, 4. elapsed temp-lock auto-unlock, 5. live
    /// temp-lock, 6. PIN comparison, 7. failure bookkeeping with the
    /// threshold tripping a 15-minute block, 8. success resetting the
    /// counter.
    pub async fn validate_pin(
        &self,
        card_number: &str,
        pin: &str,
        machine_id: MachineId,
    ) -> Result<AuthGrant> {
        let found = self
            .cards
            .get_by_number(card_number)
            .await?
            .ok_or(AtmError::CardNotFound)?;

        let _guard = self.locks.acquire(found.id).await;
        // Re-read under the lock so this evaluation sees the latest counter.
        let mut card = self
            .cards
            .get(found.id)
            .await?
            .ok_or(AtmError::CardNotFound)?;
        let now = Utc::now();

        if card.is_expired(now) {
            card.status = CardStatus::Expired;
            card.locked_until = None;
            self.cards.store(card.clone()).await?;
            self.login_failed(card.id, machine_id, json!({ "reason": "Card expired" }))
                .await;
            return Err(AtmError::CardExpired);
        }

        if card.status.is_permanently_blocked() {
            self.login_failed(
                card.id,
                machine_id,
                json!({ "reason": format!("Card permanently blocked ({})", card.status) }),
            )
            .await;
            return Err(AtmError::CardPermanentlyBlocked(card.status));
        }

        if card.lock_elapsed(now) {
            // The block window has passed: unlock and keep evaluating the
            // refreshed state within this same call.
            card.clear_lockout();
            self.cards.store(card.clone()).await?;
        }

        if card.status == CardStatus::TempBlocked
            && let Some(unlock_at) = card.locked_until
        {
            self.login_failed(card.id, machine_id, json!({ "reason": "Card locked" }))
                .await;
            return Err(AtmError::CardLocked { unlock_at });
        }

        if !card.verifier.verify(pin) {
            card.failed_attempts += 1;

            if card.failed_attempts >= self.policy.max_attempts {
                let unlock_at = now + self.policy.lock_duration;
                card.temp_block(unlock_at);
                self.cards.store(card.clone()).await?;
                warn!(card = %card.id, %unlock_at, "PIN attempts exhausted, card temporarily blocked");
                self.login_failed(
                    card.id,
                    machine_id,
                    json!({ "reason": "PIN blocked", "unlockAt": unlock_at.to_rfc3339() }),
                )
                .await;
                return Err(AtmError::PinBlocked { unlock_at });
            }

            let attempts_left = self.policy.max_attempts - card.failed_attempts;
            self.cards.store(card.clone()).await?;
            self.login_failed(
                card.id,
                machine_id,
                json!({ "reason": "Invalid PIN", "attemptsLeft": attempts_left }),
            )
            .await;
            return Err(AtmError::InvalidPin { attempts_left });
        }

        card.clear_lockout();
        self.cards.store(card.clone()).await?;

        let account = self
            .accounts
            .get(card.account_id)
            .await?
            .ok_or(AtmError::AccountNotFound)?;

        info!(card = %card.id, "PIN verified");
        Ok(AuthGrant {
            card_id: card.id,
            account_id: account.id,
            account_number: account.account_number,
        })
    }

    /// Replaces the PIN after verifying the old one. Re-salts the verifier
    /// and clears the attempt counter.
    pub async fn change_pin(
        &self,
        card_number: &str,
        old_pin: &str,
        new_pin: &str,
        machine_id: MachineId,
    ) -> Result<()> {
        let found = self
            .cards
            .get_by_number(card_number)
            .await?
            .ok_or(AtmError::CardNotFound)?;

        let _guard = self.locks.acquire(found.id).await;
        let mut card = self
            .cards
            .get(found.id)
            .await?
            .ok_or(AtmError::CardNotFound)?;

        if !card.verifier.verify(old_pin) {
            return Err(AtmError::PinMismatch);
        }
        if old_pin == new_pin {
            return Err(AtmError::PinUnchanged);
        }

        card.verifier = PinVerifier::derive(new_pin);
        card.failed_attempts = 0;
        self.cards.store(card.clone()).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                card.id,
                machine_id,
                Activity::PinChange,
                json!({}),
                AuditOutcome::Success,
            ),
        )
        .await;
        info!(card = %card.id, "PIN changed");
        Ok(())
    }

    /// Hard-blocks a card (reported lost or captured). Permanent until
    /// back-office intervention, which is outside this core.
    pub async fn block_card(&self, card_id: CardId, machine_id: MachineId) -> Result<()> {
        let _guard = self.locks.acquire(card_id).await;
        let mut card = self.cards.get(card_id).await?.ok_or(AtmError::CardNotFound)?;

        card.status = CardStatus::Blocked;
        card.locked_until = None;
        self.cards.store(card.clone()).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                card.id,
                machine_id,
                Activity::CardBlock,
                json!({}),
                AuditOutcome::Success,
            ),
        )
        .await;
        warn!(card = %card.id, "card blocked");
        Ok(())
    }

    async fn login_failed(&self, card_id: CardId, machine_id: MachineId, details: serde_json::Value) {
        emit_audit(
            &self.audit,
            AuditEvent::new(
                card_id,
                machine_id,
                Activity::Login,
                details,
                AuditOutcome::Failed,
            ),
        )
        .await;
    }

}
