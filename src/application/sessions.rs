use crate::application::emit_audit;
use crate::application::locks::EntityLocks;
use crate::domain::audit::{Activity, AuditEvent, AuditOutcome};
use crate::domain::card::CardId;
use crate::domain::machine::MachineId;
use crate::domain::ports::{AuditSinkRef, CardStoreRef, SessionStoreRef};
use crate::domain::session::{Session, SessionId};
use crate::error::{AtmError, Result};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub idle_timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::seconds(120),
        }
    }
}

/// Owns the one-active-session-per-card invariant and session lifetime.
///
/// Admission checks and creation happen under the card's lock, so two
/// racing starts for the same card cannot both win. Idle expiry is owned
/// here rather than by the terminal: the sweeper drives the same end-path
/// as an explicit logout, so an unresponsive client cannot keep a session
/// alive.
pub struct SessionManager {
    sessions: SessionStoreRef,
    cards: CardStoreRef,
    audit: AuditSinkRef,
    locks: Arc<EntityLocks<CardId>>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(
        sessions: SessionStoreRef,
        cards: CardStoreRef,
        audit: AuditSinkRef,
        locks: Arc<EntityLocks<CardId>>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            sessions,
            cards,
            audit,
            locks,
            policy,
        }
    }

    pub async fn start_session(&self, card_id: CardId, machine_id: MachineId) -> Result<SessionId> {
        let _guard = self.locks.acquire(card_id).await;

        if self.sessions.active_for_card(card_id).await?.is_some() {
            return Err(AtmError::SessionAlreadyActive);
        }
        if self.cards.get(card_id).await?.is_none() {
            return Err(AtmError::CardNotFound);
        }

        let session = Session::open(card_id, machine_id);
        let session_id = session.id;
        self.sessions.store(session).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                card_id,
                machine_id,
                Activity::Login,
                json!({ "session_id": session_id.to_string() }),
                AuditOutcome::Success,
            ),
        )
        .await;
        info!(card = %card_id, session = %session_id, "session started");
        Ok(session_id)
    }

    /// Ends a session. Ending one that already ended is a no-op success;
    /// it is never resurrected.
    pub async fn end_session(&self, session_id: SessionId) -> Result<()> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(AtmError::SessionNotFound)?;
        if !session.active {
            return Ok(());
        }

        let _guard = self.locks.acquire(session.card_id).await;
        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(AtmError::SessionNotFound)?;
        if !session.active {
            return Ok(());
        }

        session.close(Utc::now());
        let (card_id, machine_id) = (session.card_id, session.machine_id);
        self.sessions.store(session).await?;

        emit_audit(
            &self.audit,
            AuditEvent::new(
                card_id,
                machine_id,
                Activity::Logout,
                json!({ "session_id": session_id.to_string() }),
                AuditOutcome::Success,
            ),
        )
        .await;
        info!(card = %card_id, session = %session_id, "session ended");
        Ok(())
    }

    /// Marks the session as recently used so the sweeper leaves it alone.
    pub async fn touch(&self, session_id: SessionId) -> Result<()> {
        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(AtmError::SessionNotFound)?;
        if session.active {
            session.last_seen = Utc::now();
            self.sessions.store(session).await?;
        }
        Ok(())
    }

    /// Ends every active session idle past the policy timeout. Returns how
    /// many were expired.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut expired = 0;
        for session in self.sessions.active().await? {
            if session.idle_since(now) >= self.policy.idle_timeout {
                self.end_session(session.id).await?;
                expired += 1;
            }
        }
        if expired > 0 {
            info!(count = expired, "expired idle sessions");
        }
        Ok(expired)
    }

    /// Runs `sweep_expired` forever on a fixed cadence.
    pub fn run_sweeper(self: Arc<Self>, period: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(err) = self.sweep_expired().await {
                    warn!(error = %err, "session sweep failed");
                }
            }
        })
    }
}
