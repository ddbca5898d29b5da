use crate::domain::card::CardStatus;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtmError>;

/// Failure taxonomy for the transactional core.
///
/// Variants carry the structured payload a caller needs to render the
/// outcome (attempts left, unlock time, required note multiple) rather than
/// pre-formatted prose.
#[derive(Error, Debug)]
pub enum AtmError {
    // --- card / authentication ---
    #[error("Invalid card")]
    CardNotFound,
    #[error("Card expired")]
    CardExpired,
    #[error("Card is permanently blocked ({0})")]
    CardPermanentlyBlocked(CardStatus),
    #[error("Card temporarily blocked until {unlock_at}")]
    CardLocked { unlock_at: DateTime<Utc> },
    #[error("Invalid PIN ({attempts_left} attempts left)")]
    InvalidPin { attempts_left: u8 },
    #[error("PIN blocked, try again after {unlock_at}")]
    PinBlocked { unlock_at: DateTime<Utc> },
    #[error("Card blocked or inactive")]
    CardNotActive,
    #[error("Card already in use at another ATM")]
    CardInUse,
    #[error("Old PIN is incorrect")]
    PinMismatch,
    #[error("New PIN cannot be same as old PIN")]
    PinUnchanged,

    // --- sessions ---
    #[error("Session already active for this card")]
    SessionAlreadyActive,
    #[error("Invalid session")]
    SessionNotFound,

    // --- ledger ---
    #[error("Account not found")]
    AccountNotFound,
    #[error("Insufficient account balance")]
    InsufficientFunds,
    #[error("Sender account not found")]
    SenderNotFound,
    #[error("Receiver account not found")]
    ReceiverNotFound,
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Cannot transfer to same account")]
    SameAccount,

    // --- cash inventory ---
    #[error("ATM not found")]
    MachineNotFound,
    #[error("ATM is offline")]
    MachineOffline,
    #[error("ATM has insufficient cash")]
    InsufficientCash,
    #[error("Amount must be multiple of {multiple}")]
    AmountNotDispensable { multiple: u32 },
    #[error("ATM cannot dispense this amount")]
    DenominationInfeasible,

    // --- money movement validation ---
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("Card is blocked / inactive / invalid")]
    CardInvalid,
    #[error("Daily withdrawal limit exceeded")]
    DailyLimitExceeded,
    #[error("No cash inserted")]
    NoCashInserted,
    #[error("Invalid note count")]
    InvalidNoteCount,

    // --- infrastructure ---
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
