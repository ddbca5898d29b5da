use crate::application::locks::EntityLocks;
use crate::domain::machine::{MachineId, NoteBundle};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::MachineStoreRef;
use crate::error::{AtmError, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// A machine's drawer content and its derived total.
#[derive(Debug, Clone, PartialEq)]
pub struct CashPosition {
    pub notes: NoteBundle,
    pub total: Balance,
}

/// Owns per-machine note counts and the aggregate cash balance.
///
/// Allocation and replenishment serialize per machine, and both move the
/// note counts and `cash_balance` together, preserving the invariant that
/// the aggregate equals Σ value × count.
pub struct CashInventory {
    machines: MachineStoreRef,
    locks: EntityLocks<MachineId>,
}

impl CashInventory {
    pub fn new(machines: MachineStoreRef) -> Self {
        Self {
            machines,
            locks: EntityLocks::new(),
        }
    }

    /// Picks notes for `amount` greedily, largest denomination first, and
    /// commits the decrements.
    ///
    /// Short-circuits with no mutation on: machine offline, total cash
    /// below the amount, amount not a multiple of the smallest stocked
    /// note, or a note mix that cannot compose the amount exactly.
    pub async fn reserve_and_allocate(
        &self,
        machine_id: MachineId,
        amount: Amount,
    ) -> Result<BTreeMap<u32, u32>> {
        let _guard = self.locks.acquire(machine_id).await;
        let mut machine = self
            .machines
            .get(machine_id)
            .await?
            .ok_or(AtmError::MachineNotFound)?;

        if !machine.online {
            return Err(AtmError::MachineOffline);
        }

        let requested = amount.value();
        if machine.notes.total() < requested {
            return Err(AtmError::InsufficientCash);
        }

        // total() >= requested > 0, so at least one denomination is stocked.
        let min_note = machine.notes.min_note().ok_or(AtmError::InsufficientCash)?;
        if requested % Decimal::from(min_note) != Decimal::ZERO {
            return Err(AtmError::AmountNotDispensable { multiple: min_note });
        }

        let plan = machine
            .notes
            .allocate(requested)
            .ok_or(AtmError::DenominationInfeasible)?;

        machine.notes.deduct(&plan);
        machine.cash_balance -= Balance::new(requested);
        self.machines.store(machine).await?;

        Ok(plan)
    }

    /// Adds deposited or loaded notes to the drawer, creating denomination
    /// rows as needed. Returns the machine's new total. Replenishment is
    /// allowed while the machine is offline (maintenance top-up).
    pub async fn replenish(&self, machine_id: MachineId, notes: &NoteBundle) -> Result<Balance> {
        let _guard = self.locks.acquire(machine_id).await;
        let mut machine = self
            .machines
            .get(machine_id)
            .await?
            .ok_or(AtmError::MachineNotFound)?;

        machine.notes.merge(notes);
        machine.cash_balance += Balance::new(notes.total());
        let total = machine.cash_balance;
        self.machines.store(machine).await?;

        Ok(total)
    }

    pub async fn cash_position(&self, machine_id: MachineId) -> Result<CashPosition> {
        let machine = self
            .machines
            .get(machine_id)
            .await?
            .ok_or(AtmError::MachineNotFound)?;
        Ok(CashPosition {
            total: machine.cash_balance,
            notes: machine.notes,
        })
    }
}
