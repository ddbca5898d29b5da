use crate::domain::money::Balance;
use crate::error::AtmError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MachineId(pub u32);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Note counts per denomination value, ordered by value.
///
/// Doubles as a machine's drawer content and as the bundle a customer
/// pushes into the deposit slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteBundle(BTreeMap<u32, u32>);

impl NoteBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(notes: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self(notes.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_of(&self, value: u32) -> u32 {
        self.0.get(&value).copied().unwrap_or(0)
    }

    /// Iterates (value, count) in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(&value, &count)| (value, count))
    }

    /// Total monetary value, Σ value × count.
    pub fn total(&self) -> Decimal {
        self.0
            .iter()
            .map(|(&value, &count)| Decimal::from(value) * Decimal::from(count))
            .sum()
    }

    /// Smallest stocked denomination value, counted or not.
    pub fn min_note(&self) -> Option<u32> {
        self.0.keys().next().copied()
    }

    /// Greedy largest-denomination-first allocation.
    ///
    /// Each denomination contributes `min(floor(remaining / value), count)`
    /// notes. Returns `None` when a nonzero remainder survives the pass,
    /// i.e. the amount cannot be composed from the current note mix.
    pub fn allocate(&self, amount: Decimal) -> Option<BTreeMap<u32, u32>> {
        let mut remaining = amount;
        let mut plan = BTreeMap::new();

        for (&value, &count) in self.0.iter().rev() {
            let value_d = Decimal::from(value);
            let by_value = (remaining / value_d).floor().to_u32().unwrap_or(0);
            let used = by_value.min(count);
            if used > 0 {
                plan.insert(value, used);
                remaining -= value_d * Decimal::from(used);
            }
        }

        if remaining == Decimal::ZERO {
            Some(plan)
        } else {
            None
        }
    }

    /// Adds notes of one denomination, creating the row if absent.
    pub fn add(&mut self, value: u32, count: u32) {
        *self.0.entry(value).or_insert(0) += count;
    }

    /// Merges another bundle into this one.
    pub fn merge(&mut self, other: &NoteBundle) {
        for (value, count) in other.iter() {
            self.add(value, count);
        }
    }

    /// Removes an allocation plan's notes. Callers guarantee availability,
    /// which `allocate` does by construction.
    pub fn deduct(&mut self, plan: &BTreeMap<u32, u32>) {
        for (value, used) in plan {
            if let Some(count) = self.0.get_mut(value) {
                *count = count.saturating_sub(*used);
            }
        }
    }
}

impl FromStr for NoteBundle {
    type Err = AtmError;

    /// Parses `"500:2;100:3"` into a bundle.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            AtmError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid note bundle: {s}"),
            ))
        };

        let mut bundle = NoteBundle::new();
        for entry in s.split(';').filter(|e| !e.trim().is_empty()) {
            let (value, count) = entry.trim().split_once(':').ok_or_else(|| invalid())?;
            let value: u32 = value.trim().parse().map_err(|_| invalid())?;
            let count: u32 = count.trim().parse().map_err(|_| invalid())?;
            bundle.add(value, count);
        }
        Ok(bundle)
    }
}

/// A terminal with a cash drawer.
///
/// Invariant: `cash_balance` equals `notes.total()` at rest; both only move
/// together under `CashInventory`'s per-machine lock.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Machine {
    pub id: MachineId,
    pub online: bool,
    pub cash_balance: Balance,
    pub notes: NoteBundle,
}

impl Machine {
    pub fn new(id: MachineId, notes: NoteBundle) -> Self {
        let cash_balance = Balance::new(notes.total());
        Self {
            id,
            online: true,
            cash_balance,
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_and_min_note() {
        let notes = NoteBundle::with([(2000, 1), (500, 1)]);
        assert_eq!(notes.total(), dec!(2500));
        assert_eq!(notes.min_note(), Some(500));
        assert_eq!(NoteBundle::new().min_note(), None);
    }

    #[test]
    fn test_min_note_ignores_count() {
        // A zero-count row still determines the smallest stocked value.
        let notes = NoteBundle::with([(2000, 3), (100, 0)]);
        assert_eq!(notes.min_note(), Some(100));
    }

    #[test]
    fn test_allocate_exact_greedy() {
        let notes = NoteBundle::with([(500, 4), (100, 1)]);
        let plan = notes.allocate(dec!(2100)).unwrap();
        assert_eq!(plan, BTreeMap::from([(500, 4), (100, 1)]));
    }

    #[test]
    fn test_allocate_bounded_by_stock() {
        let notes = NoteBundle::with([(2000, 1), (500, 10)]);
        let plan = notes.allocate(dec!(4500)).unwrap();
        assert_eq!(plan, BTreeMap::from([(2000, 1), (500, 5)]));
    }

    #[test]
    fn test_allocate_infeasible_mix() {
        // Total cash would cover it, but no small notes remain for the tail.
        let notes = NoteBundle::with([(2000, 2), (100, 5)]);
        assert!(notes.allocate(dec!(1300)).is_none());
    }

    #[test]
    fn test_deduct_drops_counts() {
        let mut notes = NoteBundle::with([(500, 4), (100, 1)]);
        let plan = notes.allocate(dec!(2100)).unwrap();
        notes.deduct(&plan);
        assert_eq!(notes.count_of(500), 0);
        assert_eq!(notes.count_of(100), 0);
        assert_eq!(notes.total(), dec!(0));
    }

    #[test]
    fn test_bundle_parsing() {
        let bundle: NoteBundle = "500:2;100:3".parse().unwrap();
        assert_eq!(bundle.count_of(500), 2);
        assert_eq!(bundle.count_of(100), 3);
        assert!("500x2".parse::<NoteBundle>().is_err());
        assert!("abc:1".parse::<NoteBundle>().is_err());
    }

    #[test]
    fn test_machine_starts_balanced() {
        let machine = Machine::new(MachineId(1), NoteBundle::with([(2000, 10), (500, 20)]));
        assert_eq!(machine.cash_balance, Balance::new(dec!(30000)));
        assert_eq!(machine.cash_balance.0, machine.notes.total());
    }
}
