use crate::domain::account::AccountId;
use crate::domain::card::CardId;
use crate::domain::machine::{MachineId, NoteBundle};
use crate::error::{AtmError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Withdraw,
    Deposit,
    Transfer,
}

/// One raw CSV row. Which columns are required depends on the operation;
/// `Operation::try_from` enforces that.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRow {
    pub r#type: OperationKind,
    pub card: Option<u32>,
    pub account: Option<u32>,
    pub machine: Option<u32>,
    pub amount: Option<Decimal>,
    pub notes: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// A validated, scripted money-movement call.
#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Withdraw {
        card: CardId,
        account: AccountId,
        machine: MachineId,
        amount: Decimal,
    },
    Deposit {
        card: CardId,
        account: AccountId,
        machine: MachineId,
        notes: NoteBundle,
    },
    Transfer {
        machine: MachineId,
        from: String,
        to: String,
        amount: Decimal,
    },
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| {
        AtmError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("missing field `{field}`"),
        ))
    })
}

impl TryFrom<OperationRow> for Operation {
    type Error = AtmError;

    fn try_from(row: OperationRow) -> Result<Self> {
        match row.r#type {
            OperationKind::Withdraw => Ok(Operation::Withdraw {
                card: CardId(require(row.card, "card")?),
                account: AccountId(require(row.account, "account")?),
                machine: MachineId(require(row.machine, "machine")?),
                amount: require(row.amount, "amount")?,
            }),
            OperationKind::Deposit => Ok(Operation::Deposit {
                card: CardId(require(row.card, "card")?),
                account: AccountId(require(row.account, "account")?),
                machine: MachineId(require(row.machine, "machine")?),
                notes: require(row.notes, "notes")?.parse()?,
            }),
            OperationKind::Transfer => Ok(Operation::Transfer {
                machine: MachineId(require(row.machine, "machine")?),
                from: require(row.from, "from")?,
                to: require(row.to, "to")?,
                amount: require(row.amount, "amount")?,
            }),
        }
    }
}

/// Reads scripted operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record
/// lengths, yielding `Result<Operation>` lazily so large scripts stream.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize::<OperationRow>()
            .map(|result| result.map_err(AtmError::from).and_then(Operation::try_from))
    }
}
