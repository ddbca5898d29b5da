use crate::domain::account::{Account, AccountStatus};
use crate::domain::transaction::TransactionRecord;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    account: u32,
    number: &'a str,
    balance: Decimal,
    status: AccountStatus,
}

/// Writes the final account state as CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: Vec<Account>) -> Result<()> {
        for account in &accounts {
            self.writer.serialize(AccountRow {
                account: account.id.0,
                number: &account.account_number,
                balance: account.balance.0,
                status: account.status,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct StatementRow<'a> {
    r#type: String,
    amount: Decimal,
    date: String,
    status: String,
    description: &'a str,
}

/// Writes mini-statement rows as CSV.
pub struct StatementWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> StatementWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_records(&mut self, records: Vec<TransactionRecord>) -> Result<()> {
        for record in &records {
            self.writer.serialize(StatementRow {
                r#type: record.kind.to_string(),
                amount: record.amount.value(),
                date: record.created_at.to_rfc3339(),
                status: record.status.to_string(),
                description: record.description.as_deref().unwrap_or(""),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
