use cashpoint::application::engine::TransactionEngine;
use cashpoint::application::inventory::CashInventory;
use cashpoint::application::ledger::AccountLedger;
use cashpoint::domain::account::{Account, AccountId};
use cashpoint::domain::card::{Card, CardId};
use cashpoint::domain::machine::{Machine, MachineId, NoteBundle};
use cashpoint::domain::money::Balance;
use cashpoint::domain::ports::{AccountStore, CardStore, MachineStore};
use cashpoint::error::Result as AtmResult;
use cashpoint::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryCardStore, InMemoryMachineStore, InMemoryTransactionLog,
};
use cashpoint::interfaces::csv::account_writer::{AccountWriter, StatementWriter};
use cashpoint::interfaces::csv::operation_reader::{Operation, OperationReader};
use chrono::NaiveDate;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal_macros::dec;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Print the mini statement for this card instead of the account state.
    #[arg(long)]
    statement: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();

    let accounts = Arc::new(InMemoryAccountStore::new());
    let engine = seed_demo_bank(accounts.clone()).await.into_diagnostic()?;

    // Replay the scripted operations, reporting per-row failures without
    // stopping the run.
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for operation in reader.operations() {
        match operation {
            Ok(operation) => {
                if let Err(e) = apply(&engine, operation).await {
                    eprintln!("Error processing operation: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    let stdout = io::stdout();
    if let Some(card) = cli.statement {
        let records = engine
            .mini_statement(CardId(card), 5)
            .await
            .into_diagnostic()?;
        let mut writer = StatementWriter::new(stdout.lock());
        writer.write_records(records).into_diagnostic()?;
    } else {
        let accounts = accounts.all().await.into_diagnostic()?;
        let mut writer = AccountWriter::new(stdout.lock());
        writer.write_accounts(accounts).into_diagnostic()?;
    }

    Ok(())
}

async fn apply(engine: &TransactionEngine, operation: Operation) -> AtmResult<()> {
    match operation {
        Operation::Withdraw {
            card,
            account,
            machine,
            amount,
        } => {
            engine.withdraw(card, account, machine, amount).await?;
        }
        Operation::Deposit {
            card,
            account,
            machine,
            notes,
        } => {
            engine.deposit(card, account, machine, notes).await?;
        }
        Operation::Transfer {
            machine,
            from,
            to,
            amount,
        } => {
            engine.transfer(&from, &to, machine, amount).await?;
        }
    }
    Ok(())
}

/// Seeds the fixed demo bank the CLI runs against: two accounts with one
/// card each and a single stocked machine.
async fn seed_demo_bank(accounts: Arc<InMemoryAccountStore>) -> AtmResult<TransactionEngine> {
    let cards = Arc::new(InMemoryCardStore::new());
    let machines = Arc::new(InMemoryMachineStore::new());
    let log = Arc::new(InMemoryTransactionLog::new());

    accounts
        .store(Account::new(
            AccountId(1),
            "ACC-1001",
            Balance::new(dec!(5000)),
        ))
        .await?;
    accounts
        .store(Account::new(
            AccountId(2),
            "ACC-1002",
            Balance::new(dec!(1000)),
        ))
        .await?;

    let expiry = NaiveDate::from_ymd_opt(2030, 12, 31).unwrap_or_default();
    cards
        .store(Card::new(
            CardId(1),
            "4000-0000-0000-0001",
            AccountId(1),
            "1234",
            expiry,
            dec!(20000).try_into()?,
        ))
        .await?;
    cards
        .store(Card::new(
            CardId(2),
            "4000-0000-0000-0002",
            AccountId(2),
            "5678",
            expiry,
            dec!(20000).try_into()?,
        ))
        .await?;

    machines
        .store(Machine::new(
            MachineId(1),
            NoteBundle::with([(2000, 10), (500, 20), (100, 50)]),
        ))
        .await?;

    Ok(TransactionEngine::new(
        cards,
        accounts.clone(),
        machines.clone(),
        Arc::new(AccountLedger::new(accounts)),
        Arc::new(CashInventory::new(machines)),
        log,
    ))
}
