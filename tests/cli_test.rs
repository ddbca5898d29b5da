use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;

fn write_operations(path: &Path) {
    let mut wtr = csv::Writer::from_path(path).unwrap();
    wtr.write_record(["type", "card", "account", "machine", "amount", "notes", "from", "to"])
        .unwrap();
    wtr.write_record(["withdraw", "1", "1", "1", "2500", "", "", ""])
        .unwrap();
    wtr.write_record(["deposit", "1", "1", "1", "", "500:2;100:3", "", ""])
        .unwrap();
    wtr.write_record(["transfer", "", "", "1", "750", "", "ACC-1001", "ACC-1002"])
        .unwrap();
    // Rejected: not a multiple of the smallest note. Reported on stderr,
    // run continues.
    wtr.write_record(["withdraw", "2", "2", "1", "333", "", "", ""])
        .unwrap();
    wtr.flush().unwrap();
}

#[test]
fn test_scripted_run_prints_final_accounts() {
    let path = std::path::PathBuf::from("cli_accounts.csv");
    write_operations(&path);

    let mut cmd = Command::new(cargo_bin!("cashpoint"));
    cmd.arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("account,number,balance,status"))
        .stdout(predicate::str::contains("1,ACC-1001,3050,ACTIVE"))
        .stdout(predicate::str::contains("2,ACC-1002,1750,ACTIVE"))
        .stderr(predicate::str::contains("multiple of 100"));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_statement_flag_prints_card_history() {
    let path = std::path::PathBuf::from("cli_statement.csv");
    write_operations(&path);

    let mut cmd = Command::new(cargo_bin!("cashpoint"));
    cmd.arg(&path).arg("--statement").arg("1");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("type,amount,date,status,description"))
        .stdout(predicate::str::contains("TRANSFER,750"))
        .stdout(predicate::str::contains("DEPOSIT,1300"))
        .stdout(predicate::str::contains("WITHDRAWAL,2500"));

    std::fs::remove_file(path).ok();
}
