use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("paylode"));
    cmd.arg("tests/fixtures/test.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("account,balance,succeeded,failed"))
        // Account 1: funded 50, spent 30, one insufficient-funds rejection.
        .stdout(predicate::str::contains("1,20,2,1"))
        // Account 2: funded 20 by bank transfer.
        .stdout(predicate::str::contains("2,20,1,0"));

    Ok(())
}

#[test]
fn test_cli_history_output() {
    let mut cmd = Command::new(cargo_bin!("paylode"));
    cmd.arg("tests/fixtures/test.csv").arg("--history");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "account,entry,kind,amount,status,reference",
        ))
        .stdout(predicate::str::contains("funding"))
        .stdout(predicate::str::contains("spend"))
        // Entry references carry the provider receipt.
        .stdout(predicate::str::contains("cardline-"))
        .stdout(predicate::str::contains("agg-"));
}
