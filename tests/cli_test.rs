use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/sell_complete.json")
        .arg("--poll-interval-ms")
        .arg("5");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("seq,phase,status,note"))
        .stdout(predicate::str::contains("1,GotQuote,,quote quote-1"))
        .stdout(predicate::str::contains(
            "3,GotTransfer,TransferStarted,transfer transfer-1",
        ))
        .stdout(predicate::str::contains(
            "5,PaymentCompleted,TransferComplete,status polled",
        ));

    Ok(())
}

#[test]
fn test_cli_reports_failed_transfer() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = std::fs::read_to_string("tests/fixtures/sell_complete.json")?;
    let scenario = fixture.replace(
        r#"["TransferProcessing", "TransferComplete"]"#,
        r#"["Processing", "Processing", "TransferFailed"]"#,
    );
    let mut file = NamedTempFile::new()?;
    file.write_all(scenario.as_bytes())?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(file.path()).arg("--poll-interval-ms").arg("5");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "6,PaymentFailed,TransferFailed,status polled",
        ))
        .stderr(predicate::str::contains(
            "Support Request for Transaction transfer-1",
        ));

    Ok(())
}

#[test]
fn test_cli_gate_block_prints_header_only() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = std::fs::read_to_string("tests/fixtures/sell_complete.json")?;
    let scenario = fixture.replace("\"VERIFIED\"", "\"IN_REVIEW\"");
    let mut file = NamedTempFile::new()?;
    file.write_all(scenario.as_bytes())?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::eq("seq,phase,status,note\n"))
        .stderr(predicate::str::contains("KYC verification required"));

    Ok(())
}

#[test]
fn test_cli_invalid_amount_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = std::fs::read_to_string("tests/fixtures/sell_complete.json")?;
    let scenario = fixture.replace(r#""amount": "25""#, r#""amount": "2500.75""#);
    let mut file = NamedTempFile::new()?;
    file.write_all(scenario.as_bytes())?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Maximum is 2000 KES"));

    Ok(())
}

#[test]
fn test_cli_missing_file_fails() {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/does_not_exist.json");
    cmd.assert().failure();
}

#[test]
fn test_cli_malformed_scenario_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"{ \"amount\": ")?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(file.path());
    cmd.assert().failure();

    Ok(())
}
