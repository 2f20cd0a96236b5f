use assert_cmd::Command;
use powledger_core::Block;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn powledger() -> Command {
    Command::cargo_bin("powledger").expect("binary built")
}

#[test]
fn demo_detects_tampering() {
    powledger()
        .args(["demo", "--difficulty", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mining Block 2..."))
        .stdout(predicate::str::contains("Transactions: [\"Transaction 1\",\"Transaction 2\"]"))
        .stdout(predicate::str::contains("block 2 is not linked to its predecessor"))
        .stdout(predicate::str::contains("Blockchain integrity compromised!"));
}

#[test]
fn demo_without_tampering_is_valid() {
    powledger()
        .args(["demo", "--difficulty", "1", "--parallel", "--no-tamper"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blockchain is valid!"))
        .stdout(predicate::str::contains("Tampering").not());
}

#[test]
fn mine_exports_json() -> anyhow::Result<()> {
    let output = powledger()
        .args([
            "mine",
            "--difficulty",
            "2",
            "--blocks",
            "3",
            "--payload",
            "alice->bob:5",
            "--json",
        ])
        .output()?;
    assert!(output.status.success());

    let exported: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let blocks: Vec<Block> = serde_json::from_value(exported["blocks"].clone())?;
    assert_eq!(blocks.len(), 4);
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].previous_hash, pair[0].hash);
        assert!(pair[1].hash.starts_with("00"));
        assert_eq!(pair[1].transactions, serde_json::json!(["alice->bob:5"]));
    }
    Ok(())
}

#[test]
fn mine_reads_config_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("chain.json");
    fs::write(
        &path,
        r#"{"difficulty":1,"strategy":"parallel","genesis_timestamp":1700000000000}"#,
    )?;

    let output = powledger()
        .args(["mine", "--json", "--config"])
        .arg(&path)
        .output()?;
    assert!(output.status.success());

    let exported: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(exported["config"]["strategy"], "parallel");
    assert_eq!(exported["blocks"][0]["timestamp"], 1_700_000_000_000u64);
    assert_eq!(
        exported["blocks"][0]["hash"],
        "48c2aefc6d179fdee9d852023da0b679dc0dba8c0dd59ac5da61a8fe0fb252d5"
    );
    Ok(())
}

#[test]
fn mine_rejects_unreachable_difficulty() {
    powledger()
        .args(["mine", "--difficulty", "65"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unreachable"));
}

#[test]
fn mine_gives_up_at_deadline() {
    powledger()
        .args(["mine", "--difficulty", "64", "--timeout-ms", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deadline exceeded"));
}
