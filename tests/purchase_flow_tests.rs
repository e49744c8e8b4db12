mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::NamedTempFile;

fn run_scenario(steps: &[(&str, &str)]) -> (NamedTempFile, NamedTempFile, Command) {
    let catalog = NamedTempFile::new().unwrap();
    common::write_catalog(catalog.path()).unwrap();

    let script = NamedTempFile::new().unwrap();
    common::write_script(script.path(), steps).unwrap();

    let mut cmd = Command::new(cargo_bin!("billing-engine"));
    cmd.arg(script.path()).arg("--catalog").arg(catalog.path());
    (catalog, script, cmd)
}

#[test]
fn test_approved_purchase_grants_entitlement() {
    let (_catalog, _script, mut cmd) = run_scenario(&[
        ("fetch_products", "p1"),
        ("respond_products", ""),
        ("purchase", "p1"),
        ("approve_purchase", "p1"),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("3,purchase,resolved,p1"))
        .stdout(predicate::str::contains(",ledger,resolved,p1"));
}

#[test]
fn test_rejected_purchase_reports_failure() {
    let (_catalog, _script, mut cmd) = run_scenario(&[
        ("fetch_products", "p1"),
        ("respond_products", ""),
        ("purchase", "p1"),
        ("reject_purchase", "p1"),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("3,purchase,failed,"))
        // A rejected payment leaves the ledger empty
        .stdout(predicate::str::contains(",ledger,resolved,\n"));
}

#[test]
fn test_purchase_before_fetch_is_rejected() {
    let (_catalog, _script, mut cmd) = run_scenario(&[("purchase", "p1")]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,purchase,failed,"))
        .stdout(predicate::str::contains("not in the fetched catalog"));
}

#[test]
fn test_unanswered_purchase_stays_pending() {
    let (_catalog, _script, mut cmd) = run_scenario(&[
        ("fetch_products", "p1"),
        ("respond_products", ""),
        ("purchase", "p1"),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("3,purchase,pending,unresolved"));
}

#[test]
fn test_concurrent_purchases_of_distinct_products() {
    let (_catalog, _script, mut cmd) = run_scenario(&[
        ("fetch_products", "p1;p2"),
        ("respond_products", ""),
        ("purchase", "p1"),
        ("purchase", "p2"),
        ("approve_purchase", "p2"),
        ("approve_purchase", "p1"),
    ]);

    cmd.assert()
        .success()
        // p2 settles first, so its snapshot only lists p2
        .stdout(predicate::str::contains("4,purchase,resolved,p2"))
        .stdout(predicate::str::contains("3,purchase,resolved,p1;p2"))
        .stdout(predicate::str::contains(",ledger,resolved,p1;p2"));
}

#[test]
fn test_duplicate_purchase_of_in_flight_product() {
    let (_catalog, _script, mut cmd) = run_scenario(&[
        ("fetch_products", "p1"),
        ("respond_products", ""),
        ("purchase", "p1"),
        ("purchase", "p1"),
        ("approve_purchase", "p1"),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("3,purchase,resolved,p1"))
        .stdout(predicate::str::contains("4,purchase,failed,duplicate purchase attempt"));
}

#[test]
fn test_malformed_script_rows_are_reported_and_skipped() {
    let (_catalog, _script, mut cmd) = run_scenario(&[
        ("fetch_products", "p1"),
        ("levitate", "p1"),
        ("respond_products", ""),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,fetch_products,resolved,p1@1.99 USD"))
        .stdout(predicate::str::contains("2,script,failed,"));
}
