//! E2E CLI tests covering:
//! - Offer intake (`tl offers sync`): TIER night cap, exclusions, storage
//! - Listing stored sailings (`tl offers list`) and the missing-profile error
//! - The favorites ledger (`tl favorites add/check/toggle/list`)
//!
//! Each test runs `tl` as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the tl binary, rooted in `dir`.
fn tl_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tl"));
    cmd.current_dir(dir);
    cmd.env("TIDELINE_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

/// Run a command expected to succeed with `--json` and parse stdout.
fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = tl_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("command should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), value.to_string()).expect("write fixture");
}

/// Two offers: a TIER offer with a 7- and a 9-night sailing, and a regular
/// offer that arrived without sailings.
fn offers_payload() -> Value {
    json!({
        "offers": [
            {
                "offerCode": "25TIER05",
                "offerName": "Tier Credit",
                "category": "TIER",
                "sailings": [
                    {
                        "shipCode": "WN",
                        "shipName": "Wonder of the Seas",
                        "sailDate": "2025-03-09",
                        "itineraryDescription": "7 Night Western Caribbean: Miami, Cozumel, Roatan",
                        "roomType": "Balcony"
                    },
                    {
                        "shipCode": "WN",
                        "shipName": "Wonder of the Seas",
                        "sailDate": "2025-04-12",
                        "itineraryDescription": "9 Night Southern Caribbean: Miami, Aruba"
                    }
                ]
            },
            {"offerCode": "25EMPTY", "offerName": "Empty", "sailings": []}
        ]
    })
}

fn sync_profile(dir: &Path, profile: &str) -> Value {
    write_json(dir, "offers.json", &offers_payload());
    run_json(dir, &["offers", "sync", "--input", "offers.json", "--profile", profile])
}

// ---------------------------------------------------------------------------
// Offers
// ---------------------------------------------------------------------------

#[test]
fn sync_prunes_and_stores_under_profile() {
    let dir = TempDir::new().expect("tempdir");
    let report = sync_profile(dir.path(), "gobo-alice");

    assert_eq!(report["received"], 2);
    assert_eq!(report["kept"], 1);
    assert_eq!(report["sailings"], 1);
    assert_eq!(report["profile"], "gobo-alice");
    assert_eq!(report["profile_id"], 1);
    assert_eq!(report["offers"][0]["sailings"][0]["sailDate"], "2025-03-09");
    assert!(dir.path().join(".tideline/store").is_dir());
}

#[test]
fn sync_applies_exclusions_without_storing() {
    let dir = TempDir::new().expect("tempdir");
    write_json(dir.path(), "offers.json", &offers_payload());
    write_json(
        dir.path(),
        "exclude.json",
        &json!([{"shipCode": "WN", "sailDate": "2025-03-09"}]),
    );

    let report = run_json(
        dir.path(),
        &["offers", "sync", "--input", "offers.json", "--exclude", "exclude.json"],
    );
    assert_eq!(report["kept"], 0);
    assert!(report.get("profile").is_none());
}

#[test]
fn list_shows_stored_sailings() {
    let dir = TempDir::new().expect("tempdir");
    sync_profile(dir.path(), "gobo-alice");

    let rows = run_json(dir.path(), &["offers", "list", "--profile", "gobo-alice"]);
    let rows = rows.as_array().expect("array of rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["offer_code"], "25TIER05");
    assert_eq!(rows[0]["nights"], 7);
    assert_eq!(rows[0]["ports"], json!(["Miami", "Cozumel", "Roatan"]));

    tl_cmd(dir.path())
        .args(["offers", "list", "--profile", "gobo-alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25TIER05\t"))
        .stdout(predicate::str::contains("2025-03-09\t7N\tBalcony"));
}

#[test]
fn list_unknown_profile_reports_error_code() {
    let dir = TempDir::new().expect("tempdir");
    let output = tl_cmd(dir.path())
        .args(["offers", "list", "--profile", "gobo-nobody", "--json"])
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());

    let err: Value = serde_json::from_slice(&output.stderr).expect("error JSON on stderr");
    assert_eq!(err["error"]["error_code"], "E2001");
    assert!(
        err["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("gobo-nobody"))
    );
}

#[test]
fn refetch_without_credentials_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    write_json(dir.path(), "offers.json", &offers_payload());
    tl_cmd(dir.path())
        .args(["offers", "sync", "--input", "offers.json", "--refetch"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

fn entry_args<'a>(verb: &'a str) -> Vec<&'a str> {
    vec![
        "favorites",
        verb,
        "--offer-code",
        "25TIER05",
        "--ship",
        "Wonder of the Seas",
        "--date",
        "2025-03-09",
        "--source",
        "gobo-alice",
    ]
}

#[test]
fn favorite_lifecycle() {
    let dir = TempDir::new().expect("tempdir");
    sync_profile(dir.path(), "gobo-alice");

    let added = run_json(dir.path(), &entry_args("add"));
    assert_eq!(added["outcome"], "added");
    assert_eq!(added["favorite"], true);

    let again = run_json(dir.path(), &entry_args("add"));
    assert_eq!(again["outcome"], "already-present");

    let check = run_json(dir.path(), &entry_args("check"));
    assert_eq!(check["favorite"], true);
    assert!(check.get("outcome").is_none());

    let listed = run_json(dir.path(), &["favorites", "list"]);
    let listed = listed.as_array().expect("array of rows");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["sail_date"], "2025-03-09");

    let toggled = run_json(dir.path(), &entry_args("toggle"));
    assert_eq!(toggled["outcome"], "removed");
    assert_eq!(toggled["count"], 1);
    assert_eq!(toggled["favorite"], false);

    tl_cmd(dir.path())
        .args(["favorites", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no sailings)"));
}

#[test]
fn favorite_from_unknown_sailing_fails() {
    let dir = TempDir::new().expect("tempdir");
    sync_profile(dir.path(), "gobo-alice");

    let output = tl_cmd(dir.path())
        .args([
            "favorites",
            "add",
            "--offer-code",
            "25TIER05",
            "--ship",
            "Wonder of the Seas",
            "--date",
            "2030-01-01",
            "--source",
            "gobo-alice",
            "--json",
        ])
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("error JSON on stderr");
    assert_eq!(err["error"]["error_code"], "E2002");
}

#[test]
fn remove_missing_favorite_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let removed = run_json(
        dir.path(),
        &[
            "favorites",
            "remove",
            "--offer-code",
            "X",
            "--ship",
            "Icon of the Seas",
            "--date",
            "2025-01-01",
        ],
    );
    assert_eq!(removed["outcome"], "not-found");
    assert_eq!(removed["favorite"], false);
}
