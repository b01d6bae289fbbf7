use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;

fn apx_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("apx"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

fn seed_cache(root: &Path) {
    let envelope = json!({
        "mod": {
            "mod": {"name": "Cup", "version": "1.0"},
            "cars": {
                "111": {"component": {"name": "CarA", "version": "1.0", "update": false}},
                "222": {"component": {"name": "CarB", "version": "2.0.9apx", "update": true}}
            },
            "track": {
                "333": {"component": {"name": "Spa", "version": "3.1", "update": false}}
            }
        },
        "port": 64297
    });
    fs::write(
        root.join("apx.json"),
        serde_json::to_string_pretty(&envelope).expect("serialize"),
    )
    .expect("seed cache");
}

#[test]
fn config_show_applies_root_override() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");

    apx_cmd(home.path())
        .args(["--root"])
        .arg(root.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains(root.path().display().to_string()))
        .stdout(contains("apx_suffix:    .9apx"))
        .stdout(contains("steam_app_id:  365960"));
}

#[test]
fn config_set_root_persists_to_home() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");

    apx_cmd(home.path())
        .args(["config", "set-root"])
        .arg(root.path())
        .assert()
        .success();

    let saved = fs::read_to_string(home.path().join(".apx").join("config.yaml")).expect("config");
    assert!(saved.contains(&root.path().display().to_string()));

    apx_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains(root.path().display().to_string()));
}

#[test]
fn status_without_cache_points_to_connect() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");

    apx_cmd(home.path())
        .arg("--root")
        .arg(root.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No mod applied"));
}

#[test]
fn status_json_reports_live_installed_state() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    seed_cache(root.path());
    fs::create_dir_all(root.path().join("Installed/Vehicles/CarA/1.0")).expect("CarA");
    fs::create_dir_all(root.path().join("Installed/Vehicles/CarB/2.0")).expect("CarB base");

    let output = apx_cmd(home.path())
        .arg("--root")
        .arg(root.path())
        .args(["status", "--json"])
        .output()
        .expect("run apx");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("status JSON");
    assert_eq!(report["mod"]["name"], "Cup");
    assert_eq!(report["port"], 64297);

    let components = report["components"].as_array().expect("components");
    let names: Vec<_> = components.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["CarA", "CarB", "Spa"], "cars before track, descriptor order");
    assert_eq!(components[0]["installed"], true);
    assert_eq!(components[1]["installed"], false);
    assert_eq!(components[1]["base_installed"], true);
    assert_eq!(components[2]["category"], "Locations");
    assert_eq!(components[2]["installed"], false);
}

#[test]
fn suffixed_base_component_counts_as_installed_under_its_base_version() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    let envelope = json!({
        "mod": {
            "mod": {"name": "Cup", "version": "1.0"},
            "cars": {"111": {"component": {"name": "CarA", "version": "1.0.9apx", "update": false}}},
            "track": {}
        },
        "port": 64297
    });
    fs::write(root.path().join("apx.json"), envelope.to_string()).expect("seed cache");
    fs::create_dir_all(root.path().join("Installed/Vehicles/CarA/1.0")).expect("CarA base");

    let output = apx_cmd(home.path())
        .arg("--root")
        .arg(root.path())
        .args(["status", "--json"])
        .output()
        .expect("run apx");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("status JSON");
    assert_eq!(report["components"][0]["installed"], true);
    assert_eq!(report["components"][0]["base_installed"], Value::Null);
}

#[test]
fn missing_components_hint_mentions_clearing_the_cache() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    seed_cache(root.path());

    apx_cmd(home.path())
        .arg("--root")
        .arg(root.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("3 missing"))
        .stdout(contains("apx.json and run 'apx connect <target>' again"));
}

#[test]
fn corrupt_cache_is_reported_not_ignored() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    fs::write(root.path().join("apx.json"), "{ not json").expect("corrupt cache");

    apx_cmd(home.path())
        .arg("--root")
        .arg(root.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("apx.json"));
}

#[test]
fn remove_updates_deletes_only_update_tiers() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    seed_cache(root.path());
    let base = root.path().join("Installed/Vehicles/CarA/1.0");
    let update = root.path().join("Installed/Vehicles/CarB/2.0.9apx");
    fs::create_dir_all(&base).expect("base");
    fs::create_dir_all(&update).expect("update");
    fs::write(update.join("car.mas"), b"x").expect("update file");

    apx_cmd(home.path())
        .arg("--root")
        .arg(root.path())
        .arg("remove-updates")
        .assert()
        .success()
        .stdout(contains("removed 1 update(s) of 'Cup 1.0'"));

    assert!(base.exists());
    assert!(!update.exists());
}

#[test]
fn connect_rejects_target_without_scheme() {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");

    apx_cmd(home.path())
        .arg("--root")
        .arg(root.path())
        .args(["connect", "localhost:8080"])
        .assert()
        .failure()
        .stderr(contains("invalid target"));

    assert!(!root.path().join("apx.json").exists());
}
