//! End-to-end tests for `remediate run` and `remediate plan`.
//!
//! Each test runs the binary against a local fake broker and a temporary
//! config file, so no user configuration leaks in.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use predicates::prelude::*;
use tempfile::TempDir;

use crate::cli_tests::remediate;
use crate::fake_broker::FakeBroker;

const INVENTORY: &str = r#"[
  {"machineName":"vm1","deliveryType":"AppsOnly","powerState":"Off","registrationState":"Unregistered","inMaintenanceMode":false},
  {"machineName":"vm2","deliveryType":"AppsOnly","powerState":"On","registrationState":"Unregistered","inMaintenanceMode":false},
  {"machineName":"vm3","deliveryType":"AppsOnly","powerState":"On","registrationState":"Registered","inMaintenanceMode":false},
  {"machineName":"desk1","deliveryType":"DesktopsOnly","powerState":"Off","registrationState":"Unregistered","inMaintenanceMode":true},
  {"machineName":"VM-SKIP","deliveryType":"AppsOnly","powerState":"Off","registrationState":"Unregistered","inMaintenanceMode":true}
]"#;

const MAINTENANCE_INVENTORY: &str = r#"[
  {"machineName":"vm7","deliveryType":"AppsOnly","powerState":"Off","registrationState":"Registered","inMaintenanceMode":true}
]"#;

const HEALTHY_INVENTORY: &str = r#"[
  {"machineName":"vm3","deliveryType":"AppsOnly","powerState":"On","registrationState":"Registered"}
]"#;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, content).expect("write config");
    path
}

fn report_files(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.expect("entry").path())
            .filter(|p| p.extension().is_some_and(|x| x == "html"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

// --- Configuration errors ---

#[test]
fn test_run_without_controller_fails_before_network() {
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");
    remediate()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No delivery controller configured"));
}

#[test]
fn test_run_without_controller_json_error() {
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");
    let output = remediate()
        .args(["run", "--json", "--config"])
        .arg(&config)
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "config_error");
}

#[test]
fn test_run_with_missing_config_file_fails() {
    let tmp = TempDir::new().expect("tempdir");
    remediate()
        .args(["run", "--delivery-controller", "127.0.0.1", "--config"])
        .arg(tmp.path().join("absent.yaml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_run_with_incomplete_smtp_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(
        tmp.path(),
        "broker:\n  controller: 127.0.0.1\nsmtp:\n  server: smtp.example.com\n",
    );
    remediate()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SMTP server"));
}

// --- Connection errors ---

#[test]
fn test_run_unreachable_controller_exits_one_without_report() {
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let reports = tmp.path().join("reports");
    remediate()
        .args(["run", "--delivery-controller", "127.0.0.1", "--timeout", "5"])
        .arg("--delivery-controller-port")
        .arg(port.to_string())
        .arg("--report-dir")
        .arg(&reports)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot reach delivery controller"));
    assert!(report_files(&reports).is_empty());
}

// --- Full runs ---

#[test]
fn test_run_remediates_and_writes_report() {
    let (mut broker, listing) = FakeBroker::start(INVENTORY);
    let turn_on = broker.power_action("vm1", "TurnOn", 200);
    let reset = broker.power_action("vm2", "Reset", 200);
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(
        tmp.path(),
        &format!(
            "broker:\n  controller: 127.0.0.1\n  port: {}\n  exclude:\n    - vm-skip\n",
            broker.port()
        ),
    );
    let reports = tmp.path().join("reports");

    remediate()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--report-dir")
        .arg(&reports)
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary:"));

    listing.assert();
    turn_on.assert();
    reset.assert();

    let files = report_files(&reports);
    assert_eq!(files.len(), 1);
    let html = std::fs::read_to_string(&files[0]).expect("read report");
    assert!(html.contains("Machine Remediation Report"));
    assert!(html.contains("vm1"));
    assert!(!html.contains("desk1"));
    assert!(!html.contains("VM-SKIP"));
}

#[test]
fn test_run_json_summary() {
    let (mut broker, _listing) = FakeBroker::start(INVENTORY);
    let _turn_on = broker.power_action("vm1", "TurnOn", 200);
    let _reset = broker.power_action("vm2", "Reset", 200);
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");

    let output = remediate()
        .args(["run", "--json", "--delivery-controller", "127.0.0.1"])
        .args(["--exclude-machine-name", "vm-skip"])
        .arg("--delivery-controller-port")
        .arg(broker.port())
        .arg("--report-dir")
        .arg(tmp.path().join("reports"))
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run");

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["candidates"], 3);
    assert_eq!(value["actions"][0]["machineName"], "vm1");
    assert_eq!(value["actions"][0]["action"], "TurnOn");
    assert_eq!(value["actions"][1]["action"], "Reset");
    assert_eq!(value["report"]["status"], "delivered");
}

#[test]
fn test_run_disables_maintenance_before_reporting() {
    let (mut broker, _listing) = FakeBroker::start(MAINTENANCE_INVENTORY);
    let maintenance = broker.disable_maintenance("vm7");
    let turn_on = broker.power_action("vm7", "TurnOn", 200);
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");
    let reports = tmp.path().join("reports");

    remediate()
        .args(["run", "--delivery-controller", "127.0.0.1"])
        .arg("--delivery-controller-port")
        .arg(broker.port())
        .arg("--report-dir")
        .arg(&reports)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    maintenance.assert();
    turn_on.assert();
    let html = std::fs::read_to_string(&report_files(&reports)[0]).expect("read report");
    assert!(html.contains("Disable maintenance mode"));
}

#[test]
fn test_run_healthy_fleet_writes_no_report() {
    let (mut broker, listing) = FakeBroker::start(HEALTHY_INVENTORY);
    let commands = broker.no_commands();
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");
    let reports = tmp.path().join("reports");

    remediate()
        .args(["run", "--delivery-controller", "127.0.0.1"])
        .arg("--delivery-controller-port")
        .arg(broker.port())
        .arg("--report-dir")
        .arg(&reports)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    listing.assert();
    commands.assert();
    assert!(report_files(&reports).is_empty());
}

#[test]
fn test_run_rejected_commands_exit_one_after_trying_every_machine() {
    let (mut broker, _listing) = FakeBroker::start(INVENTORY);
    let turn_on = broker.power_action("vm1", "TurnOn", 500);
    let reset = broker.power_action("vm2", "Reset", 500);
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");
    let reports = tmp.path().join("reports");

    remediate()
        .args(["run", "--delivery-controller", "127.0.0.1"])
        .args(["--exclude-machine-name", "vm-skip"])
        .arg("--delivery-controller-port")
        .arg(broker.port())
        .arg("--report-dir")
        .arg(&reports)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("2 remediation command(s) failed"));

    turn_on.assert();
    reset.assert();
    assert!(report_files(&reports).is_empty());
}

// --- Plan ---

#[test]
fn test_plan_issues_no_commands() {
    let (mut broker, listing) = FakeBroker::start(INVENTORY);
    let commands = broker.no_commands();
    let tmp = TempDir::new().expect("tempdir");
    let config = write_config(tmp.path(), "{}\n");

    let output = remediate()
        .args(["plan", "--json", "--delivery-controller", "127.0.0.1"])
        .arg("--delivery-controller-port")
        .arg(broker.port())
        .arg("--config")
        .arg(&config)
        .output()
        .expect("plan");

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["candidates"], 4);
    assert_eq!(value["plans"][0]["powerAction"], "TurnOn");
    assert_eq!(value["plans"][3]["disableMaintenance"], true);
    listing.assert();
    commands.assert();
}
