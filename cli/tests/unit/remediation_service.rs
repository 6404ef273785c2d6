//! Unit tests for the remediation service.
//!
//! All broker, store and mailer calls go through the recording mocks; no
//! network or filesystem access.

#![allow(clippy::expect_used)]

use chrono::{TimeZone, Utc};
use remediate_cli::application::services::remediation::{
    ReportStatus, fetch_candidates, plan_machines, remediate_and_report, remediate_machines,
};
use remediate_cli::domain::{
    ActionRecord, ConnectionError, DeliveryType, ExclusionList, MailSettings, PowerAction,
    PowerState, RegistrationState,
};

use crate::mocks::{
    FakeBroker, NoopReporter, RecordingMailer, RecordingReporter, RecordingStore, healthy,
    machine,
};

fn mail_settings() -> MailSettings {
    MailSettings {
        server: "smtp.example.com".to_string(),
        port: 25,
        sender: "remediate@example.com".to_string(),
        recipients: vec!["ops@example.com".to_string()],
    }
}

fn scenario_machines() -> Vec<remediate_cli::domain::Machine> {
    vec![
        machine(
            "vm1",
            DeliveryType::AppsOnly,
            PowerState::Off,
            RegistrationState::Unregistered,
            false,
        ),
        machine(
            "vm2",
            DeliveryType::AppsOnly,
            PowerState::On,
            RegistrationState::Unregistered,
            false,
        ),
        healthy("vm3"),
    ]
}

// ── fetch_candidates ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_candidates_drops_other_delivery_types_and_exclusions() {
    let broker = FakeBroker::new(vec![
        healthy("keep"),
        machine(
            "desktop",
            DeliveryType::DesktopsOnly,
            PowerState::Off,
            RegistrationState::Unregistered,
            true,
        ),
        healthy("SKIP-ME"),
    ]);
    let exclude = ExclusionList::new(["skip-me"]);

    let candidates = fetch_candidates(&broker, &exclude)
        .await
        .expect("inventory");

    let names: Vec<_> = candidates.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["keep"]);
}

#[tokio::test]
async fn test_fetch_candidates_unreachable_broker_returns_connection_error() {
    let broker = FakeBroker::unreachable();
    let err = fetch_candidates(&broker, &ExclusionList::default())
        .await
        .expect_err("should fail");
    assert!(matches!(err, ConnectionError::Unreachable { .. }));
    assert!(broker.calls().is_empty());
}

#[test]
fn test_plan_machines_issues_no_commands() {
    let plans = plan_machines(&scenario_machines());
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0].power_action, Some(PowerAction::TurnOn));
    assert_eq!(plans[1].power_action, Some(PowerAction::Reset));
    assert!(plans[2].is_noop());
}

// ── remediate_machines ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_remediate_machines_turns_on_off_and_resets_unregistered() {
    let broker = FakeBroker::new(scenario_machines());
    let outcome = remediate_machines(&broker, &scenario_machines(), &NoopReporter).await;

    assert_eq!(
        outcome.actions,
        [
            ActionRecord {
                machine_name: "vm1".to_string(),
                action: PowerAction::TurnOn,
            },
            ActionRecord {
                machine_name: "vm2".to_string(),
                action: PowerAction::Reset,
            },
        ]
    );
    assert!(outcome.maintenance.is_empty());
    assert!(outcome.failures.is_empty());
    assert_eq!(broker.calls(), ["TurnOn vm1", "Reset vm2"]);
}

#[tokio::test]
async fn test_remediate_machines_disables_maintenance_before_power_action() {
    let machines = vec![machine(
        "vm1",
        DeliveryType::AppsOnly,
        PowerState::Off,
        RegistrationState::Registered,
        true,
    )];
    let broker = FakeBroker::new(machines.clone());
    let outcome = remediate_machines(&broker, &machines, &NoopReporter).await;

    assert_eq!(broker.calls(), ["DisableMaintenance vm1", "TurnOn vm1"]);
    assert_eq!(outcome.maintenance.len(), 1);
    assert_eq!(outcome.maintenance[0].machine_name, "vm1");
    assert_eq!(outcome.maintenance[0].action, "Disable maintenance mode");
    assert_eq!(outcome.actions.len(), 1);
}

#[tokio::test]
async fn test_remediate_machines_maintenance_only_does_not_need_report() {
    let machines = vec![machine(
        "vm1",
        DeliveryType::AppsOnly,
        PowerState::On,
        RegistrationState::Registered,
        true,
    )];
    let broker = FakeBroker::new(machines.clone());
    let outcome = remediate_machines(&broker, &machines, &NoopReporter).await;

    assert_eq!(outcome.maintenance.len(), 1);
    assert!(outcome.actions.is_empty());
    assert!(!outcome.needs_report());
}

#[tokio::test]
async fn test_remediate_machines_failure_is_isolated_to_one_machine() {
    let broker = FakeBroker::new(scenario_machines()).failing("TurnOn vm1");
    let reporter = RecordingReporter::default();
    let outcome = remediate_machines(&broker, &scenario_machines(), &reporter).await;

    assert_eq!(broker.calls(), ["TurnOn vm1", "Reset vm2"]);
    assert_eq!(outcome.actions.len(), 1);
    assert_eq!(outcome.actions[0].machine_name, "vm2");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].machine_name, "vm1");
    assert_eq!(outcome.failures[0].command, "TurnOn");
    assert_eq!(reporter.warnings.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn test_remediate_machines_failed_maintenance_still_runs_power_action() {
    let machines = vec![machine(
        "vm1",
        DeliveryType::AppsOnly,
        PowerState::Off,
        RegistrationState::Registered,
        true,
    )];
    let broker = FakeBroker::new(machines.clone()).failing("DisableMaintenance vm1");
    let outcome = remediate_machines(&broker, &machines, &NoopReporter).await;

    assert_eq!(broker.calls(), ["DisableMaintenance vm1", "TurnOn vm1"]);
    assert!(outcome.maintenance.is_empty());
    assert_eq!(outcome.actions.len(), 1);
    assert_eq!(outcome.failures[0].command, "Disable maintenance mode");
}

#[tokio::test]
async fn test_remediate_machines_empty_input_issues_nothing() {
    let broker = FakeBroker::new(Vec::new());
    let outcome = remediate_machines(&broker, &[], &NoopReporter).await;
    assert!(broker.calls().is_empty());
    assert!(outcome.actions.is_empty());
}

// ── remediate_and_report ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_remediate_and_report_writes_and_mails_report() {
    let broker = FakeBroker::new(scenario_machines());
    let store = RecordingStore::default();
    let mailer = RecordingMailer::default();
    let settings = mail_settings();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).single().expect("time");

    let summary = remediate_and_report(
        &broker,
        "ddc01",
        &scenario_machines(),
        &store,
        Some((&mailer, &settings)),
        &NoopReporter,
        &at,
    )
    .await;

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.outcome.actions.len(), 2);
    let ReportStatus::Delivered(receipt) = &summary.report else {
        panic!("expected delivered report, got {:?}", summary.report);
    };
    assert_eq!(receipt.emailed_to, ["ops@example.com"]);

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "2024-05-01T06-30-00.html");
    assert!(writes[0].1.contains("vm1"));
    assert!(writes[0].1.contains("vm2"));
    assert!(!writes[0].1.contains("vm3"));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, "remediate@example.com");
    assert!(sent[0].subject.contains("ddc01"));
    assert_eq!(sent[0].html, writes[0].1);
    assert!(summary.ensure_success().is_ok());
}

#[tokio::test]
async fn test_remediate_and_report_all_healthy_skips_report() {
    let machines = vec![healthy("vm1"), healthy("vm2")];
    let broker = FakeBroker::new(machines.clone());
    let store = RecordingStore::default();
    let mailer = RecordingMailer::default();
    let settings = mail_settings();

    let summary = remediate_and_report(
        &broker,
        "ddc01",
        &machines,
        &store,
        Some((&mailer, &settings)),
        &NoopReporter,
        &Utc::now(),
    )
    .await;

    assert!(matches!(summary.report, ReportStatus::NotNeeded));
    assert!(store.writes().is_empty());
    assert!(mailer.sent().is_empty());
    assert!(broker.calls().is_empty());
}

#[tokio::test]
async fn test_remediate_and_report_partial_failure_fails_summary() {
    let broker = FakeBroker::new(scenario_machines()).failing("Reset vm2");
    let store = RecordingStore::default();

    let summary = remediate_and_report(
        &broker,
        "ddc01",
        &scenario_machines(),
        &store,
        None::<(&RecordingMailer, &MailSettings)>,
        &NoopReporter,
        &Utc::now(),
    )
    .await;

    assert!(matches!(summary.report, ReportStatus::Delivered(_)));
    let err = summary.ensure_success().expect_err("should fail");
    assert!(err.to_string().contains("1 remediation command(s) failed"));
}

#[tokio::test]
async fn test_remediate_and_report_delivery_failure_is_reported() {
    let broker = FakeBroker::new(scenario_machines());
    let store = RecordingStore::failing();

    let summary = remediate_and_report(
        &broker,
        "ddc01",
        &scenario_machines(),
        &store,
        None::<(&RecordingMailer, &MailSettings)>,
        &NoopReporter,
        &Utc::now(),
    )
    .await;

    assert!(matches!(summary.report, ReportStatus::Failed { .. }));
    let err = summary.ensure_success().expect_err("should fail");
    assert!(err.to_string().contains("report was not delivered"));
}

#[tokio::test]
async fn test_run_summary_serializes_flat_json() {
    let broker = FakeBroker::new(scenario_machines());
    let store = RecordingStore::default();
    let summary = remediate_and_report(
        &broker,
        "ddc01",
        &scenario_machines(),
        &store,
        None::<(&RecordingMailer, &MailSettings)>,
        &NoopReporter,
        &Utc::now(),
    )
    .await;

    let value = serde_json::to_value(&summary).expect("serialize");
    assert_eq!(value["controller"], "ddc01");
    assert_eq!(value["candidates"], 3);
    assert!(value["actions"].is_array());
    assert_eq!(value["report"]["status"], "delivered");
}

// ── End to end through the fetcher ────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_then_remediate_turns_on_vm1_resets_vm2_and_skips_vm3() {
    let broker = FakeBroker::new(vec![
        machine(
            "vm1",
            DeliveryType::AppsOnly,
            PowerState::Off,
            RegistrationState::Registered,
            false,
        ),
        machine(
            "vm2",
            DeliveryType::AppsOnly,
            PowerState::On,
            RegistrationState::Unregistered,
            false,
        ),
        machine(
            "vm3",
            DeliveryType::Other("DesktopsOnly".to_string()),
            PowerState::Off,
            RegistrationState::Unregistered,
            false,
        ),
    ]);
    let store = RecordingStore::default();
    let mailer = RecordingMailer::default();
    let settings = mail_settings();

    let candidates = fetch_candidates(&broker, &ExclusionList::default())
        .await
        .expect("inventory");
    let summary = remediate_and_report(
        &broker,
        "ddc01",
        &candidates,
        &store,
        Some((&mailer, &settings)),
        &NoopReporter,
        &Utc::now(),
    )
    .await;

    assert_eq!(
        summary.outcome.actions,
        [
            ActionRecord {
                machine_name: "vm1".to_string(),
                action: PowerAction::TurnOn,
            },
            ActionRecord {
                machine_name: "vm2".to_string(),
                action: PowerAction::Reset,
            },
        ]
    );
    assert_eq!(broker.calls(), ["TurnOn vm1", "Reset vm2"]);
    assert_eq!(store.writes().len(), 1);
    assert_eq!(mailer.sent().len(), 1);
    assert!(summary.ensure_success().is_ok());
}

// ── Duplicate inventory entries ───────────────────────────────────────────────

#[tokio::test]
async fn test_machine_listed_twice_is_remediated_once() {
    let off = |name: &str| {
        machine(
            name,
            DeliveryType::AppsOnly,
            PowerState::Off,
            RegistrationState::Registered,
            false,
        )
    };
    let broker = FakeBroker::new(vec![off("vm1"), off("VM1")]);

    let candidates = fetch_candidates(&broker, &ExclusionList::default())
        .await
        .expect("inventory");
    let outcome = remediate_machines(&broker, &candidates, &NoopReporter).await;

    assert_eq!(candidates.len(), 1);
    assert_eq!(outcome.actions.len(), 1);
    assert_eq!(outcome.actions[0].machine_name, "vm1");
    assert_eq!(broker.calls(), ["TurnOn vm1"]);
}

#[tokio::test]
async fn test_remediate_machines_skips_repeated_names_in_input() {
    let machines = vec![
        machine(
            "vm2",
            DeliveryType::AppsOnly,
            PowerState::On,
            RegistrationState::Unregistered,
            true,
        ),
        machine(
            " Vm2",
            DeliveryType::AppsOnly,
            PowerState::On,
            RegistrationState::Unregistered,
            true,
        ),
    ];
    let broker = FakeBroker::new(machines.clone());
    let outcome = remediate_machines(&broker, &machines, &NoopReporter).await;

    assert_eq!(broker.calls(), ["DisableMaintenance vm2", "Reset vm2"]);
    assert_eq!(outcome.actions.len(), 1);
    assert_eq!(outcome.maintenance.len(), 1);
}
