//! Application service: machine remediation use-case.
//!
//! Fetches candidate machines, applies the remediation policy one machine at
//! a time, and hands the outcome to report delivery. Calls are strictly
//! sequential: each command is awaited before the next is issued.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::application::ports::{
    MachineCommands, MachineInventory, Mailer, ProgressReporter, ReportStore,
};
use crate::application::services::notify::{DeliveryReceipt, deliver_report};
use crate::domain::remediation::DISABLE_MAINTENANCE_LABEL;
use crate::domain::{
    ConnectionError, DeliveryType, ExclusionList, Machine, MachinePlan, MailSettings,
    RemediationOutcome, build_payload, machine_key, plan_for, select_candidates,
};

// ── Result types ──────────────────────────────────────────────────────────────

/// What happened to the report of a run.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    /// No power action was taken, so nothing was reported.
    NotNeeded,
    Delivered(DeliveryReceipt),
    Failed { reason: String },
}

/// Summary of a finished run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub controller: String,
    pub candidates: usize,
    #[serde(flatten)]
    pub outcome: RemediationOutcome,
    pub report: ReportStatus,
}

impl RunSummary {
    /// Turn partial failures into an error so the process exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if any command failed or the report could not be
    /// delivered.
    pub fn ensure_success(&self) -> Result<()> {
        let failed = self.outcome.failures.len();
        if failed > 0 {
            anyhow::bail!("{failed} remediation command(s) failed");
        }
        if let ReportStatus::Failed { reason } = &self.report {
            anyhow::bail!("remediation succeeded but the report was not delivered: {reason}");
        }
        Ok(())
    }
}

// ── Fetch ─────────────────────────────────────────────────────────────────────

/// Fetch the machines eligible for remediation.
///
/// # Errors
///
/// Returns a `ConnectionError` if the inventory cannot be read. Nothing has
/// been changed on the broker at that point.
pub async fn fetch_candidates(
    broker: &impl MachineInventory,
    exclude: &ExclusionList,
) -> Result<Vec<Machine>, ConnectionError> {
    let machines = broker.list_machines().await?;
    let total = machines.len();
    let mut seen = HashSet::new();
    for m in &machines {
        if m.delivery_type != DeliveryType::AppsOnly {
            tracing::debug!(
                machine = %m.name,
                delivery_type = m.delivery_type.as_wire(),
                "skipping machine: delivery type out of scope"
            );
        } else if exclude.contains(&m.name) {
            tracing::debug!(machine = %m.name, "skipping machine: excluded");
        } else if !seen.insert(machine_key(&m.name)) {
            tracing::debug!(machine = %m.name, "skipping machine: listed twice");
        }
    }
    let candidates = select_candidates(machines, exclude);
    tracing::debug!(
        total,
        excluded = exclude.len(),
        candidates = candidates.len(),
        "machine inventory loaded"
    );
    Ok(candidates)
}

/// Evaluate the policy for every candidate without issuing any command.
#[must_use]
pub fn plan_machines(machines: &[Machine]) -> Vec<MachinePlan> {
    machines.iter().map(plan_for).collect()
}

// ── Remediate ─────────────────────────────────────────────────────────────────

/// Apply the remediation policy to each machine in order.
///
/// A failed command is recorded and the loop moves on; records are only
/// appended for commands the broker accepted. Each machine name is handled
/// at most once, ignoring case.
pub async fn remediate_machines(
    broker: &impl MachineCommands,
    machines: &[Machine],
    reporter: &impl ProgressReporter,
) -> RemediationOutcome {
    let mut outcome = RemediationOutcome::default();
    let mut handled = HashSet::new();
    for machine in machines {
        if !handled.insert(machine_key(&machine.name)) {
            tracing::debug!(machine = %machine.name, "already handled this run, skipping");
            continue;
        }
        let plan = plan_for(machine);
        if plan.is_noop() {
            tracing::debug!(
                machine = %machine.name,
                power_state = %machine.power_state,
                registration_state = %machine.registration_state,
                "no action needed"
            );
            continue;
        }
        if plan.disable_maintenance {
            disable_maintenance(broker, &machine.name, reporter, &mut outcome).await;
        }
        if let Some(action) = plan.power_action {
            reporter.step(&format!("{action} {}...", machine.name));
            match broker.power_action(&machine.name, action).await {
                Ok(()) => {
                    tracing::info!(machine = %machine.name, %action, "power action issued");
                    reporter.success(&format!("{action} issued for {}", machine.name));
                    outcome.record_action(&machine.name, action);
                }
                Err(e) => {
                    tracing::warn!(machine = %machine.name, %action, error = %e, "power action failed");
                    reporter.warn(&e.to_string());
                    outcome.record_failure(&machine.name, action.as_wire(), e.to_string());
                }
            }
        } else {
            tracing::debug!(
                machine = %machine.name,
                "powered on and registered, no power action"
            );
        }
    }
    outcome
}

async fn disable_maintenance(
    broker: &impl MachineCommands,
    machine: &str,
    reporter: &impl ProgressReporter,
    outcome: &mut RemediationOutcome,
) {
    reporter.step(&format!("Disabling maintenance mode on {machine}..."));
    match broker.disable_maintenance_mode(machine).await {
        Ok(()) => {
            tracing::info!(machine, "maintenance mode disabled");
            reporter.success(&format!("Maintenance mode disabled on {machine}"));
            outcome.record_maintenance(machine);
        }
        Err(e) => {
            tracing::warn!(machine, error = %e, "disabling maintenance mode failed");
            reporter.warn(&e.to_string());
            outcome.record_failure(machine, DISABLE_MAINTENANCE_LABEL, e.to_string());
        }
    }
}

// ── Full run ──────────────────────────────────────────────────────────────────

/// Remediate the candidates, then build and deliver the report when any
/// power action was taken.
pub async fn remediate_and_report<M, Tz>(
    broker: &impl MachineCommands,
    controller: &str,
    candidates: &[Machine],
    store: &impl ReportStore,
    mail: Option<(&M, &MailSettings)>,
    reporter: &impl ProgressReporter,
    generated_at: &DateTime<Tz>,
) -> RunSummary
where
    M: Mailer,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let outcome = remediate_machines(broker, candidates, reporter).await;

    let report = match build_payload(&outcome, controller, generated_at) {
        None => {
            tracing::debug!("no power actions taken, skipping report");
            ReportStatus::NotNeeded
        }
        Some(payload) => match deliver_report(&payload, store, mail, reporter).await {
            Ok(receipt) => ReportStatus::Delivered(receipt),
            Err(e) => ReportStatus::Failed {
                reason: e.to_string(),
            },
        },
    };

    RunSummary {
        controller: controller.to_string(),
        candidates: candidates.len(),
        outcome,
        report,
    }
}
