//! Human-readable terminal renderer.

use crate::application::services::remediation::{ReportStatus, RunSummary};
use crate::domain::{MachinePlan, PowerAction};
use crate::output::OutputContext;

/// Renders run results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        self.ctx.info(&format!("remediate v{version}"));
    }

    /// Render the decisions `run` would take.
    pub fn render_plan(&self, controller: &str, plans: &[MachinePlan]) {
        self.ctx.kv("Controller:", controller);
        self.ctx.count("Candidates:", plans.len(), false);
        if self.ctx.quiet {
            return;
        }
        let pending: Vec<_> = plans.iter().filter(|p| !p.is_noop()).collect();
        if pending.is_empty() {
            println!();
            self.ctx.success("All machines healthy, nothing to do");
            return;
        }
        self.ctx.header("Planned actions:");
        for plan in pending {
            self.ctx.info(&format!(
                "{}: {}",
                plan.machine_name,
                describe_plan(plan)
            ));
        }
    }

    /// Render the end-of-run summary. Failed commands are listed on stderr
    /// even when `quiet`.
    pub fn render_summary(&self, summary: &RunSummary) {
        self.ctx.header("Summary:");
        self.ctx.kv("Controller:", &summary.controller);
        self.ctx.count("Candidates:", summary.candidates, false);
        self.ctx
            .count("Power actions:", summary.outcome.actions.len(), false);
        self.ctx
            .count("Maintenance:", summary.outcome.maintenance.len(), false);
        self.ctx
            .count("Failures:", summary.outcome.failures.len(), true);
        match &summary.report {
            ReportStatus::NotNeeded => self.ctx.kv("Report:", "not needed"),
            ReportStatus::Delivered(receipt) => {
                self.ctx.kv("Report:", &receipt.path.display().to_string());
            }
            ReportStatus::Failed { reason } => {
                self.ctx.kv("Report:", &format!("failed ({reason})"));
            }
        }
        for failure in &summary.outcome.failures {
            self.ctx.error(&format!(
                "{} {}: {}",
                failure.command, failure.machine_name, failure.reason
            ));
        }
    }
}

/// One-line description of a plan, e.g. `Disable maintenance mode, TurnOn`.
#[must_use]
pub fn describe_plan(plan: &MachinePlan) -> String {
    let mut parts = Vec::new();
    if plan.disable_maintenance {
        parts.push(crate::domain::remediation::DISABLE_MAINTENANCE_LABEL.to_string());
    }
    match plan.power_action {
        Some(PowerAction::TurnOn) => parts.push("TurnOn".to_string()),
        Some(PowerAction::Reset) => parts.push("Reset".to_string()),
        None => {}
    }
    if parts.is_empty() {
        "no action".to_string()
    } else {
        parts.join(", ")
    }
}
