//! Remediation policy and the records a run produces.
//!
//! The policy is a pure function of one machine snapshot. Issuing the
//! commands it asks for is the application layer's job.

use std::fmt;

use serde::Serialize;

use crate::domain::machine::{Machine, PowerState, RegistrationState};

/// Label used for every maintenance-mode record.
pub const DISABLE_MAINTENANCE_LABEL: &str = "Disable maintenance mode";

// ── Records ──────────────────────────────────────────────────────────────────

/// Power action sent to the broker for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerAction {
    TurnOn,
    Reset,
}

impl PowerAction {
    /// The broker's wire name for this action.
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::TurnOn => "TurnOn",
            Self::Reset => "Reset",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A power action that the broker accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub machine_name: String,
    pub action: PowerAction,
}

/// A machine taken out of maintenance mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceModeRecord {
    pub machine_name: String,
    pub action: String,
}

impl MaintenanceModeRecord {
    #[must_use]
    pub fn new(machine_name: &str) -> Self {
        Self {
            machine_name: machine_name.to_string(),
            action: DISABLE_MAINTENANCE_LABEL.to_string(),
        }
    }
}

/// Command the broker rejected, or that never reached it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailure {
    pub machine_name: String,
    /// Human label of the command, e.g. `TurnOn` or `Disable maintenance mode`.
    pub command: String,
    pub reason: String,
}

// ── Policy ───────────────────────────────────────────────────────────────────

/// What the policy wants done to one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePlan {
    pub machine_name: String,
    /// Maintenance mode is on and must be cleared.
    pub disable_maintenance: bool,
    /// At most one power action per machine.
    pub power_action: Option<PowerAction>,
}

impl MachinePlan {
    /// True when the plan issues no command at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.disable_maintenance && self.power_action.is_none()
    }
}

/// Decide what to do with a machine.
///
/// Maintenance mode is checked independently of power state. A powered-off
/// machine is turned on; any other machine that is not registered is reset.
#[must_use]
pub fn plan_for(machine: &Machine) -> MachinePlan {
    let power_action = if machine.power_state == PowerState::Off {
        Some(PowerAction::TurnOn)
    } else if machine.registration_state != RegistrationState::Registered {
        Some(PowerAction::Reset)
    } else {
        None
    };
    MachinePlan {
        machine_name: machine.name.clone(),
        disable_maintenance: machine.in_maintenance_mode,
        power_action,
    }
}

// ── Outcome ──────────────────────────────────────────────────────────────────

/// Everything one run did, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemediationOutcome {
    pub actions: Vec<ActionRecord>,
    pub maintenance: Vec<MaintenanceModeRecord>,
    pub failures: Vec<CommandFailure>,
}

impl RemediationOutcome {
    pub fn record_action(&mut self, machine_name: &str, action: PowerAction) {
        self.actions.push(ActionRecord {
            machine_name: machine_name.to_string(),
            action,
        });
    }

    pub fn record_maintenance(&mut self, machine_name: &str) {
        self.maintenance.push(MaintenanceModeRecord::new(machine_name));
    }

    pub fn record_failure(&mut self, machine_name: &str, command: &str, reason: String) {
        self.failures.push(CommandFailure {
            machine_name: machine_name.to_string(),
            command: command.to_string(),
            reason,
        });
    }

    /// Only power actions warrant a report; maintenance records ride along.
    #[must_use]
    pub fn needs_report(&self) -> bool {
        !self.actions.is_empty()
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
