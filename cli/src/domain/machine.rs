//! Broker machine snapshot and candidate selection.
//!
//! Pure types and functions only, no I/O, no async.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Enums ────────────────────────────────────────────────────────────────────

/// How a machine's sessions are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryType {
    /// Published applications only. The only delivery type remediated.
    AppsOnly,
    DesktopsOnly,
    DesktopsAndApps,
    /// Any value the broker reports that this tool does not know.
    Other(String),
}

/// Power state as reported by the broker's hypervisor connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
    TurningOn,
    TurningOff,
    Suspended,
    Unmanaged,
    Unknown(String),
}

/// Whether the machine's agent is registered with the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Registered,
    Unregistered,
    Initializing,
    AgentError,
    Unknown(String),
}

impl DeliveryType {
    /// Parse the broker's wire name.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "AppsOnly" => Self::AppsOnly,
            "DesktopsOnly" => Self::DesktopsOnly,
            "DesktopsAndApps" => Self::DesktopsAndApps,
            other => Self::Other(other.to_string()),
        }
    }

    /// The broker's wire name.
    #[must_use]
    pub fn as_wire(&self) -> &str {
        match self {
            Self::AppsOnly => "AppsOnly",
            Self::DesktopsOnly => "DesktopsOnly",
            Self::DesktopsAndApps => "DesktopsAndApps",
            Self::Other(s) => s,
        }
    }
}

impl PowerState {
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "On" => Self::On,
            "Off" => Self::Off,
            "TurningOn" => Self::TurningOn,
            "TurningOff" => Self::TurningOff,
            "Suspended" => Self::Suspended,
            "Unmanaged" => Self::Unmanaged,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_wire(&self) -> &str {
        match self {
            Self::On => "On",
            Self::Off => "Off",
            Self::TurningOn => "TurningOn",
            Self::TurningOff => "TurningOff",
            Self::Suspended => "Suspended",
            Self::Unmanaged => "Unmanaged",
            Self::Unknown(s) => s,
        }
    }
}

impl RegistrationState {
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "Registered" => Self::Registered,
            "Unregistered" => Self::Unregistered,
            "Initializing" => Self::Initializing,
            "AgentError" => Self::AgentError,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Registered => "Registered",
            Self::Unregistered => "Unregistered",
            Self::Initializing => "Initializing",
            Self::AgentError => "AgentError",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

// ── Machine ──────────────────────────────────────────────────────────────────

/// Read-only snapshot of one broker machine, taken once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    /// Broker machine name, usually `DOMAIN\host`.
    pub name: String,
    pub delivery_type: DeliveryType,
    pub power_state: PowerState,
    pub registration_state: RegistrationState,
    /// Whether the machine is excluded from session assignment.
    pub in_maintenance_mode: bool,
}

/// Wire shape of a machine in the broker's inventory response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRecord {
    pub machine_name: String,
    pub delivery_type: String,
    pub power_state: String,
    pub registration_state: String,
    #[serde(default)]
    pub in_maintenance_mode: bool,
}

impl From<MachineRecord> for Machine {
    fn from(record: MachineRecord) -> Self {
        Self {
            delivery_type: DeliveryType::from_wire(&record.delivery_type),
            power_state: PowerState::from_wire(&record.power_state),
            registration_state: RegistrationState::from_wire(&record.registration_state),
            in_maintenance_mode: record.in_maintenance_mode,
            name: record.machine_name,
        }
    }
}

// ── Exclusion list ───────────────────────────────────────────────────────────

/// Machine names to leave untouched. Matching ignores ASCII case and
/// surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    names: Vec<String>,
}

impl ExclusionList {
    /// Build from configured names; blank entries are dropped.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| machine_key(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let needle = machine_key(name);
        self.names.iter().any(|n| *n == needle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Keep `AppsOnly` machines that are not excluded, preserving broker order.
/// A name listed twice (ignoring case) is kept once, at its first position.
#[must_use]
pub fn select_candidates(machines: Vec<Machine>, exclude: &ExclusionList) -> Vec<Machine> {
    let mut seen = HashSet::new();
    machines
        .into_iter()
        .filter(|m| m.delivery_type == DeliveryType::AppsOnly && !exclude.contains(&m.name))
        .filter(|m| seen.insert(machine_key(&m.name)))
        .collect()
}

/// Identity of a machine name: trimmed, ASCII-lowercased. Two inventory
/// entries with the same key are the same machine.
#[must_use]
pub fn machine_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
