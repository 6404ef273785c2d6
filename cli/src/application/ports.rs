//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;

use crate::domain::{CommandError, ConnectionError, Machine, PowerAction, ReportDeliveryError};

// ── Value Types ───────────────────────────────────────────────────────────────

/// An HTML email ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

// ── Broker Port Traits ────────────────────────────────────────────────────────

/// Read access to the broker's machine inventory.
#[allow(async_fn_in_trait)]
pub trait MachineInventory {
    /// Fetch every `AppsOnly` machine the broker knows about, in broker order.
    ///
    /// Implementations may return machines of other delivery types; callers
    /// filter again.
    async fn list_machines(&self) -> Result<Vec<Machine>, ConnectionError>;

    /// Human-readable address of the broker, for logs and reports.
    fn address(&self) -> String;
}

/// Mutating broker calls for a single machine.
#[allow(async_fn_in_trait)]
pub trait MachineCommands {
    /// Send a power action (turn on or reset).
    async fn power_action(&self, machine: &str, action: PowerAction) -> Result<(), CommandError>;
    /// Take a machine out of maintenance mode.
    async fn disable_maintenance_mode(&self, machine: &str) -> Result<(), CommandError>;
}

// ── Report Delivery Ports ─────────────────────────────────────────────────────

/// Persists rendered reports.
#[allow(async_fn_in_trait)]
pub trait ReportStore {
    /// Write `html` under `file_name` and return the full path written.
    async fn write_report(
        &self,
        file_name: &str,
        html: &str,
    ) -> Result<PathBuf, ReportDeliveryError>;
}

/// Sends report emails.
#[allow(async_fn_in_trait)]
pub trait Mailer {
    /// Deliver one message to all of its recipients.
    async fn send(&self, email: &OutboundEmail) -> Result<(), ReportDeliveryError>;

    /// Relay address, for logs.
    fn relay(&self) -> String;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
