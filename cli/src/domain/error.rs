//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Broker connection errors ──────────────────────────────────────────────────

/// The broker inventory could not be read. Fatal: nothing has been touched yet.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Cannot reach delivery controller at {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Not authorized by delivery controller at {address} (HTTP {status})")]
    Unauthorized { address: String, status: u16 },

    #[error("Delivery controller at {address} answered HTTP {status}")]
    UnexpectedStatus { address: String, status: u16 },

    #[error("Invalid machine list from {address}: {reason}")]
    InvalidResponse { address: String, reason: String },
}

// ── Command errors ────────────────────────────────────────────────────────────

/// A mutating call for one machine failed. Counted, never fatal on its own.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("'{command}' for {machine} rejected (HTTP {status}): {detail}")]
    Rejected {
        machine: String,
        command: String,
        status: u16,
        detail: String,
    },

    #[error("'{command}' for {machine} failed: {reason}")]
    Transport {
        machine: String,
        command: String,
        reason: String,
    },
}

// ── Report delivery errors ────────────────────────────────────────────────────

/// Writing or mailing the report failed after remediation already happened.
#[derive(Debug, Error)]
pub enum ReportDeliveryError {
    #[error("Cannot write report {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Cannot build report email: {0}")]
    Build(String),

    #[error("Cannot send report via {server}: {reason}")]
    Send { server: String, reason: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors in the merged configuration, raised before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "No delivery controller configured. Pass --delivery-controller or set broker.controller in the config file."
    )]
    MissingController,

    #[error("Invalid {key}: port must be between 1 and 65535")]
    InvalidPort { key: String },

    #[error("Invalid timeout: must be at least 1 second")]
    InvalidTimeout,

    #[error("SMTP server '{server}' is configured but {missing} is missing")]
    IncompleteSmtp { server: String, missing: String },
}
