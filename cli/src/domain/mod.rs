//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod machine;
pub mod remediation;
pub mod report;

pub use config::{MailSettings, RemediationConfig, RunSettings};
pub use error::{CommandError, ConfigError, ConnectionError, ReportDeliveryError};
pub use machine::{
    DeliveryType, ExclusionList, Machine, PowerState, RegistrationState, machine_key,
    select_candidates,
};
pub use remediation::{
    ActionRecord, CommandFailure, MachinePlan, MaintenanceModeRecord, PowerAction,
    RemediationOutcome, plan_for,
};
pub use report::{ReportPayload, build_payload};
