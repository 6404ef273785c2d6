//! Domain types and validation for remediation configuration.
//!
//! Pure functions only, no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::machine::ExclusionList;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_BROKER_PORT: u16 = 80;
pub const DEFAULT_SMTP_PORT: u16 = 25;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration file (`config.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RemediationConfig {
    pub broker: BrokerConfig,
    pub smtp: SmtpConfig,
    pub report: ReportConfig,
}

/// Delivery controller connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Delivery controller host name.
    pub controller: Option<String>,
    pub port: u16,
    /// Per-call timeout for broker and SMTP calls.
    pub timeout_secs: u64,
    /// Machine names to skip entirely.
    pub exclude: Vec<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            controller: None,
            port: DEFAULT_BROKER_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            exclude: Vec::new(),
        }
    }
}

/// Mail relay settings. Mail is sent only when `server` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: Option<String>,
    pub port: u16,
    pub sender: Option<String>,
    pub recipients: Vec<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: DEFAULT_SMTP_PORT,
            sender: None,
            recipients: Vec::new(),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReportConfig {
    /// Reports directory. Defaults to `reports/` beside the executable.
    pub dir: Option<PathBuf>,
}

// ── Resolved settings ────────────────────────────────────────────────────────

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub controller: String,
    pub port: u16,
    pub timeout: Duration,
    pub exclude: ExclusionList,
    pub mail: Option<MailSettings>,
    pub report_dir: Option<PathBuf>,
}

/// Complete SMTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub server: String,
    pub port: u16,
    pub sender: String,
    pub recipients: Vec<String>,
}

impl RemediationConfig {
    /// Validate the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no controller is set, a port is zero, the timeout
    /// is zero, or SMTP is only partly configured.
    pub fn resolve(self) -> Result<RunSettings, ConfigError> {
        let controller = non_blank(self.broker.controller).ok_or(ConfigError::MissingController)?;
        if self.broker.port == 0 {
            return Err(ConfigError::InvalidPort {
                key: "broker.port".to_string(),
            });
        }
        if self.broker.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        let mail = resolve_mail(self.smtp)?;
        Ok(RunSettings {
            controller,
            port: self.broker.port,
            timeout: Duration::from_secs(self.broker.timeout_secs),
            exclude: ExclusionList::new(&self.broker.exclude),
            mail,
            report_dir: self.report.dir,
        })
    }
}

fn resolve_mail(smtp: SmtpConfig) -> Result<Option<MailSettings>, ConfigError> {
    let Some(server) = non_blank(smtp.server) else {
        return Ok(None);
    };
    if smtp.port == 0 {
        return Err(ConfigError::InvalidPort {
            key: "smtp.port".to_string(),
        });
    }
    let Some(sender) = non_blank(smtp.sender) else {
        return Err(ConfigError::IncompleteSmtp {
            server,
            missing: "a sender address".to_string(),
        });
    };
    let recipients: Vec<String> = smtp
        .recipients
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if recipients.is_empty() {
        return Err(ConfigError::IncompleteSmtp {
            server,
            missing: "a recipient address".to_string(),
        });
    }
    Ok(Some(MailSettings {
        server,
        port: smtp.port,
        sender,
        recipients,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
