//! `remediate run`: remediate broker machines and deliver the report.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::MachineInventory;
use crate::application::services::remediation::{fetch_candidates, remediate_and_report};
use crate::domain::{ExclusionList, Machine, RemediationConfig, RunSettings};
use crate::infra::broker::HttpBrokerClient;
use crate::infra::config::YamlConfigStore;
use crate::infra::mail::SmtpMailer;
use crate::infra::report_store::{FsReportStore, default_report_dir};
use crate::output::{HumanRenderer, json, progress};

/// Arguments shared by `run` and `plan`. Each overrides the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Delivery controller host name
    #[arg(long, env = "REMEDIATE_DELIVERY_CONTROLLER")]
    pub delivery_controller: Option<String>,

    /// Delivery controller port [default: 80]
    #[arg(long, env = "REMEDIATE_DELIVERY_CONTROLLER_PORT")]
    pub delivery_controller_port: Option<u16>,

    /// Machine to skip entirely (repeatable, or comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    pub exclude_machine_name: Vec<String>,

    /// SMTP relay host; no email is sent without one
    #[arg(long, env = "REMEDIATE_SMTP_SERVER")]
    pub smtp_server: Option<String>,

    /// SMTP relay port [default: 25]
    #[arg(long, env = "REMEDIATE_SMTP_PORT")]
    pub smtp_port: Option<u16>,

    /// Report sender address
    #[arg(long, env = "REMEDIATE_SMTP_SENDER")]
    pub smtp_sender: Option<String>,

    /// Report recipient (repeatable, or comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "ADDRESS")]
    pub smtp_recipient: Vec<String>,

    /// Directory for HTML reports [default: reports/ next to the executable]
    #[arg(long, env = "REMEDIATE_REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// Timeout for each broker and SMTP call [default: 30]
    #[arg(long, env = "REMEDIATE_TIMEOUT", value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl RunArgs {
    /// Layer command-line values over the config file.
    ///
    /// Exclusions from both sources are combined; every other value given on
    /// the command line replaces the file's.
    #[must_use]
    pub fn apply(self, mut cfg: RemediationConfig) -> RemediationConfig {
        if let Some(controller) = self.delivery_controller {
            cfg.broker.controller = Some(controller);
        }
        if let Some(port) = self.delivery_controller_port {
            cfg.broker.port = port;
        }
        if let Some(timeout) = self.timeout {
            cfg.broker.timeout_secs = timeout;
        }
        cfg.broker.exclude.extend(self.exclude_machine_name);
        if let Some(server) = self.smtp_server {
            cfg.smtp.server = Some(server);
        }
        if let Some(port) = self.smtp_port {
            cfg.smtp.port = port;
        }
        if let Some(sender) = self.smtp_sender {
            cfg.smtp.sender = Some(sender);
        }
        if !self.smtp_recipient.is_empty() {
            cfg.smtp.recipients = self.smtp_recipient;
        }
        if let Some(dir) = self.report_dir {
            cfg.report.dir = Some(dir);
        }
        cfg
    }
}

/// Load the config file, apply `args`, and validate.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or the merged settings
/// are invalid.
pub fn load_settings(app: &AppContext, args: RunArgs) -> Result<RunSettings> {
    let cfg = YamlConfigStore::new(app.config_path.clone()).load()?;
    Ok(args.apply(cfg).resolve()?)
}

/// Fetch candidates, with a spinner on interactive terminals.
///
/// # Errors
///
/// Returns the `ConnectionError` if the inventory cannot be read.
pub async fn fetch_with_progress(
    app: &AppContext,
    broker: &impl MachineInventory,
    exclude: &ExclusionList,
) -> Result<Vec<Machine>> {
    let address = broker.address();
    let spinner = app
        .show_progress()
        .then(|| progress::spinner(&format!("Querying machines on {address}...")));
    let result = fetch_candidates(broker, exclude).await;
    if let Some(pb) = spinner {
        match &result {
            Ok(candidates) => progress::finish_ok(
                &pb,
                &format!("{} candidate machine(s) on {address}", candidates.len()),
            ),
            Err(_) => progress::finish_clear(&pb),
        }
    }
    Ok(result?)
}

/// Run `remediate run`.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the broker cannot be
/// reached, any command failed, or the report could not be delivered. In
/// JSON mode partial failures are carried by the summary and only turn the
/// exit code non-zero.
pub async fn run(app: &AppContext, args: RunArgs) -> Result<ExitCode> {
    let settings = load_settings(app, args)?;
    let broker = HttpBrokerClient::new(&settings.controller, settings.port, settings.timeout);
    let candidates = fetch_with_progress(app, &broker, &settings.exclude).await?;

    let report_dir = match &settings.report_dir {
        Some(dir) => dir.clone(),
        None => default_report_dir()?,
    };
    let store = FsReportStore::new(report_dir);
    tracing::debug!(dir = %store.dir().display(), "report directory");
    let mailer = settings
        .mail
        .as_ref()
        .map(|mail| (SmtpMailer::new(&mail.server, mail.port, settings.timeout), mail));
    let mail = mailer.as_ref().map(|(mailer, mail)| (mailer, *mail));

    let reporter = app.reporter();
    let summary = remediate_and_report(
        &broker,
        &settings.controller,
        &candidates,
        &store,
        mail,
        &reporter,
        &Local::now(),
    )
    .await;

    if app.is_json() {
        json::print(&summary)?;
        return Ok(if summary.ensure_success().is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }
    HumanRenderer::new(&app.output).render_summary(&summary);
    summary.ensure_success()?;
    Ok(ExitCode::SUCCESS)
}
