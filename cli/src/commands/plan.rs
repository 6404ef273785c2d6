//! `remediate plan`: show what `run` would do, without touching anything.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use crate::app::AppContext;
use crate::application::services::remediation::plan_machines;
use crate::commands::run::{RunArgs, fetch_with_progress, load_settings};
use crate::domain::MachinePlan;
use crate::infra::broker::HttpBrokerClient;
use crate::output::{HumanRenderer, json};

#[derive(Serialize)]
struct PlanOutput<'a> {
    controller: &'a str,
    candidates: usize,
    plans: &'a [MachinePlan],
}

/// Run `remediate plan`.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the broker cannot be
/// reached.
pub async fn run(app: &AppContext, args: RunArgs) -> Result<ExitCode> {
    let settings = load_settings(app, args)?;
    let broker = HttpBrokerClient::new(&settings.controller, settings.port, settings.timeout);
    let candidates = fetch_with_progress(app, &broker, &settings.exclude).await?;
    let plans = plan_machines(&candidates);

    if app.is_json() {
        json::print(&PlanOutput {
            controller: &settings.controller,
            candidates: candidates.len(),
            plans: &plans,
        })?;
    } else {
        HumanRenderer::new(&app.output).render_plan(&settings.controller, &plans);
    }
    Ok(ExitCode::SUCCESS)
}
