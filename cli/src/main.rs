//! Remediate - power on, reset and un-maintain broker machines, then mail a report

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use remediate_cli::cli::Cli;
use remediate_cli::domain::{ConfigError, ConnectionError};
use remediate_cli::output::json;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json_mode = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            if json_mode {
                match json::format_error(&message, error_code(&e)) {
                    Ok(out) => println!("{out}"),
                    Err(_) => eprintln!("Error: {message}"),
                }
            } else {
                eprintln!("Error: {message}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("remediate_cli={level},warn"))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn error_code(e: &anyhow::Error) -> &'static str {
    if e.downcast_ref::<ConnectionError>().is_some() {
        "connection_error"
    } else if e.downcast_ref::<ConfigError>().is_some() {
        "config_error"
    } else {
        "remediation_failed"
    }
}
