//! Report payload construction.
//!
//! Building the payload is pure: the caller passes the generation time in,
//! and gets back `None` when the run did nothing worth reporting.

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use crate::domain::remediation::RemediationOutcome;

pub const REPORT_TITLE: &str = "Machine Remediation Report";

/// A rendered report, ready to be written to disk and mailed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPayload {
    /// File name inside the reports directory, e.g. `2024-05-01T06-30-00.html`.
    pub file_name: String,
    /// Mail subject line.
    pub subject: String,
    /// Full HTML document.
    pub html: String,
}

/// Build the report for a finished run.
///
/// Returns `None` unless at least one power action was taken.
#[must_use]
pub fn build_payload<Tz>(
    outcome: &RemediationOutcome,
    controller: &str,
    generated_at: &DateTime<Tz>,
) -> Option<ReportPayload>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if !outcome.needs_report() {
        return None;
    }
    let stamp = generated_at.format("%Y-%m-%dT%H:%M:%S").to_string();
    Some(ReportPayload {
        file_name: report_file_name(&stamp),
        subject: format!("Machine remediation report - {controller}"),
        html: render_html(outcome, controller, &stamp),
    })
}

/// File name for a timestamp: `:` is not portable in file names.
#[must_use]
pub fn report_file_name(stamp: &str) -> String {
    format!("{}.html", stamp.replace(':', "-"))
}

fn render_html(outcome: &RemediationOutcome, controller: &str, stamp: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{STYLE}</head>\n<body>\n<h1>{title}</h1>\n<p>Delivery controller <b>{controller}</b>, generated {stamp}</p>\n",
        title = REPORT_TITLE,
        controller = escape_html(controller),
        stamp = escape_html(stamp),
    );

    html.push_str("<h2>Power actions</h2>\n");
    push_table(
        &mut html,
        &["Machine", "Action"],
        outcome
            .actions
            .iter()
            .map(|r| vec![r.machine_name.clone(), r.action.to_string()]),
    );

    if !outcome.maintenance.is_empty() {
        html.push_str("<h2>Maintenance mode</h2>\n");
        push_table(
            &mut html,
            &["Machine", "Action"],
            outcome
                .maintenance
                .iter()
                .map(|r| vec![r.machine_name.clone(), r.action.clone()]),
        );
    }

    if !outcome.failures.is_empty() {
        html.push_str("<h2>Failed commands</h2>\n");
        push_table(
            &mut html,
            &["Machine", "Command", "Reason"],
            outcome
                .failures
                .iter()
                .map(|f| vec![f.machine_name.clone(), f.command.clone(), f.reason.clone()]),
        );
    }

    html.push_str("</body>\n</html>\n");
    html
}

const STYLE: &str = "<style>\n\
body { font-family: Segoe UI, Arial, sans-serif; font-size: 13px; }\n\
table { border-collapse: collapse; margin-bottom: 16px; }\n\
th, td { border: 1px solid #999; padding: 4px 8px; text-align: left; }\n\
th { background: #254090; color: #fff; }\n\
</style>\n";

fn push_table(html: &mut String, headers: &[&str], rows: impl Iterator<Item = Vec<String>>) {
    html.push_str("<table>\n<tr>");
    for h in headers {
        let _ = write!(html, "<th>{}</th>", escape_html(h));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape_html(&cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

/// Escape text for use in HTML element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ── Unit tests ───────────────────────────────────────────────────────────────
