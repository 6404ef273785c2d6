//! Application service: report delivery.
//!
//! Writes a built report to the report store and mails it. Both steps are
//! attempted even if the other fails; the first error is returned.

use std::path::PathBuf;

use serde::Serialize;

use crate::application::ports::{Mailer, OutboundEmail, ProgressReporter, ReportStore};
use crate::domain::{MailSettings, ReportDeliveryError, ReportPayload};

/// Where a report ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub path: PathBuf,
    /// Empty when no SMTP relay is configured.
    pub emailed_to: Vec<String>,
}

/// Persist the report and send it by email.
///
/// # Errors
///
/// Returns the write error if the report file could not be written,
/// otherwise the send error if mailing failed.
pub async fn deliver_report<M: Mailer>(
    payload: &ReportPayload,
    store: &impl ReportStore,
    mail: Option<(&M, &MailSettings)>,
    reporter: &impl ProgressReporter,
) -> Result<DeliveryReceipt, ReportDeliveryError> {
    let written = store.write_report(&payload.file_name, &payload.html).await;
    match &written {
        Ok(path) => {
            tracing::info!(path = %path.display(), "report written");
            reporter.success(&format!("Report written to {}", path.display()));
        }
        Err(e) => {
            tracing::warn!(error = %e, "report not written");
            reporter.warn(&e.to_string());
        }
    }

    let mut emailed_to = Vec::new();
    let mut send_error = None;
    if let Some((mailer, settings)) = mail {
        let email = OutboundEmail {
            from: settings.sender.clone(),
            to: settings.recipients.clone(),
            subject: payload.subject.clone(),
            html: payload.html.clone(),
        };
        match mailer.send(&email).await {
            Ok(()) => {
                tracing::info!(relay = %mailer.relay(), recipients = email.to.len(), "report emailed");
                reporter.success(&format!("Report emailed to {}", email.to.join(", ")));
                emailed_to = email.to;
            }
            Err(e) => {
                tracing::warn!(relay = %mailer.relay(), error = %e, "report email failed");
                reporter.warn(&e.to_string());
                send_error = Some(e);
            }
        }
    } else {
        tracing::warn!("no SMTP server configured, report not emailed");
        reporter.warn("No SMTP server configured; report not emailed");
    }

    let path = written?;
    if let Some(e) = send_error {
        return Err(e);
    }
    Ok(DeliveryReceipt { path, emailed_to })
}
