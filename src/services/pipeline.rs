use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::Instrument;

use crate::app_state::AppState;
use crate::models::job::{header_row, JobRecord};
use crate::models::webhook::{MessageContent, MessageEvent};
use crate::services::reconciler::{self, ReconcileError, ReconcilePolicy, WriteOp};
use crate::services::sheets::{SheetStore, StoreError};

/// What a message did to the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No job identifier in the text; nothing written.
    Skipped,
    Appended { job_id: String },
    Updated { job_id: String, row_number: u32 },
}

impl Outcome {
    fn reply_text(&self) -> Option<String> {
        match self {
            Outcome::Skipped => None,
            Outcome::Appended { job_id } => Some(format!("Saved job {job_id} (new row).")),
            Outcome::Updated { job_id, row_number } => {
                Some(format!("Updated job {job_id} (row {row_number})."))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Upsert `record` into the sheet: snapshot, reconcile, write.
///
/// A blank sheet gets the header row first so data starts on row 2.
pub async fn apply_record(
    store: &dyn SheetStore,
    record: &JobRecord,
    policy: ReconcilePolicy,
) -> Result<Outcome, ProcessError> {
    let Some(job_id) = record.job_id() else {
        return Ok(Outcome::Skipped);
    };

    let mut rows = store.fetch_all().await?;
    if rows.is_empty() {
        let header = header_row();
        store.append(&header, None).await?;
        tracing::info!("Wrote header row to empty sheet");
        rows.push(header);
    }

    let Some(op) = reconciler::reconcile(record, &rows, policy)? else {
        return Ok(Outcome::Skipped);
    };

    match op {
        WriteOp::Update { row_number, values } => {
            store.update(row_number, &values).await?;
            metrics::counter!("sheet_writes_total", "op" => "update").increment(1);
            tracing::info!(job_id, row_number, "Updated job row");
            Ok(Outcome::Updated {
                job_id: job_id.to_string(),
                row_number,
            })
        }
        WriteOp::Append { values } => {
            store.append(&values, None).await?;
            metrics::counter!("sheet_writes_total", "op" => "append").increment(1);
            tracing::info!(job_id, "Appended job row");
            Ok(Outcome::Appended {
                job_id: job_id.to_string(),
            })
        }
    }
}

/// Run one message event through extraction, the sheet, and the reply.
///
/// Never fails: every error is logged here and, when possible, reported to
/// the sender.
pub async fn handle_message_event(state: &AppState, event: MessageEvent) {
    let span = tracing::info_span!(
        "message_event",
        event_id = event.webhook_event_id.as_deref().unwrap_or_default(),
        message_id = event.message_id().unwrap_or_default(),
        source = event.source_kind().unwrap_or_default(),
        user_id = event.user_id().unwrap_or_default(),
        group_id = event.group_id().unwrap_or_default(),
    );
    process_message_event(state, event).instrument(span).await
}

async fn process_message_event(state: &AppState, mut event: MessageEvent) {
    let text = match &event.message {
        MessageContent::Text { text, .. } => text.as_str(),
        MessageContent::Other => {
            tracing::debug!("Ignoring non-text message");
            return;
        }
    };
    metrics::counter!("webhook_events_total").increment(1);

    let record = state.extractor.extract(text);
    let job_id = record.job_id().unwrap_or_default().to_string();

    let result = AssertUnwindSafe(apply_record(state.store.as_ref(), &record, state.policy))
        .catch_unwind()
        .await;

    let reply = match result {
        Ok(Ok(outcome)) => {
            if outcome == Outcome::Skipped {
                tracing::debug!("No job ID in message, nothing written");
            }
            outcome.reply_text()
        }
        Ok(Err(ProcessError::Store(e))) => {
            metrics::counter!("sheet_errors_total").increment(1);
            tracing::error!(job_id = %job_id, error = %e, quota = e.is_quota(), "Failed to write job to sheet");
            Some(format!(
                "Could not save job {job_id}: the spreadsheet is unavailable. Please try again later."
            ))
        }
        Ok(Err(e)) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to reconcile job");
            Some(format!(
                "Could not save job {job_id}: an unexpected error occurred."
            ))
        }
        Err(_) => {
            tracing::error!(job_id = %job_id, "Panic while processing job message");
            Some(format!(
                "Could not save job {job_id}: an unexpected error occurred."
            ))
        }
    };

    let (Some(reply), Some(token)) = (reply, event.reply_token.take()) else {
        return;
    };
    if let Err(e) = state.notifier.reply(token, &reply).await {
        metrics::counter!("reply_failures_total").increment(1);
        tracing::warn!(job_id = %job_id, error = %e, "Failed to send reply");
    }
}
