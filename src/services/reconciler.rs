//! Decides how an extracted job record lands in the sheet.
//!
//! Works on a snapshot taken by `SheetStore::fetch_all`. Two deliveries for
//! the same job racing between snapshot and write are not serialized; the
//! later write wins and a double append is possible.

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::models::job::{JobField, JobRecord};

/// Sheet row number of the first data row (row 1 is the header).
pub const FIRST_DATA_ROW: u32 = 2;

/// What happens to stored values when a later message omits a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReconcilePolicy {
    /// Fields that extract as N/A keep the stored value.
    #[default]
    Merge,
    /// The stored row is replaced wholesale.
    Overwrite,
}

/// A single write against the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Update { row_number: u32, values: Vec<String> },
    Append { values: Vec<String> },
}

impl WriteOp {
    pub fn values(&self) -> &[String] {
        match self {
            WriteOp::Update { values, .. } | WriteOp::Append { values } => values,
        }
    }
}

/// Plan the write for `record` given all current sheet rows (header included).
///
/// Returns `Ok(None)` when the record has no job identifier.
pub fn reconcile(
    record: &JobRecord,
    rows: &[Vec<String>],
    policy: ReconcilePolicy,
) -> Result<Option<WriteOp>, ReconcileError> {
    let Some(job_id) = record.job_id() else {
        return Ok(None);
    };

    let matches: Vec<(u32, &Vec<String>)> = rows
        .iter()
        .skip(1)
        .zip(FIRST_DATA_ROW..)
        .filter(|(row, _)| row.get(JobField::JobId.column()).map(|c| c.trim()) == Some(job_id))
        .map(|(row, number)| (number, row))
        .collect();

    let op = match matches.as_slice() {
        [] => WriteOp::Append {
            values: record.to_row(),
        },
        [(row_number, stored)] => {
            let values = match policy {
                ReconcilePolicy::Overwrite => record.to_row(),
                ReconcilePolicy::Merge => record
                    .clone()
                    .merged_over(&JobRecord::from_row(stored))
                    .to_row(),
            };
            WriteOp::Update {
                row_number: *row_number,
                values,
            }
        }
        many => {
            return Err(ReconcileError::DuplicateJobId {
                job_id: job_id.to_string(),
                rows: many.iter().map(|(n, _)| *n).collect(),
            })
        }
    };

    Ok(Some(op))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Job ID '{job_id}' appears on multiple rows: {rows:?}")]
    DuplicateJobId { job_id: String, rows: Vec<u32> },
}
