use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Value stored for any field whose pattern did not match.
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of sheet columns a job row occupies (A..=L).
pub const COLUMN_COUNT: usize = JobField::COUNT;

/// Columns of a job row, in sheet order. The variant order is the column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum JobField {
    #[strum(serialize = "Job ID")]
    JobId,
    #[strum(serialize = "Date")]
    Date,
    #[strum(serialize = "CM Team")]
    CmTeam,
    #[strum(serialize = "Tel")]
    Tel,
    #[strum(serialize = "No. CM")]
    SequenceNo,
    #[strum(serialize = "Priority Job")]
    Priority,
    #[strum(serialize = "NOC time assign")]
    AssignTime,
    #[strum(serialize = "Accept time")]
    AcceptTime,
    #[strum(serialize = "No Alarm time")]
    NoAlarmTime,
    #[strum(serialize = "Detail down")]
    DetailDown,
    #[strum(serialize = "CM Zone")]
    Zone,
    #[strum(serialize = "Material used")]
    Materials,
}

impl JobField {
    /// Zero-based column index in the sheet.
    pub fn column(self) -> usize {
        self as usize
    }

    /// Spreadsheet letter of the last job column ("L").
    pub fn last_column_letter() -> char {
        (b'A' + (COLUMN_COUNT as u8 - 1)) as char
    }
}

/// One work order as stored in a single sheet row.
///
/// Every field holds either the extracted text or [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    values: [String; COLUMN_COUNT],
}

impl Default for JobRecord {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| NOT_AVAILABLE.to_string()),
        }
    }
}

impl JobRecord {
    pub fn get(&self, field: JobField) -> &str {
        &self.values[field.column()]
    }

    pub fn set(&mut self, field: JobField, value: impl Into<String>) {
        let value = value.into();
        self.values[field.column()] = if value.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            value
        };
    }

    pub fn is_available(&self, field: JobField) -> bool {
        self.get(field) != NOT_AVAILABLE
    }

    /// The job identifier, or `None` when the message carried none.
    pub fn job_id(&self) -> Option<&str> {
        self.is_available(JobField::JobId)
            .then(|| self.get(JobField::JobId))
    }

    /// Cell values in column order.
    pub fn to_row(&self) -> Vec<String> {
        self.values.to_vec()
    }

    /// Rebuild a record from stored cells. Missing trailing cells and empty
    /// cells read as [`NOT_AVAILABLE`]; extra cells are ignored.
    pub fn from_row(row: &[String]) -> Self {
        let mut record = Self::default();
        for field in JobField::iter() {
            if let Some(cell) = row.get(field.column()) {
                record.set(field, cell.trim());
            }
        }
        record
    }

    /// Fill every unavailable field of `self` from `prior`.
    pub fn merged_over(mut self, prior: &JobRecord) -> Self {
        for field in JobField::iter() {
            if !self.is_available(field) && prior.is_available(field) {
                self.values[field.column()] = prior.get(field).to_string();
            }
        }
        self
    }
}

/// Header labels for row 1 of the sheet.
pub fn header_row() -> Vec<String> {
    JobField::iter().map(|f| f.to_string()).collect()
}
