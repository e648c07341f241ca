use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::job::header_row;
use crate::services::sheets::{SheetStore, StoreError};

/// In-process sheet for local runs without Google credentials.
///
/// Starts with the header row, like a freshly prepared spreadsheet.
pub struct MemorySheetStore {
    rows: Mutex<Vec<Vec<String>>>,
}

impl Default for MemorySheetStore {
    fn default() -> Self {
        Self::with_rows(vec![header_row()])
    }
}

impl MemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl SheetStore for MemorySheetStore {
    async fn fetch_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.snapshot().await)
    }

    async fn update(&self, row_number: u32, values: &[String]) -> Result<(), StoreError> {
        let index = row_index(row_number)?;
        let mut rows = self.rows.lock().await;
        if rows.len() <= index {
            rows.resize_with(index + 1, Vec::new);
        }
        rows[index] = values.to_vec();
        Ok(())
    }

    async fn append(&self, values: &[String], position: Option<u32>) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        match position {
            None => rows.push(values.to_vec()),
            Some(row_number) => {
                let index = row_index(row_number)?.min(rows.len());
                rows.insert(index, values.to_vec());
            }
        }
        Ok(())
    }
}

fn row_index(row_number: u32) -> Result<usize, StoreError> {
    match row_number {
        0 => Err(StoreError::InvalidRow(row_number)),
        n => Ok(n as usize - 1),
    }
}
