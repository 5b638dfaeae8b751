use crate::error::{IngestError, Result};
use csv::{ReaderBuilder, Trim};
use quickref_vector_store::IssueRecord;
use std::path::Path;

/// Fields a row must populate to be worth indexing.
pub const REQUIRED_FIELDS: [&str; 4] = ["Issue Type", "Issue key", "Issue id", "Summary"];

/// Export artifacts pad empty cells with these markers.
pub const PLACEHOLDERS: [&str; 9] = ["", "None", "none", "NULL", "null", "########", "N/A", "NA", "-"];

/// Outcome of one CSV load.
#[derive(Debug, Clone, Default)]
pub struct CsvLoad {
    pub records: Vec<IssueRecord>,
    pub skipped: usize,
}

pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.contains(&value.trim())
}

/// True when every required field is present and not a placeholder.
pub fn mandatory_populated(record: &IssueRecord) -> bool {
    REQUIRED_FIELDS
        .iter()
        .all(|field| record.field(field).is_some_and(|v| !is_placeholder(v)))
}

/// Load issue rows from a CSV export, keeping only rows with all required
/// fields populated. Header names and cell values are whitespace-trimmed.
pub fn load_issues_csv(path: impl AsRef<Path>) -> Result<CsvLoad> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IngestError::Other(format!(
            "CSV {} is empty or missing a header row",
            path.display()
        )));
    }
    if !headers.iter().any(|h| REQUIRED_FIELDS.contains(&h)) {
        log::warn!(
            "CSV {} headers carry none of the required issue fields",
            path.display()
        );
    }

    let mut load = CsvLoad::default();
    for row in reader.records() {
        let row = row?;
        let mut record = IssueRecord::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            record.set(header, value);
        }
        if mandatory_populated(&record) {
            load.records.push(record);
        } else {
            load.skipped += 1;
        }
    }

    log::info!(
        "CSV load complete: loaded={}, skipped={}, source={}",
        load.records.len(),
        load.skipped,
        path.display()
    );
    Ok(load)
}
