use crate::error::Result;
use quickref_vector_store::IssueRecord;
use std::collections::HashSet;
use std::path::Path;

/// Outcome of one append into the normalized JSON store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendSummary {
    pub added: usize,
    pub skipped_duplicates: usize,
    /// Store size after the append.
    pub total: usize,
}

/// Read the normalized store. Missing file means an empty store; an
/// unreadable file is treated the same way so a damaged store never blocks
/// a fresh ingest.
pub async fn load_json_store(path: impl AsRef<Path>) -> Result<Vec<IssueRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = tokio::fs::read(path).await?;
    match serde_json::from_slice(&bytes) {
        Ok(records) => Ok(records),
        Err(err) => {
            log::warn!(
                "JSON store {} is unreadable ({}), treating as empty",
                path.display(),
                err
            );
            Ok(Vec::new())
        }
    }
}

/// Append records to the JSON store, deduplicating on `key_field` string
/// equality. Keyless records are appended as-is since nothing can dedup
/// them. The store is replaced atomically (tmp sibling + rename).
pub async fn append_to_json_store(
    new_records: &[IssueRecord],
    path: impl AsRef<Path>,
    key_field: &str,
) -> Result<AppendSummary> {
    let path = path.as_ref();
    let mut existing = load_json_store(path).await?;

    let mut seen: HashSet<String> = existing
        .iter()
        .filter_map(|record| record.field(key_field).map(str::to_string))
        .collect();

    let mut summary = AppendSummary::default();
    for record in new_records {
        if let Some(key) = record.field(key_field) {
            if !seen.insert(key.to_string()) {
                summary.skipped_duplicates += 1;
                continue;
            }
        }
        existing.push(record.clone());
        summary.added += 1;
    }
    summary.total = existing.len();

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(&existing)?).await?;
    tokio::fs::rename(&tmp, path).await?;

    log::info!(
        "JSON store append: added={}, skipped_duplicates={}, total={}",
        summary.added,
        summary.skipped_duplicates,
        summary.total
    );
    Ok(summary)
}
