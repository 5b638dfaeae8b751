use crate::error::Result;
use crate::json_store::load_json_store;
use std::path::Path;

const COMMENTS_FIELD: &str = "Custom field (Comments)";

/// Look up the recommended action for an issue key in the normalized JSON
/// store. For now this is the raw comments field of the matching record;
/// `None` when the key is unknown or the record carries no comments.
pub async fn recommended_action(issue_key: &str, store_path: &Path) -> Result<Option<String>> {
    let records = load_json_store(store_path).await?;
    for record in &records {
        let matches = record
            .field("Issue key")
            .is_some_and(|key| key.trim() == issue_key);
        if matches {
            return Ok(record.field(COMMENTS_FIELD).map(str::to_string));
        }
    }
    Ok(None)
}
