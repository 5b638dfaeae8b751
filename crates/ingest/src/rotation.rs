use crate::error::Result;
use crate::json_store::load_json_store;
use std::path::Path;

/// Values an assignee cell may carry that mean "nobody".
const NOBODY: [&str; 5] = ["", "none", "null", "unassigned", "n/a"];

fn is_somebody(name: &str) -> bool {
    !NOBODY.contains(&name.trim().to_lowercase().as_str())
}

/// Round-robin assignee rotation persisted as a one-column CSV.
///
/// The front of the queue is the least recently suggested member. Each
/// `advance()` returns the front and moves it to the back, so repeated
/// calls cycle through the whole team.
#[derive(Debug, Clone, Default)]
pub struct RotationQueue {
    order: Vec<String>,
}

impl RotationQueue {
    /// Load the rotation from its CSV, falling back to a rebuild from the
    /// JSON store's assignees when the CSV is missing or holds no usable
    /// names.
    pub async fn load(csv_path: &Path, store_path: &Path) -> Result<Self> {
        let mut queue = Self::from_csv(csv_path).unwrap_or_else(|err| {
            log::warn!("Rotation CSV {} unreadable: {}", csv_path.display(), err);
            Self::default()
        });
        if queue.order.is_empty() {
            log::info!("Rotation CSV empty or missing, rebuilding from JSON store");
            queue = Self::from_store(store_path).await?;
        }
        Ok(queue)
    }

    fn from_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut order = Vec::new();
        for row in reader.records() {
            let row = row?;
            let Some(name) = row.get(0).map(str::trim) else {
                continue;
            };
            if is_somebody(name) && !order.iter().any(|n| n == name) {
                order.push(name.to_string());
            }
        }
        Ok(Self { order })
    }

    /// First-seen assignee order from the normalized JSON store.
    async fn from_store(path: &Path) -> Result<Self> {
        let records = load_json_store(path).await?;
        let mut order = Vec::new();
        for record in &records {
            let Some(name) = record.owner().map(str::trim) else {
                continue;
            };
            if is_somebody(name) && !order.iter().any(|n| n == name) {
                order.push(name.to_string());
            }
        }
        Ok(Self { order })
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn members(&self) -> &[String] {
        &self.order
    }

    /// Take the least recently suggested member and rotate it to the back.
    pub fn advance(&mut self) -> Option<String> {
        if self.order.is_empty() {
            return None;
        }
        let next = self.order.remove(0);
        self.order.push(next.clone());
        Some(next)
    }

    /// Persist the current order as a one-column CSV with an `assignee`
    /// header.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["assignee"])?;
        for name in &self.order {
            writer.write_record([name.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Suggest the next assignee and persist the rotated order. Returns `None`
/// when neither the CSV nor the store knows any assignee.
pub async fn next_assignee(csv_path: &Path, store_path: &Path) -> Result<Option<String>> {
    let mut queue = RotationQueue::load(csv_path, store_path).await?;
    let Some(next) = queue.advance() else {
        log::info!("No assignees found in rotation CSV or JSON store");
        return Ok(None);
    };
    queue.save(csv_path)?;
    Ok(Some(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_store::append_to_json_store;
    use pretty_assertions::assert_eq;
    use quickref_vector_store::IssueRecord;
    use tempfile::TempDir;

    fn issue(key: &str, assignee: &str) -> IssueRecord {
        let mut record = IssueRecord::new();
        record.set("Issue key", key);
        record.set("Summary", "s");
        record.set("Assignee", assignee);
        record
    }

    #[tokio::test]
    async fn rotation_cycles_through_the_team() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("assignees.csv");
        let store_path = dir.path().join("issues.json");
        append_to_json_store(
            &[issue("P-1", "ann"), issue("P-2", "ben"), issue("P-3", "cara")],
            &store_path,
            "Issue key",
        )
        .await
        .unwrap();

        let mut picks = Vec::new();
        for _ in 0..4 {
            picks.push(next_assignee(&csv_path, &store_path).await.unwrap().unwrap());
        }
        assert_eq!(picks, vec!["ann", "ben", "cara", "ann"]);
    }

    #[tokio::test]
    async fn csv_order_wins_over_store_order() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("assignees.csv");
        let store_path = dir.path().join("issues.json");
        std::fs::write(&csv_path, "assignee\ncara\nann\n").unwrap();

        let next = next_assignee(&csv_path, &store_path).await.unwrap();
        assert_eq!(next.as_deref(), Some("cara"));

        let queue = RotationQueue::load(&csv_path, &store_path).await.unwrap();
        assert_eq!(queue.members(), ["ann", "cara"]);
    }

    #[tokio::test]
    async fn nobody_markers_are_not_assignees() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("assignees.csv");
        let store_path = dir.path().join("issues.json");
        append_to_json_store(
            &[issue("P-1", "Unassigned"), issue("P-2", "N/A")],
            &store_path,
            "Issue key",
        )
        .await
        .unwrap();

        assert_eq!(next_assignee(&csv_path, &store_path).await.unwrap(), None);
        assert!(!csv_path.exists());
    }
}
