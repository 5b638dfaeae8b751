use crate::error::Result;
use quickref_vector_store::IssueRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const UNASSIGNED: &str = "<unassigned>";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    pub name: String,
    pub count: usize,
}

/// Tally assignees across a batch, sorted by assignment count descending
/// (name ascending on ties, so the ordering is stable across runs).
pub fn extract_team_members(records: &[IssueRecord]) -> Vec<TeamMember> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        let name = record
            .owner()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNASSIGNED);
        *counts.entry(name.to_string()).or_default() += 1;
    }

    let mut members: Vec<TeamMember> = counts
        .into_iter()
        .map(|(name, count)| TeamMember { name, count })
        .collect();
    members.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    members
}

/// Write `team_members.csv` and `team_members.json` into `dir`. Returns the
/// CSV path.
pub fn save_team_members(members: &[TeamMember], dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let csv_path = dir.join("team_members.csv");
    let mut writer = csv::Writer::from_path(&csv_path)?;
    writer.write_record(["name", "count"])?;
    for member in members {
        writer.write_record([member.name.as_str(), &member.count.to_string()])?;
    }
    writer.flush()?;

    let json_path = dir.join("team_members.json");
    std::fs::write(&json_path, serde_json::to_vec_pretty(members)?)?;

    log::info!("Saved {} team members to {}", members.len(), csv_path.display());
    Ok(csv_path)
}
