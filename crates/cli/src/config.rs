use anyhow::{Context, Result};
use quickref_vector_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory the default layout roots every artifact in.
const DEFAULT_OUT_DIR: &str = "out";

/// Top-level TOML configuration: the vector store layout plus the ingest
/// side's file locations.
///
/// ```toml
/// [store]
/// dimension = 384
/// score_threshold = 0.5
///
/// [ingest]
/// issues_csv = "data/issues.csv"
/// load_team_members = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_store")]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPaths {
    /// Issue export to ingest.
    #[serde(default = "default_issues_csv")]
    pub issues_csv: PathBuf,

    /// Normalized, deduplicated issue store.
    #[serde(default = "default_json_store")]
    pub json_store: PathBuf,

    /// Assignee rotation state.
    #[serde(default = "default_rotation_csv")]
    pub rotation_csv: PathBuf,

    /// Where team_members.{csv,json} are written.
    #[serde(default = "default_team_dir")]
    pub team_dir: PathBuf,

    /// Tally and save team members on every ingest.
    #[serde(default)]
    pub load_team_members: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            ingest: IngestPaths::default(),
        }
    }
}

impl Default for IngestPaths {
    fn default() -> Self {
        Self {
            issues_csv: default_issues_csv(),
            json_store: default_json_store(),
            rotation_csv: default_rotation_csv(),
            team_dir: default_team_dir(),
            load_team_members: false,
        }
    }
}

impl AppConfig {
    /// Read TOML config from `path`. A missing file yields the default
    /// layout under `out/`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }
}

fn default_store() -> StoreConfig {
    StoreConfig::in_dir(DEFAULT_OUT_DIR)
}

fn default_issues_csv() -> PathBuf {
    PathBuf::from("data/issues.csv")
}

fn default_json_store() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR).join("issues_normalized.json")
}

fn default_rotation_csv() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR).join("assignees.csv")
}

fn default_team_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let config = AppConfig::load(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.store.dimension, 384);
        assert_eq!(config.ingest.json_store, Path::new("out/issues_normalized.json"));
        assert!(!config.ingest.load_team_members);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quickref.toml");
        std::fs::write(
            &path,
            "[store]\n\
             dimension = 128\n\
             meta_path = \"store/meta.json\"\n\
             matrix_path = \"store/embeddings.bin\"\n\
             ann_path = \"store/index.ann\"\n\
             \n\
             [ingest]\n\
             issues_csv = \"exports/latest.csv\"\n\
             load_team_members = true\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.store.dimension, 128);
        assert_eq!(config.store.top_k, 3);
        assert_eq!(config.ingest.issues_csv, Path::new("exports/latest.csv"));
        assert!(config.ingest.load_team_members);
        assert_eq!(config.ingest.rotation_csv, Path::new("out/assignees.csv"));
    }
}
