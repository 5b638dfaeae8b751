use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_ID: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_DIMENSION: usize = 384;
pub const DEFAULT_ANN_TREES: usize = 50;
pub const DEFAULT_KEY_FIELD: &str = "Issue key";
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_TOP_K: usize = 3;

/// Everything one store instance needs to locate and validate its artifacts.
///
/// The store is always addressed through an explicit handle built from this
/// config; there is no process-global store path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Identifier of the embedding model the store was built with.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Embedding dimension D. Every persisted vector row has this width.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Row-indexed provenance metadata (JSON).
    pub meta_path: PathBuf,

    /// Binary embedding matrix, `[row_count, dimension]` little-endian f32.
    pub matrix_path: PathBuf,

    /// Derived nearest-neighbor artifact. Disposable cache, never source of
    /// truth.
    pub ann_path: PathBuf,

    /// Tree count recorded in the ANN artifact header.
    #[serde(default = "default_ann_trees")]
    pub ann_trees: usize,

    /// Field holding the logical record key.
    #[serde(default = "default_key_field")]
    pub key_field: String,

    /// Minimum cosine similarity for a reference to be returned.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Maximum number of references per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl StoreConfig {
    /// Store layout rooted in `dir`, all other knobs at their defaults.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            dimension: DEFAULT_DIMENSION,
            meta_path: dir.join("meta.json"),
            matrix_path: dir.join("embeddings.bin"),
            ann_path: dir.join("index.ann"),
            ann_trees: DEFAULT_ANN_TREES,
            key_field: DEFAULT_KEY_FIELD.to_string(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

const fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

const fn default_ann_trees() -> usize {
    DEFAULT_ANN_TREES
}

fn default_key_field() -> String {
    DEFAULT_KEY_FIELD.to_string()
}

const fn default_score_threshold() -> f32 {
    DEFAULT_SCORE_THRESHOLD
}

const fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
