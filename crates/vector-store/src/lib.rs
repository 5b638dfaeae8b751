//! # QuickRef Vector Store
//!
//! Durable embedding storage for issue records: a monotonically growing
//! mapping from dense row ids to (unit vector, provenance) pairs, plus the
//! derived nearest-neighbor artifact rebuilt from it.
//!
//! ## Architecture
//!
//! ```text
//! IssueRecord[]
//!     │
//!     ├──> Embedder (opaque batch encoding service)
//!     │      └─> raw vector[D] -> L2 normalize
//!     │
//!     ├──> Snapshot (matrix row i ↔ metadata row i)
//!     │      └─> VectorStore::save (atomic two-artifact replace)
//!     │
//!     └──> AnnIndex (disposable artifact, rebuilt wholesale)
//! ```
//!
//! The store is append-only: a changed record appends a superseding row and
//! the old row stays put, so previously assigned row ids remain stable across
//! every indexing run.

mod ann;
mod config;
mod embedder;
mod error;
mod record;
mod snapshot;
mod store;

pub use ann::AnnIndex;
pub use config::{
    StoreConfig, DEFAULT_ANN_TREES, DEFAULT_DIMENSION, DEFAULT_KEY_FIELD, DEFAULT_MODEL_ID,
    DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K,
};
pub use embedder::{Embedder, FailingEmbedder, HashingEmbedder};
pub use error::{Result, VectorStoreError};
pub use record::{IssueRecord, KeyExtractor, RowMeta, BODY_FIELD, ID_FIELD, OWNER_FIELD};
pub use snapshot::{l2_normalize_rows, matrix_from_vectors, Snapshot, NORM_EPSILON};
pub use store::VectorStore;
