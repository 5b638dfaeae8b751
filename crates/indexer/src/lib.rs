//! # QuickRef Indexer
//!
//! Incremental indexing of issue batches into the vector store: delta
//! classification by logical key and (body, owner) content identity, one
//! batched embedding call per run, append-only persistence, and a wholesale
//! rebuild of the derived ANN artifact.

mod delta;
mod error;
mod indexer;

pub use delta::{IndexDelta, IndexOutcome};
pub use error::{IndexerError, Result};
pub use indexer::Indexer;
