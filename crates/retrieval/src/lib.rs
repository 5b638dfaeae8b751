//! Similarity retrieval engine.
//!
//! Answers "which stored issues look like this one?" by scoring each query
//! record against every persisted vector:
//!
//! ```text
//! query records --> batch embed --> normalize
//!                                      |
//!                                      v
//!                        dot product vs stored matrix
//!                                      |
//!                    rank desc -> self-skip -> threshold -> top_k
//!                                      |
//!                                      v
//!                     references + score diagnostics per query
//! ```
//!
//! Scoring is exact: the engine scans the full matrix rather than consulting
//! the persisted ANN artifact, so the reported max/min/mean are true values
//! over every stored row.

mod diagnostics;
mod engine;
mod error;

pub use diagnostics::{
    CandidatePreview, QueryDiagnostics, Reference, RetrievalResult, PREVIEW_LIMIT,
};
pub use engine::RetrievalEngine;
pub use error::{Result, RetrievalError};
