use crate::diagnostics::{
    CandidatePreview, QueryDiagnostics, Reference, RetrievalResult, PREVIEW_LIMIT,
};
use crate::error::Result;
use quickref_vector_store::{
    l2_normalize_rows, matrix_from_vectors, Embedder, IssueRecord, KeyExtractor, VectorStore,
};
use std::sync::Arc;

/// Longest summary excerpt carried in a reference.
const SNIPPET_LEN: usize = 160;

/// Similarity retrieval over the persisted store.
///
/// Read-only: each query batch loads a snapshot, scores every stored row
/// exactly (dot product of unit vectors), and never touches the ANN
/// artifact. Concurrent queries are safe as long as no indexing run is in
/// flight.
pub struct RetrievalEngine {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
}

impl RetrievalEngine {
    pub fn new(store: VectorStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Rank stored rows against each query record.
    ///
    /// Candidates whose key equals the query's own key are skipped before
    /// the threshold check. A query/stored embedding width mismatch does
    /// not fail the call: every result in the batch comes back with empty
    /// references and a `dimension_mismatch` diagnostic.
    pub async fn query(
        &self,
        records: &[IssueRecord],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.store.load().await?;
        let config = self.store.config();
        let extractor = KeyExtractor::for_key_field(&config.key_field);

        let texts: Vec<String> = records
            .iter()
            .map(|record| record.body().to_string())
            .collect();
        let query_vectors = self.embedder.encode(&texts).await?;
        if query_vectors.len() != records.len() {
            return Err(quickref_vector_store::VectorStoreError::EmbeddingError(format!(
                "embedder returned {} vectors for {} queries",
                query_vectors.len(),
                records.len()
            ))
            .into());
        }

        // Width mismatch degrades the whole batch instead of raising.
        let stored_dim = snapshot.dimension();
        if let Some(first) = query_vectors.first() {
            if first.len() != stored_dim {
                let diag = QueryDiagnostics::dimension_mismatch(first.len(), stored_dim);
                return Ok(records
                    .iter()
                    .map(|record| RetrievalResult {
                        input_key: extractor.extract(record).unwrap_or_default(),
                        input_summary: record.body().to_string(),
                        references: Vec::new(),
                        diagnostics: diag.clone(),
                    })
                    .collect());
            }
        }

        let mut queries = matrix_from_vectors(query_vectors, stored_dim)?;
        l2_normalize_rows(&mut queries);

        // (M x D) . (D x N) -> per-query score row over every stored vector.
        let sims = queries.dot(&snapshot.matrix().t());

        let mut results = Vec::with_capacity(records.len());
        for (query_row, record) in sims.rows().into_iter().zip(records) {
            let input_key = extractor.extract(record).unwrap_or_default();
            let scores = query_row.as_slice().unwrap_or(&[]).to_vec();
            let mut diagnostics = QueryDiagnostics::for_scores(&scores, score_threshold);

            let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            for &(row, score) in ranked.iter().take(PREVIEW_LIMIT) {
                let key = snapshot
                    .row_meta(row)
                    .map(|meta| meta.key.clone())
                    .unwrap_or_default();
                diagnostics.top_candidates.push(CandidatePreview { row, key, score });
            }

            let mut references = Vec::new();
            for (row, score) in ranked {
                if references.len() >= top_k {
                    break;
                }
                let Some(meta) = snapshot.row_meta(row) else {
                    continue;
                };
                if !input_key.is_empty() && meta.key == input_key {
                    diagnostics.self_skips += 1;
                    continue;
                }
                if score < score_threshold {
                    diagnostics.threshold_rejects += 1;
                    continue;
                }
                references.push(Reference {
                    row,
                    key: meta.key.clone(),
                    summary: snippet(&meta.body),
                    owner: meta.owner.clone(),
                    score,
                });
            }

            log::debug!(
                "Query '{}': {} rows considered, {} references, {} self-skips, {} below threshold",
                input_key,
                diagnostics.rows_considered,
                references.len(),
                diagnostics.self_skips,
                diagnostics.threshold_rejects
            );

            results.push(RetrievalResult {
                input_key,
                input_summary: record.body().to_string(),
                references,
                diagnostics,
            });
        }

        Ok(results)
    }
}

fn snippet(body: &str) -> String {
    if body.chars().count() <= SNIPPET_LEN {
        return body.to_string();
    }
    let mut out: String = body.chars().take(SNIPPET_LEN).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::snippet;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_bodies_pass_through_unchanged() {
        assert_eq!(snippet("login page crashes"), "login page crashes");
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundaries() {
        let long = "ä".repeat(300);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), 163);
        assert!(cut.ends_with("..."));
    }
}
