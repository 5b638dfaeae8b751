use crate::delta::{IndexDelta, IndexOutcome};
use crate::error::Result;
use quickref_vector_store::{
    l2_normalize_rows, matrix_from_vectors, AnnIndex, Embedder, IssueRecord, KeyExtractor, RowMeta,
    VectorStore,
};
use std::sync::Arc;

/// Incremental indexer: classifies a batch of incoming records against the
/// persisted snapshot, embeds only the new/changed ones, appends them, and
/// rebuilds the derived ANN artifact.
///
/// Single-writer: one indexing run owns the store for its whole duration.
/// Embedding, persistence, and the rebuild all run synchronously on the
/// caller.
pub struct Indexer {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
}

impl Indexer {
    pub fn new(store: VectorStore, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Apply one batch of candidate records.
    ///
    /// Classification per record: **new** when its key has no stored row,
    /// **changed** when the newest stored row for the key differs in
    /// (body, owner), **unchanged** otherwise. Records without a derivable
    /// key are silently dropped. Changed records supersede by appending a
    /// fresh row; the old row is left untouched so row ids stay stable.
    ///
    /// Nothing is persisted unless the batched embedding call succeeds.
    pub async fn apply(&self, records: &[IssueRecord]) -> Result<IndexDelta> {
        let mut snapshot = self.store.load().await?;
        let config = self.store.config();
        let extractor = KeyExtractor::for_key_field(&config.key_field);

        // First-time run: no prior metadata means every keyed record is new,
        // regardless of what the (zero-row) matrix says.
        let first_build = snapshot.is_empty();
        let key_to_row = snapshot.key_to_row();

        let mut pending: Vec<(String, IssueRecord)> = Vec::new();
        let mut skipped = 0_usize;

        for record in records {
            let Some(key) = extractor.extract(record) else {
                skipped += 1;
                continue;
            };

            if first_build {
                pending.push((key, record.clone()));
                continue;
            }

            match key_to_row.get(&key) {
                None => pending.push((key, record.clone())),
                Some(&row) => {
                    let stored = snapshot
                        .row_meta(row)
                        .expect("key map rows are derived from metadata");
                    if stored.content_matches(record) {
                        skipped += 1;
                    } else {
                        pending.push((key, record.clone()));
                    }
                }
            }
        }

        if pending.is_empty() {
            let outcome = if first_build {
                IndexOutcome::NoData
            } else {
                IndexOutcome::NoNewOrChanged
            };
            log::info!(
                "Indexing run: nothing to embed ({}), {} skipped",
                outcome.as_str(),
                skipped
            );
            return Ok(IndexDelta {
                added: 0,
                skipped,
                index_size: snapshot.len(),
                outcome,
            });
        }

        // One batched call for the whole delta, order preserved.
        let texts: Vec<String> = pending
            .iter()
            .map(|(_, record)| record.body().to_string())
            .collect();
        let raw = self.embedder.encode(&texts).await?;
        if raw.len() != texts.len() {
            return Err(quickref_vector_store::VectorStoreError::EmbeddingError(format!(
                "embedding service returned {} vectors for {} inputs",
                raw.len(),
                texts.len()
            ))
            .into());
        }

        let mut vectors = matrix_from_vectors(raw, config.dimension)?;
        l2_normalize_rows(&mut vectors);

        let metas: Vec<RowMeta> = pending
            .iter()
            .map(|(key, record)| RowMeta::from_record(key.clone(), record))
            .collect();
        let added = metas.len();
        snapshot.append(vectors, metas)?;

        self.store.save(&snapshot).await?;
        AnnIndex::rebuild(snapshot.matrix(), config.ann_trees, &config.ann_path).await?;

        let outcome = if first_build {
            IndexOutcome::BuiltFromAll
        } else {
            IndexOutcome::IncrementalOk
        };
        log::info!(
            "Indexing run: {} rows appended ({}), store now {} rows",
            added,
            outcome.as_str(),
            snapshot.len()
        );

        Ok(IndexDelta {
            added,
            skipped,
            index_size: snapshot.len(),
            outcome,
        })
    }
}
