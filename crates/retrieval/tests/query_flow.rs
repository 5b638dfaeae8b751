use pretty_assertions::assert_eq;
use quickref_indexer::Indexer;
use quickref_retrieval::RetrievalEngine;
use quickref_vector_store::{FailingEmbedder, HashingEmbedder, IssueRecord, StoreConfig, VectorStore};
use std::sync::Arc;
use tempfile::TempDir;

const DIM: usize = 16;

fn issue(key: &str, summary: &str, assignee: Option<&str>) -> IssueRecord {
    let mut record = IssueRecord::new();
    record.set("Issue key", key);
    record.set("Summary", summary);
    if let Some(assignee) = assignee {
        record.set("Assignee", assignee);
    }
    record
}

async fn seeded_engine(dir: &TempDir, records: &[IssueRecord]) -> RetrievalEngine {
    let config = StoreConfig::in_dir(dir.path()).with_dimension(DIM);
    let embedder = Arc::new(HashingEmbedder::new(DIM));
    let indexer = Indexer::new(VectorStore::open(config.clone()), embedder.clone());
    indexer.apply(records).await.unwrap();
    RetrievalEngine::new(VectorStore::open(config), embedder)
}

fn corpus() -> Vec<IssueRecord> {
    vec![
        issue("PROJ-1", "login page crashes on submit", Some("ann")),
        issue("PROJ-2", "export report times out", Some("ben")),
        issue("PROJ-3", "typo in settings dialog", None),
        issue("PROJ-4", "password reset email never arrives", Some("cara")),
    ]
}

#[tokio::test]
async fn identical_summary_ranks_first() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir, &corpus()).await;

    let query = issue("NEW-1", "export report times out", None);
    let results = engine.query(&[query], 3, 0.99).await.unwrap();
    assert_eq!(results.len(), 1);

    let result = &results[0];
    assert_eq!(result.input_key, "NEW-1");
    assert_eq!(result.references[0].key, "PROJ-2");
    assert!(result.references[0].score > 0.999);
    assert_eq!(result.references[0].owner.as_deref(), Some("ben"));
    assert_eq!(result.diagnostics.rows_considered, 4);
}

#[tokio::test]
async fn own_key_never_comes_back_as_a_reference() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir, &corpus()).await;

    // Requery a stored record with the threshold wide open: its own row
    // scores 1.0 but must be skipped, not just outranked.
    let results = engine.query(&corpus()[..1], 10, -1.0).await.unwrap();
    let result = &results[0];

    assert!(result.references.iter().all(|r| r.key != "PROJ-1"));
    assert_eq!(result.references.len(), 3);
    assert_eq!(result.diagnostics.self_skips, 1);
    // The suppressed row still shows up in the pre-filter preview.
    assert_eq!(result.diagnostics.top_candidates[0].key, "PROJ-1");
}

#[tokio::test]
async fn raising_the_threshold_never_adds_references() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir, &corpus()).await;
    let query = issue("NEW-1", "report export is slow", None);

    let mut previous = usize::MAX;
    for threshold in [-1.0_f32, 0.0, 0.5, 0.9, 1.1] {
        let results = engine.query(std::slice::from_ref(&query), 10, threshold).await.unwrap();
        let count = results[0].references.len();
        assert!(count <= previous, "threshold {threshold} grew the result set");
        previous = count;
    }
    // Above-unit threshold filters everything.
    assert_eq!(previous, 0);
}

#[tokio::test]
async fn mismatched_query_width_degrades_instead_of_failing() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::in_dir(dir.path()).with_dimension(DIM);
    let indexer = Indexer::new(
        VectorStore::open(config.clone()),
        Arc::new(HashingEmbedder::new(DIM)),
    );
    indexer.apply(&corpus()).await.unwrap();

    // Swapping the embedding model changes the output width.
    let engine = RetrievalEngine::new(
        VectorStore::open(config),
        Arc::new(HashingEmbedder::new(DIM * 2)),
    );

    let queries = vec![
        issue("NEW-1", "export report times out", None),
        issue("NEW-2", "login page crashes on submit", None),
    ];
    let results = engine.query(&queries, 3, 0.0).await.unwrap();
    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(result.references.is_empty());
        assert!(result.diagnostics.dimension_mismatch);
        assert_eq!(result.diagnostics.rows_considered, 0);
    }
}

#[tokio::test]
async fn embedding_failure_surfaces_as_an_error() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::in_dir(dir.path()).with_dimension(DIM);
    let indexer = Indexer::new(
        VectorStore::open(config.clone()),
        Arc::new(HashingEmbedder::new(DIM)),
    );
    indexer.apply(&corpus()).await.unwrap();

    // A dead embedding service is fatal to the query, unlike a width
    // mismatch, which degrades.
    let engine = RetrievalEngine::new(
        VectorStore::open(config),
        Arc::new(FailingEmbedder::new(DIM)),
    );
    let err = engine
        .query(&[issue("NEW-1", "export report times out", None)], 3, 0.5)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("embedding service unavailable"));
}

#[tokio::test]
async fn empty_store_yields_empty_references_without_error() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::in_dir(dir.path()).with_dimension(DIM);
    let engine = RetrievalEngine::new(
        VectorStore::open(config),
        Arc::new(HashingEmbedder::new(DIM)),
    );

    let results = engine
        .query(&[issue("NEW-1", "anything at all", None)], 3, 0.5)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].references.is_empty());
    assert_eq!(results[0].diagnostics.rows_considered, 0);
    assert_eq!(results[0].diagnostics.max_score, None);
}

#[tokio::test]
async fn preview_is_ranked_and_capped() {
    let dir = TempDir::new().unwrap();
    let records: Vec<IssueRecord> = (0..15)
        .map(|n| issue(&format!("PROJ-{n}"), &format!("distinct summary number {n}"), None))
        .collect();
    let engine = seeded_engine(&dir, &records).await;

    let results = engine
        .query(&[issue("NEW-1", "distinct summary number 7", None)], 3, 2.0)
        .await
        .unwrap();
    let diag = &results[0].diagnostics;

    assert_eq!(diag.top_candidates.len(), 10);
    assert!(diag
        .top_candidates
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
    assert_eq!(diag.top_candidates[0].key, "PROJ-7");
    // Nothing clears an impossible threshold, and the accounting says why.
    assert!(results[0].references.is_empty());
    assert_eq!(diag.above_threshold, 0);
    assert_eq!(diag.threshold_rejects, 15);
}
