use serde::{Deserialize, Serialize};

/// How many pre-filter candidates to keep in the diagnostics preview.
pub const PREVIEW_LIMIT: usize = 10;

/// One ranked match returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    /// Row id in the stored matrix.
    pub row: usize,
    pub key: String,
    pub summary: String,
    pub owner: Option<String>,
    pub score: f32,
}

/// A candidate as seen before self-skip and threshold filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidatePreview {
    pub row: usize,
    pub key: String,
    pub score: f32,
}

/// Score distribution and filter accounting for one query.
///
/// Retrieval quality is only tunable through `score_threshold` and `top_k`,
/// so every query reports the full distribution it saw, not just the
/// survivors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryDiagnostics {
    /// Number of stored rows scored against this query.
    pub rows_considered: usize,
    pub max_score: Option<f32>,
    pub min_score: Option<f32>,
    pub mean_score: Option<f32>,
    /// Rows scoring at or above the threshold, counted before any filtering.
    pub above_threshold: usize,
    /// Top-ranked candidates before self-skip and threshold filtering.
    pub top_candidates: Vec<CandidatePreview>,
    /// Candidates dropped because their key matched the query's own key.
    pub self_skips: usize,
    /// Candidates dropped for scoring below the threshold.
    pub threshold_rejects: usize,
    /// Set when the query embedding width did not match the stored width.
    /// The query then carries no references at all.
    pub dimension_mismatch: bool,
}

impl QueryDiagnostics {
    pub fn for_scores(scores: &[f32], threshold: f32) -> Self {
        let mut diag = Self {
            rows_considered: scores.len(),
            ..Self::default()
        };
        if scores.is_empty() {
            return diag;
        }
        let mut max = f32::NEG_INFINITY;
        let mut min = f32::INFINITY;
        let mut sum = 0.0_f64;
        for &score in scores {
            max = max.max(score);
            min = min.min(score);
            sum += f64::from(score);
            if score >= threshold {
                diag.above_threshold += 1;
            }
        }
        diag.max_score = Some(max);
        diag.min_score = Some(min);
        diag.mean_score = Some((sum / scores.len() as f64) as f32);
        diag
    }

    pub fn dimension_mismatch(query_dim: usize, stored_dim: usize) -> Self {
        log::warn!(
            "Query embedding width {} does not match stored width {}",
            query_dim,
            stored_dim
        );
        Self {
            dimension_mismatch: true,
            ..Self::default()
        }
    }
}

/// Result for one input record: its identity, the ranked references that
/// survived filtering, and the diagnostics bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub input_key: String,
    pub input_summary: String,
    pub references: Vec<Reference>,
    pub diagnostics: QueryDiagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn score_stats_cover_the_whole_row() {
        let diag = QueryDiagnostics::for_scores(&[0.9, 0.1, 0.5, 0.5], 0.5);
        assert_eq!(diag.rows_considered, 4);
        assert_eq!(diag.max_score, Some(0.9));
        assert_eq!(diag.min_score, Some(0.1));
        assert_eq!(diag.mean_score, Some(0.5));
        assert_eq!(diag.above_threshold, 3);
        assert!(!diag.dimension_mismatch);
    }

    #[test]
    fn empty_row_has_no_stats() {
        let diag = QueryDiagnostics::for_scores(&[], 0.5);
        assert_eq!(diag.rows_considered, 0);
        assert_eq!(diag.max_score, None);
        assert_eq!(diag.mean_score, None);
        assert_eq!(diag.above_threshold, 0);
    }
}
