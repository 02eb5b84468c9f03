//! Cosine scoring and top-k selection.
//!
//! Search is exact and brute force, O(N·D) per query. That is fine for a
//! catalog of a few thousand items; past the low tens of thousands an
//! approximate index would be needed.

use crate::types::{EmbeddingRecord, MetadataFilter, SearchHit};

/// Decimal digits kept in reported scores.
pub const SCORE_PRECISION: i32 = 6;

/// Calculate cosine similarity between two vectors.
///
/// Returns 0.0 when either vector is empty, the lengths differ, or either
/// has zero magnitude. Accumulates in `f64`; the result is clamped to
/// `[-1.0, 1.0]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Round a score to [`SCORE_PRECISION`] decimal digits.
pub fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(SCORE_PRECISION);
    (score * scale).round() / scale
}

/// Score, filter, and rank records against a query.
///
/// Records failing `filter` are dropped before scoring. The sort is stable,
/// so equal scores keep storage order. `top_k` of 0 is treated as 1.
pub fn rank(
    records: Vec<EmbeddingRecord>,
    query: &[f32],
    top_k: usize,
    filter: Option<&MetadataFilter>,
) -> Vec<SearchHit> {
    let top_k = top_k.max(1);

    let mut scored: Vec<(f64, EmbeddingRecord)> = records
        .into_iter()
        .filter(|record| filter.map_or(true, |f| f.matches(&record.metadata)))
        .map(|record| (cosine_similarity(query, &record.embedding), record))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(score, record)| SearchHit {
            score: round_score(score),
            record,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordInput, RecordMetadata};

    fn record(text: &str, embedding: Vec<f32>, category: &str) -> EmbeddingRecord {
        RecordInput::new(text, embedding)
            .with_metadata(RecordMetadata::new().with_category(category))
            .into()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_self_similarity_is_one() {
        let v = [0.3, -1.7, 2.25, 8.0, -0.001];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_within_bounds() {
        let vectors: [&[f32]; 4] = [
            &[0.1, 0.2, 0.3],
            &[-5.0, 4.0, 0.5],
            &[1e-3, -1e3, 7.0],
            &[3.0, 3.0, 3.0],
        ];
        for a in vectors {
            for b in vectors {
                let s = cosine_similarity(a, b);
                assert!((-1.0..=1.0).contains(&s), "{} out of bounds", s);
            }
        }
    }

    #[test]
    fn test_cosine_degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.123_456_789), 0.123457);
        assert_eq!(round_score(1.0), 1.0);
        assert_eq!(round_score(-0.000_000_4), 0.0);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let records: Vec<EmbeddingRecord> = (0..10)
            .map(|i| record(&format!("item {}", i), vec![1.0, i as f32], "A"))
            .collect();

        let hits = rank(records, &[1.0, 0.0], 3, None);
        assert_eq!(hits.len(), 3);
        assert!(hits[0].score > hits[1].score);
        assert!(hits[1].score > hits[2].score);
        assert_eq!(hits[0].record.text, "item 0");
    }

    #[test]
    fn test_rank_filters_before_truncating() {
        let records = vec![
            record("b-best", vec![1.0, 0.0], "B"),
            record("a-close", vec![0.9, 0.1], "A"),
            record("a-far", vec![0.0, 1.0], "A"),
        ];

        let hits = rank(records, &[1.0, 0.0], 1, Some(&MetadataFilter::category("A")));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.text, "a-close");
    }

    #[test]
    fn test_rank_zero_top_k_clamped() {
        let records = vec![
            record("x", vec![1.0], "A"),
            record("y", vec![1.0], "A"),
        ];
        assert_eq!(rank(records, &[1.0], 0, None).len(), 1);
    }

    #[test]
    fn test_rank_ties_keep_storage_order() {
        let records = vec![
            record("first", vec![2.0, 0.0], "A"),
            record("second", vec![1.0, 0.0], "A"),
            record("third", vec![3.0, 0.0], "A"),
        ];
        let hits = rank(records, &[1.0, 0.0], 3, None);
        let texts: Vec<&str> = hits.iter().map(|h| h.record.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new(), &[1.0], 5, None).is_empty());
    }
}
