use docchat_vector_store::SearchResult;

/// Whether retrieved hits are trustworthy enough to ground an answer.
///
/// Only the best hit is compared against `threshold` (inclusive). When the
/// gate opens, every hit is passed on as context, including lower-scoring
/// ones. `hits` must be ordered best first, as returned by search.
#[must_use]
pub fn decide(hits: &[SearchResult], threshold: f32) -> bool {
    hits.first().is_some_and(|top| top.score >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_vector_store::Chunk;

    fn hit(score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk::new(0, "c"),
            score,
        }
    }

    #[test]
    fn test_empty_hits_never_pass() {
        for threshold in [-1.0, 0.0, 0.35, 1.0] {
            assert!(!decide(&[], threshold));
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        assert!(decide(&[hit(0.9)], 0.9));
        assert!(!decide(&[hit(0.89999)], 0.9));
    }

    #[test]
    fn test_only_top_score_counts() {
        assert!(decide(&[hit(0.5), hit(0.1), hit(0.0)], 0.4));
        assert!(!decide(&[hit(0.3), hit(0.29)], 0.4));
    }

    #[test]
    fn test_zero_threshold_accepts_any_non_negative_hit() {
        assert!(decide(&[hit(0.0)], 0.0));
        assert!(!decide(&[hit(-0.2)], 0.0));
    }
}
