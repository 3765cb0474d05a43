//! Hybrid score fusion and heuristic re-ranking.
//!
//! Pure, side-effect-free transformations: the same candidate sets and weights
//! always yield the same ranked list. Float ties are broken by candidate id so
//! ordering stays stable across runs.

use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::generation::retrieval::{EvidenceCandidate, Origin};

/// Weight given to the dense arm; sparse receives the complement.
pub const HYBRID_LAMBDA: f32 = 0.65;
/// Candidates surviving the rerank pass.
pub const RERANK_TOP: usize = 5;

/// Additive boosts applied when a candidate's source label contains the
/// pattern. A label matching several patterns collects every boost.
pub const SOURCE_BOOSTS: &[(&str, f32)] = &[("best_practices", 0.10), ("prompt", 0.05)];

/// A candidate after fusion, carrying its combined score.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub id: Uuid,
    pub text: String,
    pub source_name: Option<String>,
    pub score: f32,
}

impl FusedCandidate {
    fn new(candidate: &EvidenceCandidate, score: f32) -> Self {
        Self {
            id: candidate.id,
            text: candidate.text.clone(),
            source_name: candidate.source_name.clone(),
            score,
        }
    }
}

/// Merges dense and sparse candidate sets by weighted score.
///
/// Dense candidates contribute `similarity * lambda`; sparse candidates
/// contribute `similarity * (1 - lambda)`, accumulating onto an existing entry
/// when both arms retrieved the same chunk. Result is sorted by score
/// descending.
pub fn fuse(
    dense: &[EvidenceCandidate],
    sparse: &[EvidenceCandidate],
    lambda: f32,
) -> Vec<FusedCandidate> {
    let mut by_id: HashMap<Uuid, FusedCandidate> = HashMap::new();

    for candidate in dense {
        let contribution = candidate.similarity * arm_weight(candidate.origin, lambda);
        by_id.insert(candidate.id, FusedCandidate::new(candidate, contribution));
    }

    for candidate in sparse {
        let contribution = candidate.similarity * arm_weight(candidate.origin, lambda);
        match by_id.get_mut(&candidate.id) {
            Some(existing) => existing.score += contribution,
            None => {
                by_id.insert(candidate.id, FusedCandidate::new(candidate, contribution));
            }
        }
    }

    let mut fused: Vec<FusedCandidate> = by_id.into_values().collect();
    sort_by_score_desc(&mut fused);
    fused
}

/// Score weight an arm contributes under the hybrid lambda.
fn arm_weight(origin: Origin, lambda: f32) -> f32 {
    match origin {
        Origin::Dense => lambda,
        Origin::Sparse => 1.0 - lambda,
    }
}

/// Total boost for a source label under [`SOURCE_BOOSTS`].
pub fn source_boost(source_name: Option<&str>) -> f32 {
    let Some(name) = source_name else {
        return 0.0;
    };
    let name = name.to_lowercase();
    SOURCE_BOOSTS
        .iter()
        .filter(|(pattern, _)| name.contains(pattern))
        .map(|(_, boost)| *boost)
        .sum()
}

/// Applies source-label boosts, re-sorts, and truncates to `top`.
pub fn rerank(fused: Vec<FusedCandidate>, top: usize) -> Vec<FusedCandidate> {
    let mut reranked: Vec<FusedCandidate> = fused
        .into_iter()
        .map(|mut candidate| {
            candidate.score += source_boost(candidate.source_name.as_deref());
            candidate
        })
        .collect();
    sort_by_score_desc(&mut reranked);
    reranked.truncate(top);
    reranked
}

fn sort_by_score_desc(candidates: &mut [FusedCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::retrieval::Origin;

    const EPS: f32 = 1e-6;

    fn candidate(id: Uuid, origin: Origin, similarity: f32, source: Option<&str>) -> EvidenceCandidate {
        EvidenceCandidate {
            id,
            text: format!("chunk {id}"),
            source_name: source.map(str::to_string),
            origin,
            similarity,
        }
    }

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn test_dense_only_candidate_scores_similarity_times_lambda() {
        let dense = vec![candidate(uuid(1), Origin::Dense, 0.8, None)];
        let fused = fuse(&dense, &[], 0.65);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 0.8 * 0.65).abs() < EPS);
    }

    #[test]
    fn test_sparse_only_candidate_scores_similarity_times_complement() {
        let sparse = vec![candidate(uuid(1), Origin::Sparse, 0.6, None)];
        let fused = fuse(&[], &sparse, 0.65);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 0.6 * 0.35).abs() < EPS);
    }

    #[test]
    fn test_candidate_in_both_arms_accumulates_both_contributions() {
        let dense = vec![candidate(uuid(1), Origin::Dense, 0.9, None)];
        let sparse = vec![candidate(uuid(1), Origin::Sparse, 0.6, None)];
        let fused = fuse(&dense, &sparse, 0.65);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - (0.9 * 0.65 + 0.6 * 0.35)).abs() < EPS);
    }

    #[test]
    fn test_fusion_weight_algebra_holds_across_lambdas() {
        for lambda in [0.0_f32, 0.25, 0.5, 0.65, 1.0] {
            let dense = vec![candidate(uuid(1), Origin::Dense, 0.7, None)];
            let sparse = vec![candidate(uuid(2), Origin::Sparse, 0.4, None)];
            let fused = fuse(&dense, &sparse, lambda);
            let dense_score = fused.iter().find(|c| c.id == uuid(1)).unwrap().score;
            let sparse_score = fused.iter().find(|c| c.id == uuid(2)).unwrap().score;
            assert!((dense_score - 0.7 * lambda).abs() < EPS);
            assert!((sparse_score - 0.4 * (1.0 - lambda)).abs() < EPS);
        }
    }

    #[test]
    fn test_fused_list_is_sorted_descending() {
        let dense = vec![
            candidate(uuid(1), Origin::Dense, 0.5, None),
            candidate(uuid(2), Origin::Dense, 0.9, None),
            candidate(uuid(3), Origin::Dense, 0.7, None),
        ];
        let fused = fuse(&dense, &[], 0.65);
        let ids: Vec<Uuid> = fused.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![uuid(2), uuid(3), uuid(1)]);
    }

    #[test]
    fn test_best_practices_boost_flips_equal_scores() {
        // Two dense candidates at 0.9 similarity both fuse to 0.585; the one
        // whose source mentions best_practices climbs to 0.685 and wins.
        let dense = vec![
            candidate(uuid(1), Origin::Dense, 0.9, Some("faq_dump")),
            candidate(uuid(2), Origin::Dense, 0.9, Some("support_best_practices")),
        ];
        let fused = fuse(&dense, &[], 0.65);
        // Before rerank the tie resolves by id.
        assert_eq!(fused[0].id, uuid(1));

        let reranked = rerank(fused, RERANK_TOP);
        assert_eq!(reranked[0].id, uuid(2));
        assert!((reranked[0].score - 0.685).abs() < EPS);
        assert!((reranked[1].score - 0.585).abs() < EPS);
    }

    #[test]
    fn test_source_boost_accumulates_multiple_patterns() {
        assert!((source_boost(Some("prompt_best_practices")) - 0.15).abs() < EPS);
        assert!((source_boost(Some("Prompt_Library")) - 0.05).abs() < EPS);
        assert!((source_boost(Some("faq")) - 0.0).abs() < EPS);
        assert!((source_boost(None) - 0.0).abs() < EPS);
    }

    #[test]
    fn test_rerank_truncates_to_top_n() {
        let dense: Vec<EvidenceCandidate> = (0..10)
            .map(|n| candidate(uuid(n), Origin::Dense, 0.5 + n as f32 * 0.01, None))
            .collect();
        let reranked = rerank(fuse(&dense, &[], HYBRID_LAMBDA), RERANK_TOP);
        assert_eq!(reranked.len(), RERANK_TOP);
    }

    #[test]
    fn test_rerank_is_deterministic() {
        let dense = vec![
            candidate(uuid(7), Origin::Dense, 0.9, Some("prompt_notes")),
            candidate(uuid(3), Origin::Dense, 0.9, None),
            candidate(uuid(5), Origin::Dense, 0.6, Some("best_practices_guide")),
        ];
        let sparse = vec![
            candidate(uuid(3), Origin::Sparse, 0.6, None),
            candidate(uuid(9), Origin::Sparse, 0.6, None),
        ];

        let first: Vec<Uuid> = rerank(fuse(&dense, &sparse, HYBRID_LAMBDA), RERANK_TOP)
            .iter()
            .map(|c| c.id)
            .collect();
        for _ in 0..10 {
            let again: Vec<Uuid> = rerank(fuse(&dense, &sparse, HYBRID_LAMBDA), RERANK_TOP)
                .iter()
                .map(|c| c.id)
                .collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_empty_inputs_fuse_to_empty() {
        assert!(fuse(&[], &[], HYBRID_LAMBDA).is_empty());
        assert!(rerank(Vec::new(), RERANK_TOP).is_empty());
    }
}
