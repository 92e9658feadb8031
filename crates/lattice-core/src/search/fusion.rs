//! Reciprocal Rank Fusion
//!
//! score(d) = sum over lists containing d of 1 / (k + rank(d))
//!
//! Works purely on 1-based rank positions, so BM25 scores and cosine
//! similarities never have to be put on a common scale. Entities present in
//! several lists are favored because their contributions add up. The `k`
//! constant (60 by default) dampens the head of each list.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{FusedHit, RankedHit};

/// Default RRF damping constant
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Fuse any number of ranked lists
///
/// Returns (entity id, score) sorted by score descending, ties by id
/// ascending. An entity listed twice in one list counts once, at its best
/// rank. Empty lists contribute nothing.
pub fn reciprocal_rank_fusion(lists: &[&[RankedHit]], k: f64) -> Vec<(String, f64)> {
    let mut scores: HashMap<&str, f64> = HashMap::new();

    for list in lists {
        for (id, rank) in best_ranks(list) {
            *scores.entry(id).or_default() += 1.0 / (k + rank as f64);
        }
    }

    let mut results: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(id, score)| (id.to_string(), score))
        .collect();
    results.sort_by(|a, b| compare_scored(&a.0, a.1, &b.0, b.1));
    results
}

/// Fuse the lexical and vector lists, keeping the top `limit` hits
///
/// Each fused hit remembers its rank in either list for provenance.
pub fn fuse(lexical: &[RankedHit], vector: &[RankedHit], k: f64, limit: usize) -> Vec<FusedHit> {
    let lexical_ranks = best_ranks(lexical);
    let vector_ranks = best_ranks(vector);

    reciprocal_rank_fusion(&[lexical, vector], k)
        .into_iter()
        .take(limit)
        .map(|(entity_id, score)| FusedHit {
            lexical_rank: lexical_ranks.get(entity_id.as_str()).copied(),
            vector_rank: vector_ranks.get(entity_id.as_str()).copied(),
            entity_id,
            score,
        })
        .collect()
}

fn best_ranks(list: &[RankedHit]) -> HashMap<&str, usize> {
    let mut ranks: HashMap<&str, usize> = HashMap::with_capacity(list.len());
    for hit in list {
        ranks
            .entry(hit.entity_id.as_str())
            .and_modify(|r| *r = (*r).min(hit.rank))
            .or_insert(hit.rank);
    }
    ranks
}

/// Descending score, then ascending id
pub(crate) fn compare_scored(a_id: &str, a_score: f64, b_id: &str, b_score: f64) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_id.cmp(b_id))
}
