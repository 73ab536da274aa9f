//! Similarity scores shared by every backend.
//!
//! Scores are "higher is better" regardless of metric:
//!
//! | Metric | Score |
//! |--------|-------|
//! | Cosine | cosine similarity in `[-1, 1]` |
//! | Dot | raw dot product |
//! | L2 | `1 / (1 + euclidean distance)` |

use docrag_core::{DistanceMetric, SearchResult};
use std::cmp::Ordering;

/// Score two vectors of equal length directly.
#[must_use]
pub fn similarity(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Dot => dot(a, b),
        DistanceMetric::L2 => {
            let distance = a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt();
            1.0 / (1.0 + distance)
        }
    }
}

/// Convert a distance reported by `LanceDB` into a score.
///
/// `LanceDB` reports `1 - cos` for cosine, `1 - dot` for dot, and the
/// squared euclidean distance for L2.
#[must_use]
pub fn score_from_distance(metric: DistanceMetric, distance: f32) -> f32 {
    match metric {
        DistanceMetric::Cosine | DistanceMetric::Dot => 1.0 - distance,
        DistanceMetric::L2 => 1.0 / (1.0 + distance.max(0.0).sqrt()),
    }
}

/// Sort best first, ties by ascending `chunk_index`, and keep `limit`.
pub fn rank(results: &mut Vec<SearchResult>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.chunk_index.cmp(&b.chunk_index))
    });
    results.truncate(limit);
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}
