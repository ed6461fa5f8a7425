use super::domain::{ScoredWine, WineRecord};

/// Default size of a ranked selection.
pub const DEFAULT_SELECTION_SIZE: usize = 10;

/// Orders candidates by descending score and keeps the first `limit`.
///
/// The sort is stable: equal scores keep their retrieval order.
pub fn rank_scored(mut candidates: Vec<ScoredWine>, limit: usize) -> Vec<ScoredWine> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(limit);
    candidates
}

/// Ranked selection with the transient scores dropped.
pub fn rank(candidates: Vec<ScoredWine>, limit: usize) -> Vec<WineRecord> {
    rank_scored(candidates, limit)
        .into_iter()
        .map(|scored| scored.wine)
        .collect()
}
