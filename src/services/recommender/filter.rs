//! Final pass over scored candidates: drop what the user has effectively
//! seen, rank, and keep one entry per franchise.

use std::collections::HashSet;

use crate::models::{Media, MediaId, RelationType, ScoredCandidate};

/// Item is a continuation, retelling or compilation of something watched
pub fn is_related_to_watched(item: &Media, watched: &HashSet<MediaId>) -> bool {
    item.relations
        .iter()
        .any(|r| r.relation_type.is_continuity() && watched.contains(&r.related_id))
}

/// An earlier installment exists that should be recommended instead
///
/// The prequel wins when it is strictly more popular (missing popularity
/// counts as 0) or when its id is lower. Lower ids stand in for earlier
/// release dates, which does not always hold.
pub fn has_preferred_prequel(item: &Media) -> bool {
    let own_popularity = item.popularity.unwrap_or(0);
    item.relations
        .iter()
        .filter(|r| r.relation_type == RelationType::Prequel)
        .any(|r| r.related_popularity.unwrap_or(0) > own_popularity || r.related_id < item.id)
}

pub fn is_special_interest(item: &Media) -> bool {
    item.format.is_some_and(|f| f.is_special_interest())
}

pub fn passes_filters(item: &Media, watched: &HashSet<MediaId>) -> bool {
    !watched.contains(&item.id)
        && !is_related_to_watched(item, watched)
        && !has_preferred_prequel(item)
        && !is_special_interest(item)
}

/// Filters, sorts by combined score and keeps the best item of each franchise
///
/// Accepting an item also claims every id it is related to, so later items
/// that are, or point at, a claimed id are skipped.
pub fn select_top(
    scored: Vec<ScoredCandidate>,
    watched: &HashSet<MediaId>,
    max_recommendations: usize,
) -> Vec<ScoredCandidate> {
    let total = scored.len();
    let mut remaining: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|c| passes_filters(&c.item, watched))
        .collect();
    let passed = remaining.len();

    remaining.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));

    let mut claimed: HashSet<MediaId> = HashSet::new();
    let mut selected = Vec::new();

    for candidate in remaining {
        if selected.len() >= max_recommendations {
            break;
        }

        let item = &candidate.item;
        if claimed.contains(&item.id) || item.related_ids().any(|id| claimed.contains(&id)) {
            continue;
        }

        claimed.insert(item.id);
        claimed.extend(item.related_ids());
        selected.push(candidate);
    }

    tracing::debug!(
        total,
        passed,
        selected = selected.len(),
        "Candidates filtered"
    );

    selected
}
