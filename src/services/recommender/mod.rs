use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    config::RecommenderConfig,
    error::AppResult,
    models::{Category, HistoryEntry, Media, MediaId, ProfileSummary, ScoredCandidate},
    services::providers::{fetch_candidate_batches, CatalogProvider},
};

pub mod filter;
pub mod profile;
pub mod scorer;
pub mod selector;

pub use profile::{GenreAffinity, TagAffinity, UserProfile, WeightMap};
pub use scorer::Scorer;
pub use selector::CandidateQuery;

/// Number of liked/disliked genres reported in the profile summary
const SUMMARY_GENRES: usize = 5;

/// Outcome of one recommendation run
#[derive(Debug, Clone)]
pub struct RecommendationRun {
    pub profile: ProfileSummary,
    pub candidate_count: usize,
    pub recommendations: Vec<ScoredCandidate>,
}

/// Recommends unwatched items for the given history
///
/// Builds a preference profile, pulls candidates for the strongest genres and
/// tags from `provider` concurrently, then scores, filters and deduplicates
/// them. Failed retrievals only shrink the candidate pool; an empty pool gives
/// an empty result.
pub async fn recommend(
    history: &[HistoryEntry],
    provider: Arc<dyn CatalogProvider>,
    config: &RecommenderConfig,
) -> AppResult<RecommendationRun> {
    let start = Instant::now();
    let config = config.clone().validate()?;

    let profile = UserProfile::build(history, &config)?;
    let queries = selector::candidate_queries(&profile, &config);

    tracing::info!(
        history = history.len(),
        rated = profile.rated_count,
        user_mean = profile.user_mean,
        queries = queries.len(),
        provider = provider.name(),
        "Starting recommendation run"
    );

    let summary = summarize(&profile, &queries);
    let batches = fetch_candidate_batches(provider, queries).await;
    let candidates = selector::merge_batches(batches);
    let candidate_count = candidates.len();

    let watched = watched_ids(history);
    let recommendations = rank(&profile, candidates, &watched, &config);

    tracing::info!(
        candidates = candidate_count,
        recommended = recommendations.len(),
        processing_time_ms = start.elapsed().as_millis(),
        "Recommendation run completed"
    );

    Ok(RecommendationRun {
        profile: summary,
        candidate_count,
        recommendations,
    })
}

/// Scores and filters an already merged candidate set
pub fn rank(
    profile: &UserProfile,
    candidates: Vec<Media>,
    watched: &HashSet<MediaId>,
    config: &RecommenderConfig,
) -> Vec<ScoredCandidate> {
    let scored = Scorer::new(profile, config).score_all(candidates);
    filter::select_top(scored, watched, config.max_recommendations)
}

/// Every id on the list counts as watched, rated or not
pub fn watched_ids(history: &[HistoryEntry]) -> HashSet<MediaId> {
    history.iter().map(|e| e.media_id).collect()
}

fn summarize(profile: &UserProfile, queries: &[CandidateQuery]) -> ProfileSummary {
    let top = |weights: &WeightMap| {
        let mut ranked: Vec<(String, f64)> =
            weights.iter().map(|(k, v)| (k.clone(), *v)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(SUMMARY_GENRES);
        ranked
    };

    let (mut fetched_genres, mut fetched_tags) = (Vec::new(), Vec::new());
    for query in queries {
        match &query.category {
            Category::Genre(g) => fetched_genres.push(g.clone()),
            Category::Tag(t) => fetched_tags.push(t.clone()),
        }
    }

    ProfileSummary {
        user_mean: profile.user_mean,
        rated_count: profile.rated_count,
        liked_genres: top(&profile.liked_genres),
        disliked_genres: top(&profile.disliked_genres),
        fetched_genres,
        fetched_tags,
    }
}
