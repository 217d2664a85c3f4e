use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{HistoryEntry, MediaFormat, MediaId, ScoredCandidate};

/// Request to rank candidates against a caller-supplied history
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Summary of the preference profile a run was built from
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileSummary {
    pub user_mean: f64,
    pub rated_count: usize,
    pub liked_genres: Vec<(String, f64)>,
    pub disliked_genres: Vec<(String, f64)>,
    pub fetched_genres: Vec<String>,
    pub fetched_tags: Vec<String>,
}

/// One ranked recommendation as returned to the client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendedItem {
    pub id: MediaId,
    pub title: Option<String>,
    pub cover_image: Option<String>,
    pub site_url: String,
    pub format: Option<MediaFormat>,
    pub genre_score: f64,
    pub tag_alignment: f64,
    pub score: f64,
}

impl From<&ScoredCandidate> for RecommendedItem {
    fn from(scored: &ScoredCandidate) -> Self {
        Self {
            id: scored.item.id,
            title: scored.item.title.clone(),
            cover_image: scored.item.cover_image.clone(),
            site_url: scored.item.site_url(),
            format: scored.item.format,
            genre_score: scored.genre_score,
            tag_alignment: scored.tag_alignment,
            score: scored.combined_score,
        }
    }
}

/// Ranked recommendations for one user
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub username: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub profile: ProfileSummary,
    pub candidate_count: usize,
    pub recommendations: Vec<RecommendedItem>,
}
