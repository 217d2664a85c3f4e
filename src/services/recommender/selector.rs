//! Picks the genres and tags that drive catalog retrieval and merges the
//! batches that come back.

use std::collections::BTreeMap;

use serde::Serialize;

use super::profile::UserProfile;
use crate::{
    config::RecommenderConfig,
    models::{Category, Media, MediaId},
};

/// One retrieval to issue against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateQuery {
    pub category: Category,
    pub pages: u32,
}

/// Liked genres by weight; if none are liked, every genre by magnitude
pub fn select_genres(profile: &UserProfile, count: usize) -> Vec<String> {
    let mut liked: Vec<(&String, f64)> = profile
        .genres
        .iter()
        .filter(|(_, a)| a.shrunk_score > 0.0)
        .map(|(k, a)| (k, a.shrunk_score))
        .collect();

    if liked.is_empty() {
        liked = profile
            .genres
            .iter()
            .map(|(k, a)| (k, a.shrunk_score.abs()))
            .collect();
    }

    // Stable sort keeps alphabetical order among equal weights
    liked.sort_by(|a, b| b.1.total_cmp(&a.1));
    liked.into_iter().take(count).map(|(k, _)| k.clone()).collect()
}

/// Tags with the strongest affinity, liked or disliked
pub fn select_tags(profile: &UserProfile, count: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = profile
        .tags
        .iter()
        .map(|(k, a)| (k, a.shrunk_score.abs()))
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().take(count).map(|(k, _)| k.clone()).collect()
}

/// All retrievals for a run: genres first, then tags
pub fn candidate_queries(profile: &UserProfile, config: &RecommenderConfig) -> Vec<CandidateQuery> {
    let genres = select_genres(profile, config.genres_to_fetch_count)
        .into_iter()
        .map(|g| CandidateQuery {
            category: Category::Genre(g),
            pages: config.pages_per_genre,
        });

    let tags = select_tags(profile, config.tags_to_fetch_count)
        .into_iter()
        .map(|t| CandidateQuery {
            category: Category::Tag(t),
            pages: config.pages_per_tag,
        });

    genres.chain(tags).collect()
}

/// Folds batches into one candidate set keyed by id
///
/// A later copy of an id replaces an earlier one. The result is ordered by id,
/// so it does not depend on the order in which batches arrived.
pub fn merge_batches<I>(batches: I) -> Vec<Media>
where
    I: IntoIterator<Item = Vec<Media>>,
{
    let merged: BTreeMap<MediaId, Media> = batches
        .into_iter()
        .flatten()
        .map(|media| (media.id, media))
        .collect();

    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryEntry, MediaTag};

    fn entry(id: u64, score: f64, genres: &[&str], tags: &[(&str, u32)]) -> HistoryEntry {
        HistoryEntry {
            media_id: MediaId(id),
            score,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            tags: tags.iter().map(|(n, r)| MediaTag::new(*n, *r)).collect(),
        }
    }

    fn media(id: u64, title: &str) -> Media {
        Media {
            id: MediaId(id),
            title: Some(title.to_string()),
            cover_image: None,
            genres: vec![],
            tags: vec![],
            format: None,
            popularity: None,
            relations: vec![],
        }
    }

    fn profile(history: &[HistoryEntry]) -> UserProfile {
        UserProfile::build(history, &RecommenderConfig::default()).unwrap()
    }

    #[test]
    fn test_select_genres_prefers_liked() {
        let p = profile(&[
            entry(1, 95.0, &["Action", "Mecha"], &[]),
            entry(2, 90.0, &["Action"], &[]),
            entry(3, 10.0, &["Romance"], &[]),
        ]);

        let genres = select_genres(&p, 5);
        assert_eq!(genres, vec!["action", "mecha"]);
    }

    #[test]
    fn test_select_genres_respects_count() {
        let p = profile(&[
            entry(1, 95.0, &["Action", "Mecha"], &[]),
            entry(2, 90.0, &["Action"], &[]),
            entry(3, 10.0, &["Romance"], &[]),
        ]);

        assert_eq!(select_genres(&p, 1), vec!["action"]);
        assert!(select_genres(&p, 0).is_empty());
    }

    #[test]
    fn test_select_genres_falls_back_to_magnitude() {
        // Every genre sits at the user mean except Horror, which sits below it
        let p = profile(&[
            entry(1, 50.0, &["Comedy"], &[]),
            entry(2, 50.0, &["Comedy"], &[]),
            entry(3, 20.0, &["Horror"], &[]),
            entry(4, 80.0, &[], &[]),
        ]);
        assert!(!p.has_liked_genres());

        let genres = select_genres(&p, 2);
        assert_eq!(genres[0], "horror");
        assert_eq!(genres.len(), 2);
    }

    #[test]
    fn test_select_tags_by_absolute_affinity() {
        let p = profile(&[
            entry(1, 90.0, &[], &[("Isekai", 100)]),
            entry(2, 10.0, &[], &[("Harem", 100), ("Ecchi", 100)]),
            entry(3, 10.0, &[], &[("Harem", 100)]),
            entry(4, 60.0, &[], &[("School", 40)]),
        ]);

        let tags = select_tags(&p, 2);
        assert_eq!(tags[0], "harem");
        assert_eq!(tags.len(), 2);
        assert!(!tags.contains(&"school".to_string()));
    }

    #[test]
    fn test_candidate_queries_carry_pages() {
        let p = profile(&[
            entry(1, 90.0, &["Action"], &[("Isekai", 80)]),
            entry(2, 20.0, &["Romance"], &[]),
        ]);
        let config = RecommenderConfig {
            genres_to_fetch_count: 1,
            tags_to_fetch_count: 1,
            pages_per_genre: 3,
            pages_per_tag: 1,
            ..Default::default()
        };

        let queries = candidate_queries(&p, &config);
        assert_eq!(
            queries,
            vec![
                CandidateQuery {
                    category: Category::Genre("action".to_string()),
                    pages: 3
                },
                CandidateQuery {
                    category: Category::Tag("isekai".to_string()),
                    pages: 1
                },
            ]
        );
    }

    #[test]
    fn test_merge_batches_dedupes_by_id() {
        let merged = merge_batches(vec![
            vec![media(3, "c"), media(1, "a")],
            vec![media(1, "a-again"), media(2, "b")],
            vec![],
        ]);

        let ids: Vec<u64> = merged.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(merged[0].title.as_deref(), Some("a-again"));
    }

    #[test]
    fn test_merge_batches_order_insensitive() {
        let a = vec![media(5, "e"), media(2, "b")];
        let b = vec![media(9, "i"), media(2, "b")];

        let forward: Vec<MediaId> = merge_batches(vec![a.clone(), b.clone()])
            .into_iter()
            .map(|m| m.id)
            .collect();
        let reverse: Vec<MediaId> = merge_batches(vec![b, a]).into_iter().map(|m| m.id).collect();

        assert_eq!(forward, reverse);
    }
}
