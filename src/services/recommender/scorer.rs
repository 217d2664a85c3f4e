//! Candidate scoring: genre alignment amplified by tag alignment.

use std::collections::HashSet;

use super::profile::UserProfile;
use crate::{
    config::RecommenderConfig,
    models::{category_key, Media, ScoredCandidate},
};

/// Tag alignment of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TagAlignment {
    pub positive: f64,
    pub negative: f64,
    pub alignment: f64,
}

pub struct Scorer<'a> {
    profile: &'a UserProfile,
    config: &'a RecommenderConfig,
    relevant_tags: HashSet<String>,
}

impl<'a> Scorer<'a> {
    /// Relevant tags are keyed the same way as tag names, whatever their casing in `config`
    pub fn new(profile: &'a UserProfile, config: &'a RecommenderConfig) -> Self {
        let relevant_tags = config
            .relevant_tags
            .iter()
            .map(|tag| category_key(tag))
            .filter(|key| !key.is_empty())
            .collect();
        Self {
            profile,
            config,
            relevant_tags,
        }
    }

    /// Liked-genre weight minus penalized disliked-genre weight, clamped to `[0, 1]`
    pub fn genre_score(&self, item: &Media) -> f64 {
        let (pos, neg) = item.genres.iter().fold((0.0, 0.0), |(pos, neg), genre| {
            let key = category_key(genre);
            (
                pos + self.profile.liked_genres.get(&key),
                neg + self.profile.disliked_genres.get(&key),
            )
        });

        (pos - self.config.neg_genre_penalty * neg).clamp(0.0, 1.0)
    }

    /// Weighted average relevance of allow-listed tags the user feels strongly about
    ///
    /// Spoiler tags on the candidate are skipped.
    pub fn tag_alignment(&self, item: &Media) -> TagAlignment {
        let mut pos_num = 0.0;
        let mut pos_den = 0.0;
        let mut neg_num = 0.0;
        let mut neg_den = 0.0;

        for tag in item.tags.iter().filter(|t| !t.is_spoiler) {
            let key = category_key(&tag.name);
            if !self.relevant_tags.contains(&key) {
                continue;
            }

            let relevance = tag.relevance();
            let weight = self.profile.tag_weight(&key);
            if weight > 0.0 {
                pos_num += weight * relevance;
                pos_den += weight;
            } else if weight < 0.0 {
                neg_num += weight.abs() * relevance;
                neg_den += weight.abs();
            }
        }

        let positive = if pos_den > 0.0 { pos_num / pos_den } else { 0.0 };
        let negative = if neg_den > 0.0 { neg_num / neg_den } else { 0.0 };

        TagAlignment {
            positive,
            negative,
            alignment: (positive - self.config.negative_tag_factor * negative).clamp(0.0, 1.0),
        }
    }

    /// Tags only amplify a genre match; without liked genres they stand alone
    pub fn combine(&self, genre_score: f64, tag_alignment: f64) -> f64 {
        if self.profile.has_liked_genres() {
            genre_score
                * (1.0 + self.config.tag_multiplier * tag_alignment.powf(self.config.tag_exponent))
        } else {
            tag_alignment
        }
    }

    pub fn score(&self, item: Media) -> ScoredCandidate {
        let genre_score = self.genre_score(&item);
        let tags = self.tag_alignment(&item);
        let combined_score = self.combine(genre_score, tags.alignment);

        ScoredCandidate {
            item,
            genre_score,
            tag_alignment: tags.alignment,
            pos_tag_score: tags.positive,
            neg_tag_score: tags.negative,
            combined_score,
        }
    }

    pub fn score_all(&self, candidates: Vec<Media>) -> Vec<ScoredCandidate> {
        candidates.into_iter().map(|item| self.score(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryEntry, MediaId, MediaTag};

    const EPS: f64 = 1e-9;

    fn entry(id: u64, score: f64, genres: &[&str], tags: &[(&str, u32)]) -> HistoryEntry {
        HistoryEntry {
            media_id: MediaId(id),
            score,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            tags: tags.iter().map(|(n, r)| MediaTag::new(*n, *r)).collect(),
        }
    }

    fn candidate(id: u64, genres: &[&str], tags: &[(&str, u32)]) -> Media {
        Media {
            id: MediaId(id),
            title: None,
            cover_image: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            tags: tags.iter().map(|(n, r)| MediaTag::new(*n, *r)).collect(),
            format: None,
            popularity: None,
            relations: vec![],
        }
    }

    fn config() -> RecommenderConfig {
        RecommenderConfig {
            relevant_tags: vec!["isekai".into(), "harem".into(), "military".into()],
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn history() -> Vec<HistoryEntry> {
        vec![
            entry(1, 95.0, &["Action", "Fantasy"], &[("Isekai", 100), ("Military", 80)]),
            entry(2, 90.0, &["Action"], &[("Isekai", 90)]),
            entry(3, 20.0, &["Romance"], &[("Harem", 100)]),
            entry(4, 30.0, &["Romance", "Comedy"], &[("Harem", 90)]),
        ]
    }

    #[test]
    fn test_genre_score_sums_liked_weights() {
        let config = config();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let both = scorer.genre_score(&candidate(10, &["ACTION", "fantasy"], &[]));
        assert!((both - 1.0).abs() < EPS);

        let unknown = scorer.genre_score(&candidate(11, &["Sports"], &[]));
        assert_eq!(unknown, 0.0);
    }

    #[test]
    fn test_genre_score_penalizes_disliked_and_clamps() {
        let config = config();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let plain = scorer.genre_score(&candidate(10, &["Action"], &[]));
        let mixed = scorer.genre_score(&candidate(11, &["Action", "Romance"], &[]));
        assert!(mixed < plain);

        let disliked = scorer.genre_score(&candidate(12, &["Romance", "Comedy"], &[]));
        assert_eq!(disliked, 0.0);
    }

    #[test]
    fn test_tag_alignment_ignores_tags_outside_allow_list() {
        let config = RecommenderConfig {
            relevant_tags: vec!["military".into()],
            ..Default::default()
        }
        .validate()
        .unwrap();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let tags = scorer.tag_alignment(&candidate(10, &["Action"], &[("Isekai", 100)]));
        assert_eq!(tags, TagAlignment::default());
    }

    #[test]
    fn test_tag_alignment_skips_spoiler_tags() {
        let config = config();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let mut item = candidate(10, &["Action"], &[("Isekai", 100)]);
        item.tags[0].is_spoiler = true;
        assert_eq!(scorer.tag_alignment(&item), TagAlignment::default());

        item.tags.push(MediaTag::new("Isekai", 70));
        let visible = scorer.tag_alignment(&item);
        assert!((visible.positive - 0.7).abs() < EPS);
    }

    #[test]
    fn test_allow_list_matches_regardless_of_casing() {
        // Built without validate(), so the allow-list keeps its casing
        let config = RecommenderConfig {
            relevant_tags: vec![" Isekai ".into(), "HAREM".into()],
            ..Default::default()
        };
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let liked = scorer.tag_alignment(&candidate(10, &[], &[("isekai", 80)]));
        assert!((liked.positive - 0.8).abs() < EPS);

        let disliked = scorer.tag_alignment(&candidate(11, &[], &[("Harem", 100)]));
        assert!((disliked.negative - 1.0).abs() < EPS);
    }

    #[test]
    fn test_tag_alignment_positive_and_negative() {
        let config = config();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let liked = scorer.tag_alignment(&candidate(10, &[], &[("Isekai", 80)]));
        assert!((liked.positive - 0.8).abs() < EPS);
        assert_eq!(liked.negative, 0.0);
        assert!((liked.alignment - 0.8).abs() < EPS);

        let mixed = scorer.tag_alignment(&candidate(11, &[], &[("Isekai", 80), ("Harem", 100)]));
        assert!((mixed.negative - 1.0).abs() < EPS);
        assert!((mixed.alignment - (0.8 - config.negative_tag_factor)).abs() < EPS);

        let disliked = scorer.tag_alignment(&candidate(12, &[], &[("Harem", 100)]));
        assert_eq!(disliked.alignment, 0.0);
    }

    #[test]
    fn test_zero_genre_score_means_zero_combined() {
        let config = config();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let scored = scorer.score(candidate(10, &["Sports"], &[("Isekai", 100)]));
        assert_eq!(scored.genre_score, 0.0);
        assert!(scored.tag_alignment > 0.0);
        assert_eq!(scored.combined_score, 0.0);
    }

    #[test]
    fn test_tags_amplify_genre_match() {
        let config = config();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let plain = scorer.score(candidate(10, &["Action", "Fantasy"], &[]));
        let boosted = scorer.score(candidate(11, &["Action", "Fantasy"], &[("Isekai", 100)]));

        assert!((plain.combined_score - 1.0).abs() < EPS);
        assert!((boosted.combined_score - (1.0 + config.tag_multiplier)).abs() < EPS);
    }

    #[test]
    fn test_combined_stays_within_bounds() {
        let config = config();
        let profile = UserProfile::build(&history(), &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let candidates = vec![
            candidate(1, &["Action", "Fantasy", "Action"], &[("Isekai", 100), ("Military", 100)]),
            candidate(2, &["Romance"], &[("Harem", 100)]),
            candidate(3, &[], &[]),
            candidate(4, &["Fantasy", "Comedy"], &[("Military", 30), ("Harem", 10)]),
        ];

        for scored in scorer.score_all(candidates) {
            assert!(scored.combined_score >= 0.0);
            assert!(scored.combined_score <= 1.0 + config.tag_multiplier + EPS);
            assert!((0.0..=1.0).contains(&scored.genre_score));
            assert!((0.0..=1.0).contains(&scored.tag_alignment));
        }
    }

    #[test]
    fn test_cold_start_uses_tag_alignment_alone() {
        let config = config();
        // No genres at all, so nothing is liked
        let history = vec![
            entry(1, 90.0, &[], &[("Isekai", 100)]),
            entry(2, 30.0, &[], &[]),
        ];
        let profile = UserProfile::build(&history, &config).unwrap();
        let scorer = Scorer::new(&profile, &config);

        let scored = scorer.score(candidate(10, &["Action"], &[("Isekai", 60)]));
        assert_eq!(scored.genre_score, 0.0);
        assert!((scored.combined_score - 0.6).abs() < EPS);
    }
}
