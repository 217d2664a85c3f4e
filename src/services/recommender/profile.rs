//! Preference aggregation: turns a rated history into genre and tag affinities.
//!
//! Every affinity is the distance of a category's mean score from the user's
//! overall mean, scaled to roughly `[-1, 1]` and shrunk toward zero by
//! `support / (support + K)`. Genres use the occurrence count as support,
//! tags use the summed tag relevance.

use std::collections::BTreeMap;

use crate::{
    config::RecommenderConfig,
    error::{AppError, AppResult},
    models::{category_key, HistoryEntry},
};

/// Mean used when there is nothing to average
const NEUTRAL_MEAN: f64 = 50.0;

/// Pulls `raw` toward zero in proportion to how little evidence backs it
pub fn shrink(raw: f64, support: f64, k: f64) -> f64 {
    let denominator = support + k;
    if denominator <= 0.0 {
        return 0.0;
    }
    raw * (support / denominator)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreAffinity {
    pub raw_centered_mean: f64,
    pub support_count: usize,
    pub shrunk_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagAffinity {
    pub tag_mean: f64,
    pub relevance_mass: f64,
    pub occurrences: usize,
    pub shrunk_score: f64,
}

/// Non-negative weights keyed by category, summing to 1 when non-empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightMap(BTreeMap<String, f64>);

impl WeightMap {
    /// Normalizes strictly positive magnitudes; anything else is dropped
    pub fn normalized<I>(magnitudes: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let positive: BTreeMap<String, f64> = magnitudes
            .into_iter()
            .filter(|(_, v)| *v > 0.0)
            .collect();

        let total: f64 = positive.values().sum();
        if total <= 0.0 {
            return Self::default();
        }

        Self(positive.into_iter().map(|(k, v)| (k, v / total)).collect())
    }

    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }
}

/// Per-run preference profile. Built fresh for every recommendation run.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_mean: f64,
    pub rated_count: usize,
    pub genres: BTreeMap<String, GenreAffinity>,
    pub tags: BTreeMap<String, TagAffinity>,
    pub liked_genres: WeightMap,
    pub disliked_genres: WeightMap,
}

#[derive(Default)]
struct GenreAccumulator {
    sum: f64,
    count: usize,
}

#[derive(Default)]
struct TagAccumulator {
    weighted_sum: f64,
    relevance_mass: f64,
    occurrences: usize,
}

impl UserProfile {
    /// Builds the profile from a user's list
    ///
    /// Only positively scored entries are used, unless there are none, in which
    /// case every entry is.
    pub fn build(history: &[HistoryEntry], config: &RecommenderConfig) -> AppResult<Self> {
        if history.is_empty() {
            return Err(AppError::EmptyHistory);
        }

        if let Some(bad) = history
            .iter()
            .find(|e| !e.score.is_finite() || e.score < 0.0)
        {
            return Err(AppError::InvalidInput(format!(
                "score for media {} must be a finite number >= 0",
                bad.media_id
            )));
        }

        let scored: Vec<&HistoryEntry> = history.iter().filter(|e| e.score > 0.0).collect();
        let rated: Vec<&HistoryEntry> = if scored.is_empty() {
            history.iter().collect()
        } else {
            scored
        };

        let user_mean = if rated.is_empty() {
            NEUTRAL_MEAN
        } else {
            rated.iter().map(|e| e.score).sum::<f64>() / rated.len() as f64
        };

        let genres = Self::genre_affinities(&rated, user_mean, config.shrinkage_genre_k);
        let tags = Self::tag_affinities(&rated, user_mean, config.shrinkage_tag_k);

        let liked_genres = WeightMap::normalized(
            genres
                .iter()
                .filter(|(_, a)| a.shrunk_score > 0.0)
                .map(|(k, a)| (k.clone(), a.shrunk_score)),
        );
        let disliked_genres = WeightMap::normalized(
            genres
                .iter()
                .filter(|(_, a)| a.shrunk_score < 0.0)
                .map(|(k, a)| (k.clone(), a.shrunk_score.abs())),
        );

        tracing::debug!(
            rated = rated.len(),
            user_mean,
            genres = genres.len(),
            tags = tags.len(),
            liked = liked_genres.len(),
            disliked = disliked_genres.len(),
            "Preference profile built"
        );

        Ok(Self {
            user_mean,
            rated_count: rated.len(),
            genres,
            tags,
            liked_genres,
            disliked_genres,
        })
    }

    fn genre_affinities(
        rated: &[&HistoryEntry],
        user_mean: f64,
        k: f64,
    ) -> BTreeMap<String, GenreAffinity> {
        let mut stats: BTreeMap<String, GenreAccumulator> = BTreeMap::new();

        for entry in rated {
            for genre in &entry.genres {
                let key = category_key(genre);
                if key.is_empty() {
                    continue;
                }
                let acc = stats.entry(key).or_default();
                acc.sum += entry.score;
                acc.count += 1;
            }
        }

        stats
            .into_iter()
            .map(|(key, acc)| {
                let mean = acc.sum / acc.count as f64;
                let centered = (mean - user_mean) / 100.0;
                let affinity = GenreAffinity {
                    raw_centered_mean: centered,
                    support_count: acc.count,
                    shrunk_score: shrink(centered, acc.count as f64, k),
                };
                (key, affinity)
            })
            .collect()
    }

    fn tag_affinities(
        rated: &[&HistoryEntry],
        user_mean: f64,
        k: f64,
    ) -> BTreeMap<String, TagAffinity> {
        let mut stats: BTreeMap<String, TagAccumulator> = BTreeMap::new();

        for entry in rated {
            for tag in &entry.tags {
                let key = category_key(&tag.name);
                if key.is_empty() {
                    continue;
                }
                let relevance = tag.relevance();
                let acc = stats.entry(key).or_default();
                acc.weighted_sum += entry.score * relevance;
                acc.relevance_mass += relevance;
                acc.occurrences += 1;
            }
        }

        stats
            .into_iter()
            .map(|(key, acc)| {
                let affinity = if acc.relevance_mass <= 0.0 {
                    TagAffinity {
                        tag_mean: 0.0,
                        relevance_mass: 0.0,
                        occurrences: acc.occurrences,
                        shrunk_score: 0.0,
                    }
                } else {
                    let tag_mean = acc.weighted_sum / acc.relevance_mass;
                    let diff = (tag_mean - user_mean) / 100.0;
                    TagAffinity {
                        tag_mean,
                        relevance_mass: acc.relevance_mass,
                        occurrences: acc.occurrences,
                        shrunk_score: shrink(diff, acc.relevance_mass, k),
                    }
                };
                (key, affinity)
            })
            .collect()
    }

    /// Signed affinity for a tag key, 0 when the tag never appeared
    pub fn tag_weight(&self, key: &str) -> f64 {
        self.tags.get(key).map(|t| t.shrunk_score).unwrap_or(0.0)
    }

    /// True when the user likes at least one genre
    pub fn has_liked_genres(&self) -> bool {
        !self.liked_genres.is_empty()
    }
}
