use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// AniList GraphQL endpoint
    #[serde(default = "default_anilist_api_url")]
    pub anilist_api_url: String,

    /// Items requested per catalog page
    #[serde(default = "default_catalog_per_page")]
    pub catalog_per_page: u32,

    /// TTL in seconds for cached user lists
    #[serde(default = "default_user_list_cache_ttl")]
    pub user_list_cache_ttl: u64,

    /// TTL in seconds for cached candidate batches
    #[serde(default = "default_candidate_cache_ttl")]
    pub candidate_cache_ttl: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_anilist_api_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_catalog_per_page() -> u32 {
    50
}

fn default_user_list_cache_ttl() -> u64 {
    300
}

fn default_candidate_cache_ttl() -> u64 {
    3600
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

/// Tunables of the recommendation engine.
///
/// Read from `RECOMMENDER_*` environment variables; anything unset keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Evidence needed before a genre affinity is trusted
    #[serde(default = "default_shrinkage_genre_k")]
    pub shrinkage_genre_k: f64,

    /// Evidence needed before a tag affinity is trusted (relevance mass, not count)
    #[serde(default = "default_shrinkage_tag_k")]
    pub shrinkage_tag_k: f64,

    #[serde(default = "default_genres_to_fetch_count")]
    pub genres_to_fetch_count: usize,

    #[serde(default = "default_tags_to_fetch_count")]
    pub tags_to_fetch_count: usize,

    #[serde(default = "default_pages_per_genre")]
    pub pages_per_genre: u32,

    #[serde(default = "default_pages_per_tag")]
    pub pages_per_tag: u32,

    #[serde(default = "default_neg_genre_penalty")]
    pub neg_genre_penalty: f64,

    #[serde(default = "default_negative_tag_factor")]
    pub negative_tag_factor: f64,

    #[serde(default = "default_tag_multiplier")]
    pub tag_multiplier: f64,

    #[serde(default = "default_tag_exponent")]
    pub tag_exponent: f64,

    /// Tags allowed to contribute to tag alignment
    #[serde(default = "default_relevant_tags")]
    pub relevant_tags: Vec<String>,

    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_shrinkage_genre_k() -> f64 {
    3.0
}

fn default_shrinkage_tag_k() -> f64 {
    5.0
}

fn default_genres_to_fetch_count() -> usize {
    3
}

fn default_tags_to_fetch_count() -> usize {
    3
}

fn default_pages_per_genre() -> u32 {
    2
}

fn default_pages_per_tag() -> u32 {
    1
}

fn default_neg_genre_penalty() -> f64 {
    0.5
}

fn default_negative_tag_factor() -> f64 {
    0.5
}

fn default_tag_multiplier() -> f64 {
    0.5
}

fn default_tag_exponent() -> f64 {
    1.5
}

fn default_max_recommendations() -> usize {
    20
}

fn default_relevant_tags() -> Vec<String> {
    [
        "male protagonist",
        "female protagonist",
        "ensemble cast",
        "primarily adult cast",
        "primarily teen cast",
        "coming of age",
        "found family",
        "tragedy",
        "revenge",
        "anti-hero",
        "philosophy",
        "psychological",
        "time manipulation",
        "time skip",
        "isekai",
        "super power",
        "magic",
        "military",
        "war",
        "survival",
        "school",
        "school club",
        "iyashikei",
        "cgdct",
        "workplace",
        "politics",
        "detective",
        "dystopian",
        "post-apocalyptic",
        "urban fantasy",
        "mecha",
        "martial arts",
        "swordplay",
        "music",
        "cooking",
        "food",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            shrinkage_genre_k: default_shrinkage_genre_k(),
            shrinkage_tag_k: default_shrinkage_tag_k(),
            genres_to_fetch_count: default_genres_to_fetch_count(),
            tags_to_fetch_count: default_tags_to_fetch_count(),
            pages_per_genre: default_pages_per_genre(),
            pages_per_tag: default_pages_per_tag(),
            neg_genre_penalty: default_neg_genre_penalty(),
            negative_tag_factor: default_negative_tag_factor(),
            tag_multiplier: default_tag_multiplier(),
            tag_exponent: default_tag_exponent(),
            relevant_tags: default_relevant_tags(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

impl RecommenderConfig {
    /// Load recommender tunables from `RECOMMENDER_*` environment variables
    ///
    /// The result is validated before it is returned.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::prefixed("RECOMMENDER_")
            .from_env::<RecommenderConfig>()
            .map_err(|e| anyhow::anyhow!("Failed to load recommender config: {}", e))?;
        Ok(config.validate()?)
    }

    /// Rejects tunables outside their domain and normalizes the tag allow-list
    pub fn validate(mut self) -> AppResult<Self> {
        let non_negative = [
            ("shrinkage_genre_k", self.shrinkage_genre_k),
            ("shrinkage_tag_k", self.shrinkage_tag_k),
            ("neg_genre_penalty", self.neg_genre_penalty),
            ("negative_tag_factor", self.negative_tag_factor),
            ("tag_multiplier", self.tag_multiplier),
            ("tag_exponent", self.tag_exponent),
        ];

        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::InvalidConfig(format!(
                    "{} must be a finite number >= 0, got {}",
                    name, value
                )));
            }
        }

        if self.max_recommendations == 0 {
            return Err(AppError::InvalidConfig(
                "max_recommendations must be greater than 0".to_string(),
            ));
        }

        let mut tags: Vec<String> = self
            .relevant_tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        self.relevant_tags = tags;

        Ok(self)
    }

    /// Returns a copy capped at `limit` results, validated like the base config
    pub fn with_limit(&self, limit: Option<usize>) -> AppResult<Self> {
        match limit {
            Some(max_recommendations) => Self {
                max_recommendations,
                ..self.clone()
            }
            .validate(),
            None => Ok(self.clone()),
        }
    }
}
