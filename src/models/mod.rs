use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod anilist;
pub mod recommendation;

pub use recommendation::{
    ProfileSummary, RecommendationRequest, RecommendationResponse, RecommendedItem,
};

/// Catalog identifier of a media item (AniList media id)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MediaId(pub u64);

impl Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercased, trimmed form used to key genres and tags
pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    #[serde(other)]
    Unknown,
}

impl MediaFormat {
    /// Music videos and one-off specials are never recommended
    pub fn is_special_interest(&self) -> bool {
        matches!(self, MediaFormat::Music | MediaFormat::Special)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Adaptation,
    Prequel,
    Sequel,
    Parent,
    SideStory,
    Character,
    Summary,
    Alternative,
    SpinOff,
    Other,
    Source,
    Compilation,
    Contains,
    #[serde(other)]
    Unknown,
}

impl RelationType {
    /// Relations that make an item a continuation or retelling of what it points to
    pub fn is_continuity(&self) -> bool {
        matches!(
            self,
            RelationType::Prequel
                | RelationType::Sequel
                | RelationType::Alternative
                | RelationType::Parent
                | RelationType::SideStory
                | RelationType::Summary
                | RelationType::Compilation
        )
    }
}

/// A tag attached to a media item, ranked 0..=100 by how well it applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaTag {
    pub name: String,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub is_spoiler: bool,
}

impl MediaTag {
    pub fn new(name: impl Into<String>, rank: u32) -> Self {
        Self {
            name: name.into(),
            rank,
            is_spoiler: false,
        }
    }

    /// Rank mapped to `[0, 1]`
    pub fn relevance(&self) -> f64 {
        (self.rank as f64 / 100.0).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRelation {
    pub relation_type: RelationType,
    pub related_id: MediaId,
    #[serde(default)]
    pub related_popularity: Option<u64>,
}

/// A catalog item as returned by the catalog provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: MediaId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<MediaTag>,
    #[serde(default)]
    pub format: Option<MediaFormat>,
    #[serde(default)]
    pub popularity: Option<u64>,
    #[serde(default)]
    pub relations: Vec<MediaRelation>,
}

impl Media {
    pub fn site_url(&self) -> String {
        format!("https://anilist.co/anime/{}", self.id)
    }

    pub fn related_ids(&self) -> impl Iterator<Item = MediaId> + '_ {
        self.relations.iter().map(|r| r.related_id)
    }
}

/// One entry of a user's list: the item and the user's score (0 = unrated)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub media_id: MediaId,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<MediaTag>,
}

impl HistoryEntry {
    pub fn from_media(media: &Media, score: f64) -> Self {
        Self {
            media_id: media.id,
            score,
            genres: media.genres.clone(),
            tags: media.tags.clone(),
        }
    }
}

/// A genre or tag used to pull candidates from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Category {
    Genre(String),
    Tag(String),
}

impl Category {
    pub fn value(&self) -> &str {
        match self {
            Category::Genre(v) | Category::Tag(v) => v,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Genre(v) => write!(f, "genre:{}", v),
            Category::Tag(v) => write!(f, "tag:{}", v),
        }
    }
}

/// A candidate with its alignment scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub item: Media,
    pub genre_score: f64,
    pub tag_alignment: f64,
    pub pos_tag_score: f64,
    pub neg_tag_score: f64,
    pub combined_score: f64,
}
