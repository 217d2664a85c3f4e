//! AniList GraphQL wire types and their conversion into domain models.

use serde::Deserialize;

use super::{HistoryEntry, Media, MediaFormat, MediaId, MediaRelation, MediaTag, RelationType};

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserListData {
    pub media_list_collection: Option<ApiMediaListCollection>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMediaListCollection {
    #[serde(default)]
    pub lists: Vec<ApiMediaList>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMediaList {
    #[serde(default)]
    pub entries: Vec<ApiListEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListEntry {
    #[serde(default)]
    pub score: Option<f64>,
    pub media: Option<ApiMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageData {
    pub page: Option<ApiPage>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub media: Vec<ApiMedia>,
}

/// Raw media record from AniList
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMedia {
    pub id: u64,
    #[serde(default)]
    pub title: Option<ApiTitle>,
    #[serde(default)]
    pub cover_image: Option<ApiCoverImage>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub format: Option<MediaFormat>,
    #[serde(default)]
    pub popularity: Option<u64>,
    #[serde(default)]
    pub tags: Option<Vec<ApiTag>>,
    #[serde(default)]
    pub relations: Option<ApiRelations>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTitle {
    pub romaji: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCoverImage {
    pub large: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTag {
    pub name: Option<String>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub is_media_spoiler: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRelations {
    #[serde(default)]
    pub edges: Vec<ApiRelationEdge>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRelationEdge {
    pub relation_type: Option<RelationType>,
    pub node: Option<ApiRelationNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRelationNode {
    pub id: u64,
    #[serde(default)]
    pub popularity: Option<u64>,
}

impl From<ApiMedia> for Media {
    fn from(api: ApiMedia) -> Self {
        // Nameless tags and edges without a node carry nothing usable
        let tags = api
            .tags
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| {
                t.name.map(|name| MediaTag {
                    name,
                    rank: t.rank.unwrap_or(0),
                    is_spoiler: t.is_media_spoiler.unwrap_or(false),
                })
            })
            .collect();

        let relations = api
            .relations
            .map(|r| r.edges)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|edge| {
                edge.node.map(|node| MediaRelation {
                    relation_type: edge.relation_type.unwrap_or(RelationType::Unknown),
                    related_id: MediaId(node.id),
                    related_popularity: node.popularity,
                })
            })
            .collect();

        Media {
            id: MediaId(api.id),
            title: api.title.and_then(|t| t.romaji),
            cover_image: api.cover_image.and_then(|c| c.large),
            genres: api.genres.unwrap_or_default(),
            tags,
            format: api.format,
            popularity: api.popularity,
            relations,
        }
    }
}

impl ApiMediaListCollection {
    /// Flattens every list into history entries, skipping entries without media
    pub fn into_history(self) -> Vec<HistoryEntry> {
        self.lists
            .into_iter()
            .flat_map(|list| list.entries)
            .filter_map(|entry| {
                let score = entry.score.unwrap_or(0.0);
                entry
                    .media
                    .map(|media| HistoryEntry::from_media(&Media::from(media), score))
            })
            .collect()
    }
}
