/// AniList catalog provider
///
/// Talks to the public AniList GraphQL API:
/// 1. User list: `MediaListCollection(userName, type: ANIME)` → every list entry with its media
/// 2. Candidates: `Page { media(genre_in | tag_in, sort: POPULARITY_DESC) }`, one request per page
///
/// Both calls are read through the Redis cache.
use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        anilist::{GraphQlResponse, PageData, UserListData},
        Category, HistoryEntry, Media,
    },
    services::providers::CatalogProvider,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

const MEDIA_FIELDS: &str = r#"
    id
    title { romaji }
    coverImage { large }
    genres
    format
    popularity
    tags { name rank isMediaSpoiler }
    relations { edges { relationType node { id popularity } } }
"#;

fn user_list_query() -> String {
    format!(
        r#"
        query ($username: String) {{
          MediaListCollection(userName: $username, type: ANIME) {{
            lists {{
              entries {{
                score(format: POINT_100)
                media {{ {fields} }}
              }}
            }}
          }}
        }}"#,
        fields = MEDIA_FIELDS
    )
}

fn candidates_query(category: &Category) -> String {
    let filter_field = match category {
        Category::Genre(_) => "genre_in",
        Category::Tag(_) => "tag_in",
    };

    format!(
        r#"
        query ($value: String, $perPage: Int, $page: Int) {{
          Page(page: $page, perPage: $perPage) {{
            media({filter_field}: [$value], type: ANIME, sort: POPULARITY_DESC) {{ {fields} }}
          }}
        }}"#,
        filter_field = filter_field,
        fields = MEDIA_FIELDS
    )
}

/// Interprets a GraphQL response body
///
/// 404 means the requested entity does not exist and yields `Ok(None)`.
/// Other failures become `ExternalApi` carrying the first GraphQL error message.
fn parse_graphql_response<T: DeserializeOwned>(status: StatusCode, body: &str) -> AppResult<Option<T>> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let parsed: GraphQlResponse<T> = serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, status = %status, "Failed to deserialize AniList response");
        AppError::ExternalApi(format!("Failed to parse AniList response: {}", e))
    })?;

    if !status.is_success() || (parsed.data.is_none() && !parsed.errors.is_empty()) {
        let message = parsed
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("AniList API returned status {}", status));
        return Err(AppError::ExternalApi(message));
    }

    Ok(parsed.data)
}

#[derive(Clone)]
pub struct AniListProvider {
    http_client: HttpClient,
    api_url: String,
    per_page: u32,
    cache: Cache,
    user_list_ttl: u64,
    candidate_ttl: u64,
}

impl AniListProvider {
    pub fn new(cache: Cache, config: &Config) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: config.anilist_api_url.clone(),
            per_page: config.catalog_per_page.max(1),
            cache,
            user_list_ttl: config.user_list_cache_ttl,
            candidate_ttl: config.candidate_cache_ttl,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> AppResult<Option<T>> {
        let response = self
            .http_client
            .post(&self.api_url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_graphql_response(status, &body)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for AniListProvider {
    async fn fetch_user_history(&self, username: &str) -> AppResult<Vec<HistoryEntry>> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidInput("Username cannot be empty".to_string()));
        }

        cached!(
            self.cache,
            CacheKey::UserList(username.to_string()),
            self.user_list_ttl,
            async move {
                let data: Option<UserListData> = self
                    .execute(&user_list_query(), json!({ "username": username }))
                    .await?;

                let collection = data
                    .and_then(|d| d.media_list_collection)
                    .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;

                let history = collection.into_history();
                if history.is_empty() {
                    return Err(AppError::EmptyHistory);
                }

                tracing::info!(
                    username = %username,
                    entries = history.len(),
                    provider = "anilist",
                    "User list fetched"
                );

                Ok::<_, AppError>(history)
            }
        )
    }

    async fn fetch_candidates(&self, category: &Category, pages: u32) -> AppResult<Vec<Media>> {
        cached!(
            self.cache,
            CacheKey::Candidates {
                category: category.clone(),
                pages,
            },
            self.candidate_ttl,
            async move {
                let query = candidates_query(category);
                let mut all = Vec::new();

                for page in 1..=pages {
                    let data: Option<PageData> = self
                        .execute(
                            &query,
                            json!({
                                "value": category.value(),
                                "perPage": self.per_page,
                                "page": page,
                            }),
                        )
                        .await?;

                    let batch: Vec<Media> = data
                        .and_then(|d| d.page)
                        .map(|p| p.media)
                        .unwrap_or_default()
                        .into_iter()
                        .map(Media::from)
                        .collect();

                    let short_page = batch.len() < self.per_page as usize;
                    all.extend(batch);
                    if short_page {
                        break;
                    }
                }

                tracing::info!(
                    category = %category,
                    pages,
                    results = all.len(),
                    provider = "anilist",
                    "Candidates fetched"
                );

                Ok::<_, AppError>(all)
            }
        )
    }

    fn name(&self) -> &'static str {
        "anilist"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_redis_client;
    use crate::models::MediaId;

    /// Provider whose Redis and AniList endpoints both refuse connections
    fn unreachable_provider() -> AniListProvider {
        let config = Config {
            redis_url: "redis://127.0.0.1:1".to_string(),
            anilist_api_url: "http://127.0.0.1:1".to_string(),
            catalog_per_page: 50,
            user_list_cache_ttl: 60,
            candidate_cache_ttl: 60,
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let client = create_redis_client(&config.redis_url).unwrap();
        let (cache, _handle) = Cache::new(client);
        AniListProvider::new(cache, &config)
    }

    #[tokio::test]
    async fn test_cache_outage_falls_through_to_catalog() {
        let provider = unreachable_provider();

        let result = provider
            .fetch_candidates(&Category::Genre("action".into()), 1)
            .await;

        // The request reached the catalog instead of stopping at the cache
        assert!(
            matches!(result, Err(AppError::HttpClient(_))),
            "unexpected result: {:?}",
            result.map(|m| m.len())
        );
    }

    #[tokio::test]
    async fn test_cache_outage_user_history_reaches_catalog() {
        let provider = unreachable_provider();

        let result = provider.fetch_user_history("kaori").await;

        assert!(
            matches!(result, Err(AppError::HttpClient(_))),
            "unexpected result: {:?}",
            result.map(|h| h.len())
        );
    }

    #[test]
    fn test_candidates_query_uses_filter_field() {
        let genre = candidates_query(&Category::Genre("action".into()));
        assert!(genre.contains("genre_in: [$value]"));
        assert!(genre.contains("sort: POPULARITY_DESC"));

        let tag = candidates_query(&Category::Tag("isekai".into()));
        assert!(tag.contains("tag_in: [$value]"));
        assert!(tag.contains("isMediaSpoiler"));
    }

    #[test]
    fn test_user_list_query_requests_relations() {
        let query = user_list_query();
        assert!(query.contains("MediaListCollection(userName: $username, type: ANIME)"));
        assert!(query.contains("relations { edges { relationType node { id popularity } } }"));
    }

    #[test]
    fn test_parse_page_response() {
        let body = r#"{ "data": { "Page": { "media": [
            { "id": 1, "genres": ["Action"], "format": "TV", "popularity": 10 },
            { "id": 2, "genres": ["Drama"], "format": "MOVIE" }
        ] } } }"#;

        let data: Option<PageData> = parse_graphql_response(StatusCode::OK, body).unwrap();
        let media: Vec<Media> = data.unwrap().page.unwrap().media.into_iter().map(Media::from).collect();

        assert_eq!(media.len(), 2);
        assert_eq!(media[1].id, MediaId(2));
    }

    #[test]
    fn test_parse_not_found_is_none() {
        let body = r#"{ "data": null, "errors": [{ "message": "User not found" }] }"#;
        let data: Option<UserListData> = parse_graphql_response(StatusCode::NOT_FOUND, body).unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn test_parse_error_uses_first_message() {
        let body = r#"{ "data": null, "errors": [{ "message": "Too Many Requests." }] }"#;
        let result: AppResult<Option<PageData>> =
            parse_graphql_response(StatusCode::TOO_MANY_REQUESTS, body);

        match result {
            Err(AppError::ExternalApi(message)) => assert_eq!(message, "Too Many Requests."),
            other => panic!("unexpected result: {:?}", other.map(|d| d.is_some())),
        }
    }

    #[test]
    fn test_parse_error_without_body_message() {
        let result: AppResult<Option<PageData>> =
            parse_graphql_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{ "data": null }"#);
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[test]
    fn test_parse_invalid_json() {
        let result: AppResult<Option<PageData>> = parse_graphql_response(StatusCode::OK, "<html>");
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }
}
