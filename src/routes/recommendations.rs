use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{RecommendationRequest, RecommendationResponse, RecommendedItem},
    routes::AppState,
    services::recommender::{self, RecommendationRun},
};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Recommendations for an AniList user, built from their public list
pub async fn recommend_for_user(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(username): Path<String>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::InvalidInput("Username cannot be empty".to_string()));
    }

    let config = state.recommender.with_limit(params.limit)?;

    tracing::info!(
        request_id = %request_id,
        username = %username,
        limit = config.max_recommendations,
        "Processing recommendation request"
    );

    let history = state.provider.fetch_user_history(&username).await?;
    let run = recommender::recommend(&history, state.provider.clone(), &config).await?;

    Ok(Json(to_response(Some(username), run)))
}

/// Recommendations for a history supplied in the request body
pub async fn recommend_from_history(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let config = state.recommender.with_limit(request.limit)?;

    tracing::info!(
        request_id = %request_id,
        history = request.history.len(),
        limit = config.max_recommendations,
        "Processing recommendation request"
    );

    let run = recommender::recommend(&request.history, state.provider.clone(), &config).await?;

    Ok(Json(to_response(None, run)))
}

fn to_response(username: Option<String>, run: RecommendationRun) -> RecommendationResponse {
    RecommendationResponse {
        username,
        generated_at: Utc::now(),
        candidate_count: run.candidate_count,
        recommendations: run.recommendations.iter().map(RecommendedItem::from).collect(),
        profile: run.profile,
    }
}
