/// Catalog provider abstraction
///
/// A catalog provider supplies the two external inputs of a recommendation run:
/// the user's list, and batches of candidate items per genre or tag. The
/// engine itself never talks to the network.
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Category, HistoryEntry, Media},
    services::recommender::CandidateQuery,
};

pub mod anilist;

pub use anilist::AniListProvider;

/// Trait for catalog data providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch every entry on a user's list
    ///
    /// Fails with `UserNotFound` when the user has no list and with
    /// `EmptyHistory` when the list has no entries.
    async fn fetch_user_history(&self, username: &str) -> AppResult<Vec<HistoryEntry>>;

    /// Fetch up to `pages` pages of catalog items matching one genre or tag
    async fn fetch_candidates(&self, category: &Category, pages: u32) -> AppResult<Vec<Media>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Runs every query in parallel and returns the batches that succeeded
///
/// A failed query is logged and contributes nothing. If every query fails the
/// result is empty; it is never an error.
pub async fn fetch_candidate_batches(
    provider: Arc<dyn CatalogProvider>,
    queries: Vec<CandidateQuery>,
) -> Vec<Vec<Media>> {
    let mut tasks = Vec::new();

    for query in queries {
        let provider = Arc::clone(&provider);
        let task = tokio::spawn(async move {
            let result = provider.fetch_candidates(&query.category, query.pages).await;
            (query.category, result)
        });
        tasks.push(task);
    }

    let mut batches = Vec::new();
    let mut error_count = 0;

    for task in tasks {
        match task.await {
            Ok((category, Ok(batch))) => {
                if batch.is_empty() {
                    tracing::debug!(category = %category, "Category returned no candidates");
                }
                batches.push(batch);
            }
            Ok((category, Err(e))) => {
                tracing::error!(
                    category = %category,
                    provider = provider.name(),
                    error = %e,
                    "Candidate fetch failed for category"
                );
                error_count += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "Task join error");
                error_count += 1;
            }
        }
    }

    if error_count > 0 {
        tracing::warn!(
            success_count = batches.len(),
            error_count,
            "Partial candidate fetch failure"
        );
    }

    batches
}
