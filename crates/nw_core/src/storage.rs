use async_trait::async_trait;

use crate::types::{CanonicalArticle, Category, NewArticle, UpsertOutcome};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Create the article if its link is unseen, otherwise update it in place.
    /// A single call is atomic with respect to other upserts of the same link.
    async fn upsert_article(&self, article: &NewArticle) -> Result<UpsertOutcome>;

    /// Look up an article by its canonical link
    async fn get_by_link(&self, link: &str) -> Result<Option<CanonicalArticle>>;

    /// Get all articles from a specific source
    async fn get_by_source(&self, source: &str) -> Result<Vec<CanonicalArticle>>;

    /// Get all articles filed under a category
    async fn get_by_category(&self, category: Category) -> Result<Vec<CanonicalArticle>>;

    /// Newest first: by `published_at` (unknown last), then `created_at`
    async fn recent(&self, limit: usize) -> Result<Vec<CanonicalArticle>>;

    async fn count(&self) -> Result<usize>;

    /// Operator bulk clear. Returns the number of removed articles.
    async fn clear(&self) -> Result<usize>;
}

/// Ordering shared by the backends for `recent`.
pub fn newest_first(a: &CanonicalArticle, b: &CanonicalArticle) -> std::cmp::Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.created_at.cmp(&a.created_at))
}
