use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use nw_core::storage::newest_first;
use nw_core::{ArticleStorage, CanonicalArticle, Category, NewArticle, Result, UpsertOutcome};
use tokio::sync::RwLock;

use crate::StorageBackend;

/// Process-local store. Upserts hold the write lock for the whole
/// check-then-write, so concurrent ingestions of one link produce one creation.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    articles: RwLock<HashMap<String, CanonicalArticle>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect<F>(&self, keep: F) -> Vec<CanonicalArticle>
    where
        F: Fn(&CanonicalArticle) -> bool,
    {
        let articles = self.articles.read().await;
        let mut found: Vec<_> = articles.values().filter(|a| keep(a)).cloned().collect();
        found.sort_by(newest_first);
        found
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should always be available"
    }

    async fn new() -> Result<Self> {
        Ok(InMemoryStorage::default())
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn upsert_article(&self, article: &NewArticle) -> Result<UpsertOutcome> {
        let mut articles = self.articles.write().await;
        if let Some(existing) = articles.get_mut(&article.link) {
            article.apply_to(existing);
            return Ok(UpsertOutcome {
                article: existing.clone(),
                created: false,
            });
        }

        let created = article.clone().into_canonical(Utc::now());
        articles.insert(created.link.clone(), created.clone());
        Ok(UpsertOutcome {
            article: created,
            created: true,
        })
    }

    async fn get_by_link(&self, link: &str) -> Result<Option<CanonicalArticle>> {
        Ok(self.articles.read().await.get(link).cloned())
    }

    async fn get_by_source(&self, source: &str) -> Result<Vec<CanonicalArticle>> {
        Ok(self.collect(|a| a.source == source).await)
    }

    async fn get_by_category(&self, category: Category) -> Result<Vec<CanonicalArticle>> {
        Ok(self.collect(|a| a.category == category).await)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CanonicalArticle>> {
        let mut all = self.collect(|_| true).await;
        all.truncate(limit);
        Ok(all)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.articles.read().await.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut articles = self.articles.write().await;
        let removed = articles.len();
        articles.clear();
        Ok(removed)
    }
}
