use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use nw_core::{
    ArticleStorage, CanonicalArticle, Category, Error, NewArticle, Result, UpsertOutcome,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::StorageBackend;

pub const DEFAULT_DB_PATH: &str = "data/articles.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        link TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        source TEXT NOT NULL,
        category TEXT NOT NULL,
        image TEXT,
        published_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_source ON articles (source)",
    "CREATE INDEX IF NOT EXISTS idx_articles_category ON articles (category)",
    // Add future migrations here
];

const RECENT_ORDER: &str = "ORDER BY published_at IS NULL, published_at DESC, created_at DESC";

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be writable at ./data/articles.db"
    }

    async fn new() -> Result<Self> {
        Self::new_with_path(Path::new(DEFAULT_DB_PATH)).await
    }
}

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> Error + '_ {
    move |e| Error::Database(format!("{}: {}", context, e))
}

// Fixed-width UTC text keeps lexical order equal to time order.
fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn from_db_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {:?}: {}", value, e)))
}

fn row_to_article(row: &SqliteRow) -> Result<CanonicalArticle> {
    let category: String = row.try_get("category").map_err(db_error("category"))?;
    let published_at: Option<String> = row.try_get("published_at").map_err(db_error("published_at"))?;
    let created_at: String = row.try_get("created_at").map_err(db_error("created_at"))?;

    Ok(CanonicalArticle {
        link: row.try_get("link").map_err(db_error("link"))?,
        title: row.try_get("title").map_err(db_error("title"))?,
        source: row.try_get("source").map_err(db_error("source"))?,
        category: category.parse::<Category>()?,
        image: row.try_get("image").map_err(db_error("image"))?,
        published_at: published_at.as_deref().map(from_db_time).transpose()?,
        created_at: from_db_time(&created_at)?,
    })
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn fetch_where(&self, clause: &str, value: &str) -> Result<Vec<CanonicalArticle>> {
        let sql = format!("SELECT * FROM articles WHERE {} = ? {}", clause, RECENT_ORDER);
        let rows = sqlx::query(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to query articles"))?;
        rows.iter().map(row_to_article).collect()
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn upsert_article(&self, article: &NewArticle) -> Result<UpsertOutcome> {
        let published_at = article.published_at.as_ref().map(to_db_time);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to open transaction"))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO articles (link, title, source, category, image, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (link) DO NOTHING
            "#,
        )
        .bind(&article.link)
        .bind(&article.title)
        .bind(&article.source)
        .bind(article.category.as_str())
        .bind(article.image.as_deref())
        .bind(published_at.as_deref())
        .bind(to_db_time(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert article"))?
        .rows_affected()
            == 1;

        if !inserted {
            sqlx::query(
                r#"
                UPDATE articles
                SET title = ?, source = ?, category = ?, image = ?,
                    published_at = COALESCE(published_at, ?)
                WHERE link = ?
                "#,
            )
            .bind(&article.title)
            .bind(&article.source)
            .bind(article.category.as_str())
            .bind(article.image.as_deref())
            .bind(published_at.as_deref())
            .bind(&article.link)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update article"))?;
        }

        let row = sqlx::query("SELECT * FROM articles WHERE link = ?")
            .bind(&article.link)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to read back article"))?;
        let stored = row_to_article(&row)?;

        tx.commit().await.map_err(db_error("Failed to commit article"))?;

        Ok(UpsertOutcome {
            article: stored,
            created: inserted,
        })
    }

    async fn get_by_link(&self, link: &str) -> Result<Option<CanonicalArticle>> {
        let row = sqlx::query("SELECT * FROM articles WHERE link = ?")
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get article"))?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn get_by_source(&self, source: &str) -> Result<Vec<CanonicalArticle>> {
        self.fetch_where("source", source).await
    }

    async fn get_by_category(&self, category: Category) -> Result<Vec<CanonicalArticle>> {
        self.fetch_where("category", category.as_str()).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CanonicalArticle>> {
        let sql = format!("SELECT * FROM articles {} LIMIT ?", RECENT_ORDER);
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list recent articles"))?;
        rows.iter().map(row_to_article).collect()
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count articles"))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<usize> {
        let result = sqlx::query("DELETE FROM articles")
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to clear articles"))?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn article(link: &str, title: &str) -> NewArticle {
        NewArticle {
            link: link.to_string(),
            title: title.to_string(),
            source: "New York Times".to_string(),
            category: Category::Politics,
            image: None,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_sqlite_upsert_rules() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db"))
            .await
            .unwrap();

        let first = storage.upsert_article(&article("https://a.example/1", "X")).await.unwrap();
        assert!(first.created);
        assert_eq!(first.article.published_at, None);

        let when = Utc.with_ymd_and_hms(2025, 10, 6, 16, 42, 0).unwrap();
        let mut update = article("https://a.example/1", "Y");
        update.published_at = Some(when);
        update.image = Some("https://img.example/1.jpg".to_string());
        let second = storage.upsert_article(&update).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.article.title, "Y");
        assert_eq!(second.article.published_at, Some(when));
        assert_eq!(second.article.created_at, first.article.created_at);

        let mut later = article("https://a.example/1", "Z");
        later.published_at = Some(Utc.with_ymd_and_hms(2025, 10, 9, 0, 0, 0).unwrap());
        let third = storage.upsert_article(&later).await.unwrap();
        assert_eq!(third.article.published_at, Some(when));
        assert_eq!(third.article.image, None);

        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_concurrent_upserts_create_once() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(
            SQLiteStorage::new_with_path(&temp_dir.path().join("race.db"))
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .upsert_article(&article("https://a.example/race", &format!("t{}", i)))
                    .await
                    .map(|o| o.created)
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_queries() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("q.db"))
            .await
            .unwrap();

        let mut dated = article("https://a.example/dated", "dated");
        dated.published_at = Some(Utc.with_ymd_and_hms(2025, 10, 6, 16, 42, 0).unwrap());
        storage.upsert_article(&article("https://a.example/undated", "undated")).await.unwrap();
        storage.upsert_article(&dated).await.unwrap();

        let recent = storage.recent(10).await.unwrap();
        assert_eq!(recent[0].title, "dated");
        assert_eq!(recent[1].title, "undated");

        assert_eq!(storage.get_by_source("New York Times").await.unwrap().len(), 2);
        assert_eq!(storage.get_by_category(Category::Sports).await.unwrap().len(), 0);
        assert!(storage.get_by_link("https://a.example/dated").await.unwrap().is_some());

        assert_eq!(storage.clear().await.unwrap(), 2);
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
