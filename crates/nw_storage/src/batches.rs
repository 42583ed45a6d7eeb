use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nw_core::{Category, Error, RawArticle, Result, TimestampNormalizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const CONTAINER_DATA_DIR: &str = "/app/data";
const LOCAL_DATA_DIR: &str = "data";
const FILE_PREFIX: &str = "news_scrape_";
const FILE_SUFFIX: &str = ".csv";
const BATCH_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One row of a batch snapshot. Column order is the file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRow {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub image: String,
    pub source: String,
    pub category: String,
    #[serde(default)]
    pub datetime: String,
}

impl BatchRow {
    pub fn from_record(record: &RawArticle, normalizer: &TimestampNormalizer) -> Self {
        Self {
            title: record.title.clone(),
            link: record.link.clone(),
            image: record.image.clone().unwrap_or_default(),
            source: record.source.clone(),
            category: record.category.to_string(),
            datetime: record
                .published_at_raw
                .as_deref()
                .map(|raw| normalizer.display(raw))
                .unwrap_or_default(),
        }
    }

    pub fn into_record(self) -> Result<RawArticle> {
        let category: Category = self.category.parse()?;
        let image = Some(self.image.trim().to_string()).filter(|s| !s.is_empty());
        let published_at_raw = Some(self.datetime.trim().to_string()).filter(|s| !s.is_empty());
        Ok(RawArticle {
            title: self.title,
            link: self.link,
            image,
            source: self.source,
            category,
            published_at_raw,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchInfo {
    pub batch_id: String,
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
    pub article_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryInfo {
    pub root: PathBuf,
    pub exists: bool,
    pub batch_count: usize,
    pub total_bytes: u64,
    pub latest: Option<String>,
}

/// Folder holding `news_scrape_<YYYYMMDD_HHMMSS>.csv` snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDirectory {
    root: PathBuf,
}

impl BatchDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Explicit path, else the container mount when present, else `./data`.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        match explicit {
            Some(root) => Self::new(root),
            None if Path::new(CONTAINER_DATA_DIR).is_dir() => Self::new(CONTAINER_DATA_DIR),
            None => Self::new(LOCAL_DATA_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn new_batch_id(at: DateTime<Utc>) -> String {
        at.format(BATCH_ID_FORMAT).to_string()
    }

    pub fn path_for(&self, batch_id: &str) -> Result<PathBuf> {
        check_batch_id(batch_id)?;
        Ok(self.root.join(format!("{}{}{}", FILE_PREFIX, batch_id, FILE_SUFFIX)))
    }

    pub fn write_snapshot(
        &self,
        batch_id: &str,
        records: &[RawArticle],
        normalizer: &TimestampNormalizer,
    ) -> Result<PathBuf> {
        let path = self.path_for(batch_id)?;
        fs::create_dir_all(&self.root)?;

        let mut writer = csv::Writer::from_path(&path)?;
        if records.is_empty() {
            writer.write_record(["title", "link", "image", "source", "category", "datetime"])?;
        }
        for record in records {
            writer.serialize(BatchRow::from_record(record, normalizer))?;
        }
        writer.flush()?;

        info!(batch_id, count = records.len(), path = %path.display(), "💾 Saved batch snapshot");
        Ok(path)
    }

    /// Rows that do not fit the column layout are logged and skipped.
    pub fn read_snapshot(&self, batch_id: &str) -> Result<Vec<BatchRow>> {
        let path = self.path_for(batch_id)?;
        if !path.is_file() {
            return Err(Error::Batch(format!("Batch {} not found", batch_id)));
        }
        read_rows(&path)
    }

    /// Newest first.
    pub fn list_batches(&self) -> Result<Vec<BatchInfo>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut batches = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            let batch_id = match batch_id_of(&file_name) {
                Some(id) => id.to_string(),
                None => continue,
            };
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let path = entry.path();
            let article_count = match count_rows(&path) {
                Ok(count) => count,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "unreadable batch file");
                    0
                }
            };
            batches.push(BatchInfo {
                batch_id,
                file_name,
                path,
                size_bytes: metadata.len(),
                modified: metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now()),
                article_count,
            });
        }

        batches.sort_by(|a, b| b.batch_id.cmp(&a.batch_id));
        Ok(batches)
    }

    pub fn find_batch(&self, batch_id: &str) -> Result<Option<BatchInfo>> {
        check_batch_id(batch_id)?;
        Ok(self
            .list_batches()?
            .into_iter()
            .find(|b| b.batch_id == batch_id))
    }

    /// Returns false when there was nothing to delete.
    pub fn delete_batch(&self, batch_id: &str) -> Result<bool> {
        let path = self.path_for(batch_id)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        info!(batch_id, "🗑️ Deleted batch snapshot");
        Ok(true)
    }

    pub fn info(&self) -> Result<DirectoryInfo> {
        let batches = self.list_batches()?;
        Ok(DirectoryInfo {
            root: self.root.clone(),
            exists: self.root.is_dir(),
            batch_count: batches.len(),
            total_bytes: batches.iter().map(|b| b.size_bytes).sum(),
            latest: batches.first().map(|b| b.batch_id.clone()),
        })
    }
}

fn batch_id_of(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .filter(|id| check_batch_id(id).is_ok())
}

fn check_batch_id(batch_id: &str) -> Result<()> {
    let valid = !batch_id.is_empty()
        && batch_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::Batch(format!("Invalid batch id {:?}", batch_id)))
    }
}

pub(crate) fn read_rows(path: &Path) -> Result<Vec<BatchRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<BatchRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => debug!(path = %path.display(), line = line + 2, error = %e, "skipping malformed row"),
        }
    }
    Ok(rows)
}

fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    Ok(reader.records().filter(|r| r.is_ok()).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(link: &str, raw_time: Option<&str>) -> RawArticle {
        RawArticle {
            title: "Sensex rallies, Nifty follows".to_string(),
            link: link.to_string(),
            image: None,
            source: "Economic Times".to_string(),
            category: Category::Economy,
            published_at_raw: raw_time.map(str::to_string),
        }
    }

    #[test]
    fn test_batch_id_format() {
        let at = Utc.with_ymd_and_hms(2025, 10, 6, 16, 42, 5).unwrap();
        assert_eq!(BatchDirectory::new_batch_id(at), "20251006_164205");
    }

    #[test]
    fn test_write_then_read_snapshot() {
        let dir = tempdir().unwrap();
        let batches = BatchDirectory::new(dir.path().join("data"));
        let normalizer = TimestampNormalizer::utc();
        let records = vec![
            record("https://economictimes.indiatimes.com/1.cms", Some("2025-10-06T16:42:00Z")),
            record("https://economictimes.indiatimes.com/2.cms", Some("sometime soon")),
            record("https://economictimes.indiatimes.com/3.cms", None),
        ];

        let path = batches.write_snapshot("20251006_164205", &records, &normalizer).unwrap();
        assert!(path.ends_with("news_scrape_20251006_164205.csv"));

        let rows = batches.read_snapshot("20251006_164205").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].title, "Sensex rallies, Nifty follows");
        assert_eq!(rows[0].datetime, "6 Oct 2025, 16:42");
        assert_eq!(rows[1].datetime, "sometime soon");
        assert_eq!(rows[2].datetime, "");
        assert_eq!(rows[0].category, "economy");

        let back = rows[0].clone().into_record().unwrap();
        assert_eq!(back.category, Category::Economy);
        assert_eq!(back.image, None);
    }

    #[test]
    fn test_list_find_delete() {
        let dir = tempdir().unwrap();
        let batches = BatchDirectory::new(dir.path());
        let normalizer = TimestampNormalizer::utc();

        batches.write_snapshot("20251005_080000", &[record("https://a.example/1", None)], &normalizer).unwrap();
        batches
            .write_snapshot(
                "20251006_080000",
                &[record("https://a.example/1", None), record("https://a.example/2", None)],
                &normalizer,
            )
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let listed = batches.list_batches().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].batch_id, "20251006_080000");
        assert_eq!(listed[0].article_count, 2);
        assert!(listed[0].size_bytes > 0);

        assert!(batches.find_batch("20251005_080000").unwrap().is_some());
        assert!(batches.find_batch("20200101_000000").unwrap().is_none());

        let info = batches.info().unwrap();
        assert_eq!(info.batch_count, 2);
        assert_eq!(info.latest.as_deref(), Some("20251006_080000"));

        assert!(batches.delete_batch("20251005_080000").unwrap());
        assert!(!batches.delete_batch("20251005_080000").unwrap());
        assert_eq!(batches.list_batches().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let batches = BatchDirectory::new("/tmp/nowhere");
        assert!(batches.path_for("../etc/passwd").is_err());
        assert!(batches.delete_batch("a/b").is_err());
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let dir = tempdir().unwrap();
        let batches = BatchDirectory::new(dir.path().join("absent"));
        assert!(batches.list_batches().unwrap().is_empty());
        assert!(!batches.info().unwrap().exists);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("news_scrape_20251006_000000.csv");
        fs::write(
            &path,
            "title,link,image,source,category,datetime\n\
             Good,https://a.example/1,,Variety,entertainment,\n\
             short row\n\
             Also good,https://a.example/2,,Variety,entertainment,6 Oct 2025\n",
        )
        .unwrap();

        let rows = BatchDirectory::new(dir.path()).read_snapshot("20251006_000000").unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Good", "Also good"]);
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let dir = tempdir().unwrap();
        let resolved = BatchDirectory::resolve(Some(dir.path().to_path_buf()));
        assert_eq!(resolved.root(), dir.path());
    }
}
