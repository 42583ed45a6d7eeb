use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use nw_core::{ArticleStorage, Error, NewArticle, RawArticle, Result, TimestampNormalizer};
use serde::Serialize;
use tracing::{info, warn};

use crate::batches::BatchDirectory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl IngestReport {
    fn merge(&mut self, other: IngestReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// Collapse to one record per link. The last occurrence wins and keeps its
/// position, so feeding batches oldest-first lets the newest scrape win.
pub fn dedup_records(records: Vec<RawArticle>) -> Vec<RawArticle> {
    let mut last_seen = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        last_seen.insert(record.link.clone(), index);
    }
    records
        .into_iter()
        .enumerate()
        .filter(|(index, record)| last_seen.get(&record.link) == Some(index))
        .map(|(_, record)| record)
        .collect()
}

pub struct Ingestor {
    storage: Arc<dyn ArticleStorage>,
    normalizer: TimestampNormalizer,
}

impl Ingestor {
    pub fn new(storage: Arc<dyn ArticleStorage>, normalizer: TimestampNormalizer) -> Self {
        Self {
            storage,
            normalizer,
        }
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    /// Validate a raw record and parse its timestamp. An unparsable
    /// timestamp only clears `published_at`.
    pub fn prepare(&self, record: &RawArticle) -> Result<NewArticle> {
        let title = record.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidRecord(format!("empty title for {}", record.link)));
        }
        let link = record.link.trim();
        if !(link.starts_with("http://") || link.starts_with("https://")) {
            return Err(Error::InvalidRecord(format!("link is not absolute: {:?}", link)));
        }

        Ok(NewArticle {
            link: link.to_string(),
            title: title.to_string(),
            source: record.source.trim().to_string(),
            category: record.category,
            image: record
                .image
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            published_at: record
                .published_at_raw
                .as_deref()
                .and_then(|raw| self.normalizer.normalize(raw))
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    /// Dedup then upsert every record. Bad records are counted and skipped;
    /// a storage failure stops the run.
    pub async fn ingest(&self, records: Vec<RawArticle>) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for record in dedup_records(records) {
            let outcome = match self.prepare(&record) {
                Ok(article) => self.storage.upsert_article(&article).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(outcome) if outcome.created => report.created += 1,
                Ok(_) => report.updated += 1,
                Err(e) if e.is_record_level() => {
                    warn!(link = %record.link, error = %e, "skipping record");
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

/// Replays batch snapshots from disk into storage.
pub struct DataLoader {
    directory: BatchDirectory,
    ingestor: Ingestor,
}

impl DataLoader {
    pub fn new(directory: BatchDirectory, ingestor: Ingestor) -> Self {
        Self {
            directory,
            ingestor,
        }
    }

    /// Every snapshot, oldest first, merged and ingested in one pass.
    pub async fn load_all(&self) -> Result<IngestReport> {
        let mut batches = self.directory.list_batches()?;
        batches.reverse();

        let mut report = IngestReport::default();
        let mut records = Vec::new();
        for batch in &batches {
            let rows = self.directory.read_snapshot(&batch.batch_id)?;
            info!(batch_id = %batch.batch_id, rows = rows.len(), "📂 Loading batch");
            for row in rows {
                match row.into_record() {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(batch_id = %batch.batch_id, error = %e, "skipping row");
                        report.failed += 1;
                    }
                }
            }
        }

        report.merge(self.ingestor.ingest(records).await?);
        info!(
            batches = batches.len(),
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "✅ Data load finished"
        );
        Ok(report)
    }

    pub async fn load_batch(&self, batch_id: &str) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut records = Vec::new();
        for row in self.directory.read_snapshot(batch_id)? {
            match row.into_record() {
                Ok(record) => records.push(record),
                Err(_) => report.failed += 1,
            }
        }
        report.merge(self.ingestor.ingest(records).await?);
        Ok(report)
    }
}
