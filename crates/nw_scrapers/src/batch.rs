use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use nw_core::{ProgressObserver, Result, TimestampNormalizer};
use nw_storage::BatchDirectory;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::logging::Logger;
use crate::manager::{RunReport, ScraperManager};

pub const NO_ARTICLES: &str = "No articles were scraped";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Starting,
    Scraping,
    Saving,
    Completed,
    Failed,
    Cancelled,
}

/// Live view of a running batch, as shown to whoever is watching it.
#[derive(Debug, Clone, Serialize)]
pub struct BatchStatus {
    pub batch_id: String,
    pub state: BatchState,
    pub current_stage: String,
    pub articles_scraped: usize,
    pub sources_completed: usize,
    pub total_sources: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub file: Option<PathBuf>,
    pub error: Option<String>,
}

/// Ready-made [`ProgressObserver`] that keeps the latest [`BatchStatus`].
#[derive(Debug)]
pub struct StatusBoard {
    status: Mutex<BatchStatus>,
}

impl StatusBoard {
    pub fn new(batch_id: &str, total_sources: usize) -> Self {
        Self {
            status: Mutex::new(BatchStatus {
                batch_id: batch_id.to_string(),
                state: BatchState::Starting,
                current_stage: "Initializing scraper...".to_string(),
                articles_scraped: 0,
                sources_completed: 0,
                total_sources,
                started_at: Utc::now(),
                finished_at: None,
                file: None,
                error: None,
            }),
        }
    }

    pub fn snapshot(&self) -> BatchStatus {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BatchStatus> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_stage(&self, state: BatchState, stage: &str) {
        let mut status = self.lock();
        status.state = state;
        status.current_stage = stage.to_string();
    }

    pub fn finish(&self, outcome: &BatchOutcome) {
        let mut status = self.lock();
        status.finished_at = Some(Utc::now());
        match outcome {
            BatchOutcome::Completed { path, report, .. } => {
                status.state = BatchState::Completed;
                status.current_stage = format!("Completed! Scraped {} articles", report.records.len());
                status.file = Some(path.clone());
            }
            BatchOutcome::Failed { reason, .. } => {
                status.state = BatchState::Failed;
                status.current_stage = reason.clone();
                status.error = Some(reason.clone());
            }
            BatchOutcome::Cancelled { .. } => {
                status.state = BatchState::Cancelled;
                status.current_stage = "Cancelled".to_string();
            }
        }
    }
}

impl ProgressObserver for StatusBoard {
    fn on_progress(&self, stage: &str, articles: usize, sources_done: usize) {
        let mut status = self.lock();
        if status.state == BatchState::Starting {
            status.state = BatchState::Scraping;
        }
        status.current_stage = stage.to_string();
        status.articles_scraped = articles;
        status.sources_completed = sources_done;
    }
}

#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Completed {
        batch_id: String,
        path: PathBuf,
        report: RunReport,
    },
    Failed {
        batch_id: String,
        reason: String,
        report: RunReport,
    },
    Cancelled {
        batch_id: String,
        report: RunReport,
    },
}

impl BatchOutcome {
    pub fn batch_id(&self) -> &str {
        match self {
            BatchOutcome::Completed { batch_id, .. }
            | BatchOutcome::Failed { batch_id, .. }
            | BatchOutcome::Cancelled { batch_id, .. } => batch_id,
        }
    }

    pub fn report(&self) -> &RunReport {
        match self {
            BatchOutcome::Completed { report, .. }
            | BatchOutcome::Failed { report, .. }
            | BatchOutcome::Cancelled { report, .. } => report,
        }
    }
}

/// One full batch: run every selected extractor, then snapshot the records.
///
/// A run that yields nothing is `Failed`; a cancelled run writes no snapshot.
pub async fn run_batch(
    manager: &ScraperManager,
    directory: &BatchDirectory,
    normalizer: &TimestampNormalizer,
    batch_id: &str,
    cancel: &CancellationToken,
) -> Result<BatchOutcome> {
    let logger = Logger::new().with_new_prefixes(format!("[batch {}]", batch_id));
    logger.info(&format!("Starting with {} sources", manager.scrapers().len()));

    let report = manager.run_all(cancel).await;

    if cancel.is_cancelled() {
        logger.warn(&format!(
            "Cancelled after {} articles; nothing saved",
            report.records.len()
        ));
        return Ok(BatchOutcome::Cancelled {
            batch_id: batch_id.to_string(),
            report,
        });
    }

    if report.records.is_empty() {
        logger.error(NO_ARTICLES);
        return Ok(BatchOutcome::Failed {
            batch_id: batch_id.to_string(),
            reason: NO_ARTICLES.to_string(),
            report,
        });
    }

    let done = report.outcomes.len();
    manager
        .observer()
        .on_progress("Saving data to CSV...", report.records.len(), done);

    let path = directory.write_snapshot(batch_id, &report.records, normalizer)?;
    logger.info(&format!(
        "Completed! Scraped {} articles into {}",
        report.records.len(),
        path.display()
    ));

    Ok(BatchOutcome::Completed {
        batch_id: batch_id.to_string(),
        path,
        report,
    })
}
