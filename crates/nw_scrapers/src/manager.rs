use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use nw_core::{Category, Error, NoProgress, ProgressObserver, RawArticle, Result, RunStats};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::logging::Logger;
use crate::scrapers::{Scraper, SourceMetadata};

pub type BoxedScraper = Arc<dyn Scraper>;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Upper bound on extractors running at once
    pub concurrency: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Succeeded,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: SourceMetadata,
    pub articles: usize,
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Concatenated in extractor registration order
    pub records: Vec<RawArticle>,
    /// One per extractor, registration order
    pub outcomes: Vec<SourceOutcome>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, SourceStatus::Failed(_)))
    }

    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == SourceStatus::Cancelled)
    }
}

pub struct ScraperManager {
    scrapers: Vec<BoxedScraper>,
    config: ManagerConfig,
    observer: Arc<dyn ProgressObserver>,
    logger: Logger,
}

impl ScraperManager {
    pub fn new(scrapers: Vec<BoxedScraper>, config: ManagerConfig) -> Self {
        Self {
            scrapers,
            config,
            observer: Arc::new(NoProgress),
            logger: Logger::new().with_prefix("[manager]".to_string()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn add_scraper(&mut self, scraper: BoxedScraper) {
        self.scrapers.push(scraper);
    }

    pub fn scrapers(&self) -> &[BoxedScraper] {
        &self.scrapers
    }

    pub fn observer(&self) -> &Arc<dyn ProgressObserver> {
        &self.observer
    }

    /// Narrow the registry to the extractors matching `selector`.
    ///
    /// Accepts a category (`sports`), a source key (`variety-film`), or
    /// `category/key`.
    pub fn scrapers_for(&self, selector: &str) -> Result<Vec<BoxedScraper>> {
        let (category, key) = parse_source(selector)?;
        let selected: Vec<_> = self
            .scrapers
            .iter()
            .filter(|s| {
                let meta = s.source_metadata();
                match (&category, &key) {
                    (Some(c), Some(k)) => meta.category == *c && meta.key == k,
                    (Some(c), None) => meta.category == *c,
                    (None, Some(k)) => meta.key == k,
                    (None, None) => false,
                }
            })
            .cloned()
            .collect();

        if selected.is_empty() {
            return Err(Error::Config(format!("No scraper matches {:?}", selector)));
        }
        Ok(selected)
    }

    /// A manager over the extractors matching `selector`, sharing this one's
    /// config and observer.
    pub fn subset(&self, selector: &str) -> Result<ScraperManager> {
        Ok(Self {
            scrapers: self.scrapers_for(selector)?,
            config: self.config.clone(),
            observer: self.observer.clone(),
            logger: self.logger.clone(),
        })
    }

    /// Registered sources grouped by category.
    pub fn list_scrapers(&self) -> BTreeMap<Category, Vec<SourceMetadata>> {
        let mut grouped: BTreeMap<Category, Vec<SourceMetadata>> = BTreeMap::new();
        for scraper in &self.scrapers {
            let meta = scraper.source_metadata();
            grouped.entry(meta.category).or_default().push(meta);
        }
        grouped
    }

    pub async fn run_all(&self, cancel: &CancellationToken) -> RunReport {
        self.run(self.scrapers.clone(), cancel).await
    }

    /// Run `scrapers` with bounded concurrency. A failing or panicking
    /// extractor only loses its own records; cancellation keeps whatever
    /// finished before it.
    pub async fn run(&self, scrapers: Vec<BoxedScraper>, cancel: &CancellationToken) -> RunReport {
        let total = scrapers.len();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::with_capacity(total);

        self.logger
            .info(&format!("🚀 Starting news aggregation from {} sources", total));

        for (index, scraper) in scrapers.iter().enumerate() {
            let scraper = scraper.clone();
            let semaphore = semaphore.clone();
            let handle = tasks.spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => AssertUnwindSafe(scraper.extract())
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            Err(Error::extractor(scraper.source_metadata().name, panic_message(panic)))
                        }),
                    Err(e) => Err(Error::External(e.into())),
                };
                (index, result)
            });
            task_index.insert(handle.id(), index);
        }

        let mut batches: Vec<Option<Vec<RawArticle>>> = vec![None; total];
        let mut statuses: Vec<Option<SourceStatus>> = vec![None; total];
        let mut articles = 0;
        let mut done = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    self.logger.warn(&format!("Cancelled with {}/{} sources done", done, total));
                    break;
                }
                joined = tasks.join_next() => {
                    let (index, result) = match joined {
                        None => break,
                        Some(Ok(finished)) => finished,
                        Some(Err(e)) => match task_index.get(&e.id()) {
                            Some(&index) => {
                                let name = scrapers[index].source_metadata().name;
                                (index, Err(Error::extractor(name, format!("task failed: {}", e))))
                            }
                            None => {
                                self.logger.error(&format!("Extractor task lost: {}", e));
                                continue;
                            }
                        },
                    };
                    let meta = scrapers[index].source_metadata();
                    let logger = self
                        .logger
                        .clone()
                        .with_prefix(format!("[{}/{}]", meta.name, meta.category));
                    done += 1;
                    let stage = match result {
                        Ok(records) => {
                            articles += records.len();
                            let stage = format!("Completed {} ({} articles)", meta.name, records.len());
                            logger.info(&format!("✅ {}", stage));
                            batches[index] = Some(records);
                            statuses[index] = Some(SourceStatus::Succeeded);
                            stage
                        }
                        Err(e) => {
                            let stage = format!("Error scraping {}: {}", meta.name, e);
                            logger.error(&format!("❌ {}", stage));
                            statuses[index] = Some(SourceStatus::Failed(e.to_string()));
                            stage
                        }
                    };
                    self.observer.on_progress(&stage, articles, done);
                }
            }
        }

        let outcomes = scrapers
            .iter()
            .zip(statuses)
            .zip(batches.iter())
            .map(|((scraper, status), batch)| SourceOutcome {
                source: scraper.source_metadata(),
                articles: batch.as_ref().map_or(0, Vec::len),
                status: status.unwrap_or(SourceStatus::Cancelled),
            })
            .collect();

        let records: Vec<RawArticle> = batches.into_iter().flatten().flatten().collect();
        let stats = RunStats::from_records(&records);
        self.logger.info(&format!(
            "📊 {} articles from {} sources",
            stats.total,
            stats.by_source.len()
        ));

        RunReport {
            records,
            outcomes,
            stats,
        }
    }
}

fn parse_source(source: &str) -> Result<(Option<Category>, Option<String>)> {
    let parts: Vec<&str> = source.trim().split('/').collect();
    match parts.as_slice() {
        [single] => match single.parse::<Category>() {
            Ok(category) => Ok((Some(category), None)),
            Err(_) => Ok((None, Some(single.to_ascii_lowercase()))),
        },
        [category, key] => {
            let category = category
                .parse::<Category>()
                .map_err(|_| Error::Config(format!("Unknown category in {:?}", source)))?;
            Ok((Some(category), Some(key.to_ascii_lowercase())))
        }
        _ => Err(Error::Config(format!("Invalid source format: {}", source))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeScraper {
        meta: SourceMetadata,
        records: usize,
        fail: bool,
        delay: Duration,
    }

    impl FakeScraper {
        fn boxed(key: &'static str, records: usize) -> BoxedScraper {
            Arc::new(Self {
                meta: SourceMetadata {
                    name: key,
                    key,
                    category: Category::Technology,
                    url: "https://fake.example",
                },
                records,
                fail: false,
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl Scraper for FakeScraper {
        fn source_metadata(&self) -> SourceMetadata {
            self.meta
        }

        async fn extract(&self) -> Result<Vec<RawArticle>> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(Error::extractor(self.meta.name, "layout changed"));
            }
            Ok((0..self.records)
                .map(|i| RawArticle {
                    title: format!("{} #{}", self.meta.name, i),
                    link: format!("https://fake.example/{}/{}", self.meta.key, i),
                    image: None,
                    source: self.meta.name.to_string(),
                    category: self.meta.category,
                    published_at_raw: None,
                })
                .collect())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Scraper for Panicking {
        fn source_metadata(&self) -> SourceMetadata {
            SourceMetadata {
                name: "Panicky",
                key: "panicky",
                category: Category::Sports,
                url: "https://panic.example",
            }
        }

        async fn extract(&self) -> Result<Vec<RawArticle>> {
            panic!("boom")
        }
    }

    /// Panics in `extract`, then once more while the task reports that
    /// panic, so the task itself dies.
    struct DoublePanic {
        armed: AtomicBool,
    }

    #[async_trait]
    impl Scraper for DoublePanic {
        fn source_metadata(&self) -> SourceMetadata {
            if self.armed.swap(false, Ordering::SeqCst) {
                panic!("metadata unavailable");
            }
            SourceMetadata {
                name: "Fragile",
                key: "fragile",
                category: Category::Lifestyle,
                url: "https://fragile.example",
            }
        }

        async fn extract(&self) -> Result<Vec<RawArticle>> {
            panic!("boom")
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, usize, usize)>>);

    impl ProgressObserver for Recorder {
        fn on_progress(&self, stage: &str, articles: usize, sources_done: usize) {
            self.0
                .lock()
                .unwrap()
                .push((stage.to_string(), articles, sources_done));
        }
    }

    #[tokio::test]
    async fn test_one_failing_extractor_does_not_sink_the_run() {
        let keys = [
            "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k",
        ];
        let mut scrapers: Vec<BoxedScraper> = keys.into_iter().map(|k| FakeScraper::boxed(k, 2)).collect();
        scrapers.insert(
            3,
            Arc::new(FakeScraper {
                meta: SourceMetadata {
                    name: "Broken",
                    key: "broken",
                    category: Category::Economy,
                    url: "https://broken.example",
                },
                records: 5,
                fail: true,
                delay: Duration::ZERO,
            }),
        );

        let recorder = Arc::new(Recorder::default());
        let manager = ScraperManager::new(scrapers, ManagerConfig::default()).with_observer(recorder.clone());
        let report = manager.run_all(&CancellationToken::new()).await;

        assert_eq!(report.records.len(), 22);
        assert_eq!(report.stats.by_source.len(), 11);
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.failed().next().unwrap().source.key, "broken");
        assert!(!report.was_cancelled());

        // registration order survives completion order
        assert_eq!(report.records[0].source, "a");
        assert_eq!(report.records[21].source, "k");

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 12);
        let done: Vec<usize> = events.iter().map(|e| e.2).collect();
        assert_eq!(done, (1..=12).collect::<Vec<_>>());
        assert!(events.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(events.iter().any(|e| e.0.starts_with("Error scraping Broken")));
    }

    #[tokio::test]
    async fn test_panicking_extractor_is_isolated() {
        let manager = ScraperManager::new(
            vec![FakeScraper::boxed("ok", 3), Arc::new(Panicking)],
            ManagerConfig { concurrency: 1 },
        );
        let report = manager.run_all(&CancellationToken::new()).await;

        assert_eq!(report.records.len(), 3);
        match &report.outcomes[1].status {
            SourceStatus::Failed(message) => assert!(message.contains("boom")),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dead_task_counts_as_failed_source() {
        let recorder = Arc::new(Recorder::default());
        let fragile: BoxedScraper = Arc::new(DoublePanic {
            armed: AtomicBool::new(true),
        });
        let manager = ScraperManager::new(vec![FakeScraper::boxed("ok", 2), fragile], ManagerConfig::default())
            .with_observer(recorder.clone());
        let report = manager.run_all(&CancellationToken::new()).await;

        assert_eq!(report.records.len(), 2);
        assert!(matches!(report.outcomes[1].status, SourceStatus::Failed(_)));
        assert!(!report.was_cancelled());

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events.iter().map(|e| e.2).max(), Some(2));
        assert!(events.iter().any(|e| e.0.starts_with("Error scraping Fragile")));
    }

    #[tokio::test]
    async fn test_cancellation_keeps_completed_sources() {
        let slow: BoxedScraper = Arc::new(FakeScraper {
            meta: SourceMetadata {
                name: "Slow",
                key: "slow",
                category: Category::Politics,
                url: "https://slow.example",
            },
            records: 4,
            fail: false,
            delay: Duration::from_secs(30),
        });
        let manager = ScraperManager::new(vec![FakeScraper::boxed("fast", 2), slow], ManagerConfig::default());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let report = manager.run_all(&cancel).await;
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.outcomes[0].status, SourceStatus::Succeeded);
        assert_eq!(report.outcomes[1].status, SourceStatus::Cancelled);
        assert!(report.was_cancelled());
    }

    #[tokio::test]
    async fn test_empty_registry_yields_empty_report() {
        let manager = ScraperManager::new(Vec::new(), ManagerConfig::default());
        let report = manager.run_all(&CancellationToken::new()).await;
        assert!(report.records.is_empty());
        assert!(report.outcomes.is_empty());
        assert_eq!(report.stats.total, 0);
    }

    #[test]
    fn test_select_by_category_and_key() {
        let fetcher = crate::fetcher::testing::page_fetcher(Default::default());
        let scrapers = crate::scrapers::get_scrapers(fetcher, nw_core::TimestampNormalizer::utc());
        let manager = ScraperManager::new(scrapers, ManagerConfig::default());

        assert_eq!(manager.scrapers_for("sports").unwrap().len(), 2);
        assert_eq!(manager.scrapers_for("variety-film").unwrap().len(), 1);
        assert_eq!(manager.scrapers_for("entertainment/variety-film").unwrap().len(), 1);
        assert!(manager.scrapers_for("weather").is_err());
        assert!(manager.scrapers_for("sports/variety-film").is_err());
        assert!(manager.scrapers_for("a/b/c").is_err());

        let subset = manager.subset("technology").unwrap();
        assert_eq!(subset.scrapers().len(), 2);

        let listed = manager.list_scrapers();
        assert_eq!(listed.len(), 6);
        assert_eq!(listed[&Category::Technology][0].name, "TechCrunch");
    }
}
