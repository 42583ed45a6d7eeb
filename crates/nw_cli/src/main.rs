use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use nw_core::{publication_label, ArticleStorage, CanonicalArticle, Category, Headline, ProgressObserver, TimestampNormalizer};
use nw_inference::{Config as InferenceConfig, DummyModel, NewsAssistant};
use nw_scrapers::{
    get_scrapers, handle_command, init_logging, BatchOutcome, FetcherConfig, ManagerConfig, PageFetcher,
    ScrapeContext, ScraperArgs, ScraperManager,
};
use nw_storage::{create_storage, BatchDirectory, DataLoader, IngestReport, Ingestor, StorageKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod duration;

use duration::HumanDuration;

const HEALTH_CHECK_ATTEMPTS: u32 = 3;
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrape, store and summarize news from a dozen sites", long_about = None)]
pub struct Cli {
    /// Directory holding batch snapshots
    #[arg(long, env = "NEWSWIRE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "memory", global = true)]
    storage: StorageKind,
    /// SQLite database file (sqlite storage only)
    #[arg(long, env = "NEWSWIRE_DATABASE", global = true)]
    database: Option<PathBuf>,
    /// Egress proxy for every page fetch
    #[arg(long, env = "NEWSWIRE_PROXY", global = true)]
    proxy: Option<String>,
    /// Offset applied to timestamps that carry no zone of their own
    #[arg(long, env = "NEWSWIRE_UTC_OFFSET", default_value = "+00:00", global = true)]
    utc_offset: String,
    #[arg(long, default_value_t = nw_scrapers::manager::DEFAULT_CONCURRENCY, global = true)]
    concurrency: usize,
    #[arg(long, default_value_t = nw_scrapers::fetcher::DEFAULT_ATTEMPTS, global = true)]
    attempts: u32,
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    /// OpenAI-compatible endpoint for the chat model
    #[arg(long, env = "NEWSWIRE_MODEL_URL", global = true)]
    model_url: Option<String>,
    #[arg(long, default_value = nw_inference::DEFAULT_MODEL, global = true)]
    model: String,
    /// Answer LLM commands with the offline dummy model
    #[arg(long, global = true)]
    offline: bool,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run extractors and snapshot the results as a batch
    Scrape {
        #[command(flatten)]
        scraper: ScraperArgs,
        /// Ingest each saved batch into storage right away
        #[arg(long)]
        ingest: bool,
        /// Repeat every interval until interrupted (e.g. 1h, 30m, 1h15m)
        #[arg(long)]
        interval: Option<HumanDuration>,
        /// Cancel a batch that runs longer than this
        #[arg(long)]
        timeout: Option<HumanDuration>,
    },
    /// Load batch snapshots into storage, newest scrape winning per link
    Ingest {
        /// Only this batch id
        #[arg(long)]
        batch: Option<String>,
    },
    /// Inspect or delete batch snapshots
    Batches {
        #[command(subcommand)]
        command: BatchCommands,
    },
    /// Stored articles, newest first
    Articles {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Summarize one stored article
    Summarize { link: String },
    /// Five stored headlines picked for a set of interests
    Recommend {
        /// Comma separated, e.g. "cricket, markets"
        #[arg(long, value_delimiter = ',')]
        interests: Vec<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Trends across recent headlines
    Insights {
        #[arg(long, default_value_t = 30)]
        limit: usize,
    },
    /// Overall tone of recent headlines
    Sentiment {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete every stored article
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum BatchCommands {
    List {
        #[arg(long)]
        json: bool,
    },
    Show {
        batch_id: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Delete { batch_id: String },
    Info,
}

/// Logs each finished source as the batch progresses.
struct ConsoleProgress {
    total: usize,
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, stage: &str, articles: usize, sources_done: usize) {
        info!("[{}/{}] {} ({} articles so far)", sources_done, self.total, stage, articles);
    }
}

async fn check_storage(storage: &Arc<dyn ArticleStorage>, kind: StorageKind) -> nw_core::Result<()> {
    let mut last_error = None;
    for attempt in 1..=HEALTH_CHECK_ATTEMPTS {
        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, storage.count()).await {
            Ok(Ok(count)) => {
                info!("🏦 Storage backend ready (using {:?}, {} articles)", kind, count);
                return Ok(());
            }
            Ok(Err(e)) => last_error = Some(e),
            Err(elapsed) => {
                last_error = Some(nw_core::Error::Storage(format!("Storage health check timed out: {}", elapsed)))
            }
        }
        if attempt < HEALTH_CHECK_ATTEMPTS {
            info!("Storage health check failed, retrying {}/{}...", attempt, HEALTH_CHECK_ATTEMPTS);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
    Err(last_error.unwrap_or_else(|| nw_core::Error::Storage(kind.error_message().to_string())))
}

async fn open_storage(cli: &Cli) -> anyhow::Result<Arc<dyn ArticleStorage>> {
    let storage = create_storage(cli.storage, cli.database.as_deref())
        .await
        .with_context(|| cli.storage.error_message())?;
    check_storage(&storage, cli.storage).await?;
    Ok(storage)
}

/// Read commands against the in-memory store see the snapshots on disk.
async fn open_readable_storage(
    cli: &Cli,
    directory: &BatchDirectory,
    normalizer: TimestampNormalizer,
) -> anyhow::Result<Arc<dyn ArticleStorage>> {
    let storage = open_storage(cli).await?;
    if cli.storage == StorageKind::Memory {
        let loader = DataLoader::new(directory.clone(), Ingestor::new(storage.clone(), normalizer));
        let report = loader.load_all().await?;
        info!("📂 Loaded {} articles from {}", report.created, directory.root().display());
    }
    Ok(storage)
}

fn assistant(cli: &Cli) -> NewsAssistant {
    if cli.offline {
        return NewsAssistant::new(Arc::new(DummyModel::new()));
    }
    let mut config = InferenceConfig {
        api_key: cli.api_key.clone(),
        model_name: cli.model.clone(),
        ..InferenceConfig::default()
    };
    if let Some(url) = &cli.model_url {
        config = config.with_base_url(url.clone());
    }
    NewsAssistant::from_config(&config)
}

async fn recent_headlines(storage: &Arc<dyn ArticleStorage>, limit: usize) -> anyhow::Result<Vec<Headline>> {
    let articles = storage.recent(limit).await?;
    if articles.is_empty() {
        warn!("No stored articles; run `newswire ingest` first");
    }
    Ok(articles.iter().map(CanonicalArticle::headline).collect())
}

fn print_report(report: &IngestReport) {
    println!(
        "✅ {} created, {} updated, {} failed",
        report.created, report.updated, report.failed
    );
}

fn print_articles(articles: &[CanonicalArticle]) {
    let now = Utc::now();
    for article in articles {
        println!("• {} [{} / {}]", article.title, article.source, article.category.label());
        println!("  {} · {}", publication_label(article, now), article.link);
    }
}

/// Fires `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
}

/// Child of `parent` that also fires after `timeout`.
fn batch_token(parent: &CancellationToken, timeout: Option<HumanDuration>) -> CancellationToken {
    let token = parent.child_token();
    if let Some(HumanDuration(limit)) = timeout {
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    warn!("Batch timed out after {}", HumanDuration(limit));
                    timer.cancel();
                }
            }
        });
    }
    token
}

async fn scrape(
    cli: &Cli,
    args: &ScraperArgs,
    directory: &BatchDirectory,
    normalizer: TimestampNormalizer,
    ingest: bool,
    interval: Option<HumanDuration>,
    timeout: Option<HumanDuration>,
) -> anyhow::Result<()> {
    let fetcher_config = FetcherConfig {
        attempts: cli.attempts,
        proxy: cli.proxy.clone(),
        ..FetcherConfig::default()
    };
    let fetcher = Arc::new(PageFetcher::new(&fetcher_config)?);
    let scrapers = get_scrapers(fetcher, normalizer);
    let total = scrapers.len();
    let manager = ScraperManager::new(
        scrapers,
        ManagerConfig {
            concurrency: cli.concurrency,
        },
    )
    .with_observer(Arc::new(ConsoleProgress { total }));

    let names: Vec<&str> = manager.scrapers().iter().map(|s| s.source_metadata().name).collect();
    info!("🦗 Scrapers initialized: {}", names.join(", "));

    let storage = if ingest { Some(open_storage(cli).await?) } else { None };
    let root = CancellationToken::new();
    cancel_on_ctrl_c(root.clone());

    loop {
        let ctx = ScrapeContext {
            manager: &manager,
            directory,
            normalizer,
            cancel: batch_token(&root, timeout),
        };

        match handle_command(args, &ctx).await {
            Ok(Some(BatchOutcome::Completed { batch_id, .. })) => {
                if let Some(storage) = &storage {
                    let loader = DataLoader::new(directory.clone(), Ingestor::new(storage.clone(), normalizer));
                    print_report(&loader.load_batch(&batch_id).await?);
                }
            }
            Ok(_) => {}
            // Only a periodic run survives a failed cycle.
            Err(e) if interval.is_some() => error!("Error during scrape: {}", e),
            Err(e) => return Err(e.into()),
        }

        let Some(HumanDuration(every)) = interval else {
            break;
        };
        if root.is_cancelled() {
            break;
        }
        info!("Waiting {} before next scrape", HumanDuration(every));
        tokio::select! {
            _ = root.cancelled() => break,
            _ = tokio::time::sleep(every) => {}
        }
    }
    Ok(())
}

async fn batches(command: &BatchCommands, directory: &BatchDirectory, normalizer: TimestampNormalizer) -> anyhow::Result<()> {
    match command {
        BatchCommands::List { json } => {
            let batches = directory.list_batches()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&batches)?);
                return Ok(());
            }
            if batches.is_empty() {
                println!("No batches in {}", directory.root().display());
            }
            for batch in batches {
                println!(
                    "{}  {:>5} articles  {:>8} bytes  {}",
                    batch.batch_id,
                    batch.article_count,
                    batch.size_bytes,
                    batch.modified.format("%-d %b %Y, %H:%M")
                );
            }
        }
        BatchCommands::Show { batch_id, limit } => {
            let Some(info) = directory.find_batch(batch_id)? else {
                bail!("No batch {}", batch_id);
            };
            println!("{} ({} articles)", info.file_name, info.article_count);
            for row in directory.read_snapshot(batch_id)?.into_iter().take(*limit) {
                let when = if row.datetime.is_empty() {
                    String::new()
                } else {
                    normalizer.display(&row.datetime)
                };
                println!("• {} [{} / {}] {}", row.title, row.source, row.category, when);
                println!("  {}", row.link);
            }
        }
        BatchCommands::Delete { batch_id } => {
            if directory.delete_batch(batch_id)? {
                println!("🗑️ Deleted batch {}", batch_id);
            } else {
                bail!("No batch {}", batch_id);
            }
        }
        BatchCommands::Info => {
            let info = directory.info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let normalizer = TimestampNormalizer::from_offset_str(&cli.utc_offset)
        .ok_or_else(|| anyhow!("Invalid UTC offset {:?}, expected e.g. +05:30", cli.utc_offset))?;
    let directory = BatchDirectory::resolve(cli.data_dir.clone());

    match &cli.command {
        Commands::Scrape {
            scraper,
            ingest,
            interval,
            timeout,
        } => scrape(&cli, scraper, &directory, normalizer, *ingest, *interval, *timeout).await?,
        Commands::Ingest { batch } => {
            let storage = open_storage(&cli).await?;
            let loader = DataLoader::new(directory.clone(), Ingestor::new(storage, normalizer));
            let report = match batch {
                Some(batch_id) => loader.load_batch(batch_id).await?,
                None => loader.load_all().await?,
            };
            print_report(&report);
        }
        Commands::Batches { command } => batches(command, &directory, normalizer).await?,
        Commands::Articles {
            category,
            source,
            limit,
        } => {
            let storage = open_readable_storage(&cli, &directory, normalizer).await?;
            let mut articles = match (category, source) {
                (Some(category), _) => storage.get_by_category(*category).await?,
                (None, Some(source)) => storage.get_by_source(source).await?,
                (None, None) => storage.recent(*limit).await?,
            };
            if let (Some(_), Some(source)) = (category, source) {
                articles.retain(|a| &a.source == source);
            }
            articles.sort_by(nw_core::storage::newest_first);
            articles.truncate(*limit);
            print_articles(&articles);
        }
        Commands::Summarize { link } => {
            let storage = open_readable_storage(&cli, &directory, normalizer).await?;
            let article = storage
                .get_by_link(link)
                .await?
                .ok_or_else(|| anyhow!("No stored article for {}", link))?;
            let context = format!("{} ({}, {})", article.title, article.source, article.category.label());
            println!("{}", assistant(&cli).summarize(&article.title, &context).await);
        }
        Commands::Recommend { interests, limit } => {
            let storage = open_readable_storage(&cli, &directory, normalizer).await?;
            let headlines = recent_headlines(&storage, *limit).await?;
            let interests: Vec<String> = interests
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect();
            for (rank, headline) in assistant(&cli).recommend(&interests, &headlines).await.iter().enumerate() {
                println!("{}. {} ({})", rank + 1, headline.title, headline.source);
            }
        }
        Commands::Insights { limit } => {
            let storage = open_readable_storage(&cli, &directory, normalizer).await?;
            let headlines = recent_headlines(&storage, *limit).await?;
            println!("{}", assistant(&cli).insights(&headlines).await?);
        }
        Commands::Sentiment { limit } => {
            let storage = open_readable_storage(&cli, &directory, normalizer).await?;
            let headlines = recent_headlines(&storage, *limit).await?;
            println!("{}", assistant(&cli).sentiment(&headlines).await);
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("Refusing to clear storage without --yes");
            }
            let storage = open_storage(&cli).await?;
            let removed = storage.clear().await?;
            println!("🧹 Removed {} articles", removed);
        }
    }

    Ok(())
}
