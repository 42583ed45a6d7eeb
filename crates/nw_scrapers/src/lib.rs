pub mod batch;
pub mod cli;
pub mod fetcher;
pub mod logging;
pub mod manager;
pub mod scrapers;

pub use batch::{run_batch, BatchOutcome, BatchState, BatchStatus, StatusBoard};
pub use cli::{handle_command, print_summary, ScrapeContext, ScraperArgs, ScraperCommands};
pub use fetcher::{Fetcher, FetcherConfig, HttpFetcher, Page, PageFetcher};
pub use logging::{init_logging, Logger};
pub use manager::{BoxedScraper, ManagerConfig, RunReport, ScraperManager, SourceOutcome, SourceStatus};
pub use scrapers::{get_scrapers, BlockView, Scraper, SiteRule, SiteScraper, SourceMetadata};

pub mod prelude {
    pub use super::scrapers::Scraper;
    pub use nw_core::{Error, RawArticle, Result};
}
