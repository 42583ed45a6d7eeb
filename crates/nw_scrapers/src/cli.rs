use chrono::Utc;
use clap::{Args, Subcommand};
use nw_core::{Result, TimestampNormalizer};
use nw_storage::BatchDirectory;
use tokio_util::sync::CancellationToken;

use crate::batch::{run_batch, BatchOutcome};
use crate::manager::{RunReport, ScraperManager, SourceStatus};

#[derive(Args, Clone, Debug)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ScraperCommands {
    /// Scrape every source, or only those matching a category or source key
    Run {
        /// A category (e.g. sports), a source key (e.g. variety-film) or category/key
        source: Option<String>,
        /// Print the results without writing a batch snapshot
        #[arg(long)]
        no_save: bool,
    },
    /// List available scrapers
    List,
}

/// What a scrape command needs from the surrounding program.
pub struct ScrapeContext<'a> {
    pub manager: &'a ScraperManager,
    pub directory: &'a BatchDirectory,
    pub normalizer: TimestampNormalizer,
    pub cancel: CancellationToken,
}

/// Returns the batch outcome when a snapshot run happened.
pub async fn handle_command(args: &ScraperArgs, ctx: &ScrapeContext<'_>) -> Result<Option<BatchOutcome>> {
    match &args.command {
        ScraperCommands::Run { source, no_save } => {
            let narrowed;
            let manager = match source {
                Some(selector) => {
                    narrowed = ctx.manager.subset(selector)?;
                    &narrowed
                }
                None => ctx.manager,
            };

            if *no_save {
                let report = manager.run_all(&ctx.cancel).await;
                print_summary(&report);
                return Ok(None);
            }

            let batch_id = BatchDirectory::new_batch_id(Utc::now());
            let outcome = run_batch(manager, ctx.directory, &ctx.normalizer, &batch_id, &ctx.cancel).await?;
            print_summary(outcome.report());
            match &outcome {
                BatchOutcome::Completed { path, .. } => println!("💾 Saved {}", path.display()),
                BatchOutcome::Failed { reason, .. } => eprintln!("❌ {}", reason),
                BatchOutcome::Cancelled { .. } => eprintln!("⏹️ Batch {} cancelled", batch_id),
            }
            Ok(Some(outcome))
        }
        ScraperCommands::List => {
            for (category, sources) in ctx.manager.list_scrapers() {
                println!("{}:", category.label());
                for meta in sources {
                    println!("  - {} ({}/{}) {}", meta.name, category, meta.key, meta.url);
                }
            }
            Ok(None)
        }
    }
}

pub fn print_summary(report: &RunReport) {
    println!("\n📊 SCRAPING SUMMARY");
    println!("Total articles: {}", report.stats.total);

    println!("\nBy category:");
    for (category, count) in &report.stats.by_category {
        println!("  {:<14} {}", category.label(), count);
    }

    println!("\nBy source:");
    for outcome in &report.outcomes {
        let status = match &outcome.status {
            SourceStatus::Succeeded => "✅".to_string(),
            SourceStatus::Failed(message) => format!("❌ {}", message),
            SourceStatus::Cancelled => "⏹️ cancelled".to_string(),
        };
        println!(
            "  {:<16} {:<14} {:>4} {}",
            outcome.source.name,
            outcome.source.category.label(),
            outcome.articles,
            status
        );
    }
}
