use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use docsearch_core::config::Config;
use docsearch_core::loader::DocumentLoader;
use docsearch_core::types::SearchRequest;
use docsearch_server::{init_tracing, Services};
use docsearch_sync::ReindexOutcome;

#[derive(Parser)]
#[command(name = "docsearch-admin", about = "Maintenance commands for the document search index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import .txt and .json files from a directory tree
    Import {
        dir: PathBuf,
        /// Only read the first N files
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Bring one document's index record in line with the store
    Reindex { id: String },
    /// Replace the whole index with the store contents
    Rebuild,
    /// Run a search from the command line
    Search {
        query: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        highlight: bool,
    },
    /// Print store and index counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    let services = Services::open(&settings).await?;

    let outcome = run(cli.command, &services, &settings.search).await;
    services.close().await?;
    outcome
}

async fn run(command: Command, services: &Services, search: &docsearch_core::config::SearchSettings) -> Result<()> {
    let service = &services.service;
    match command {
        Command::Import { dir, limit } => {
            let loader = limit.map(DocumentLoader::with_limit).unwrap_or_default();
            let drafts = loader.load_directory(&dir)?;
            println!("Importing {} documents from {}", drafts.len(), dir.display());
            let pb = ProgressBar::new(drafts.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
                    .progress_chars("#>-"),
            );
            let mut failed = 0usize;
            for loaded in drafts {
                if let Err(err) = service.create(loaded.draft).await {
                    failed += 1;
                    pb.println(format!("failed {}: {}", loaded.source.display(), err));
                }
                pb.inc(1);
            }
            pb.finish_with_message("done");
            println!("✅ Import complete ({} failed)", failed);
        }
        Command::Reindex { id } => match service.reindex(&id).await? {
            ReindexOutcome::Indexed => println!("Reindexed {}", id),
            ReindexOutcome::Removed => println!("{} is not in the store; removed its index record", id),
        },
        Command::Rebuild => {
            let pb = ProgressBar::new_spinner();
            pb.set_message("rebuilding index from store");
            pb.enable_steady_tick(std::time::Duration::from_millis(120));
            let count = service.rebuild_index().await?;
            pb.finish_and_clear();
            println!("📊 Rebuilt index with {} documents", count);
        }
        Command::Search { query, category, limit, highlight } => {
            let request = SearchRequest { query, category, limit: search.effective_limit(limit), highlight };
            let results = service.search(request).await?;
            println!("{} hits for '{}'", results.total_hits, results.query);
            for hit in results.hits {
                println!("{:>8.3}  {}  {}", hit.score, hit.id, hit.highlighted_title.as_deref().unwrap_or(&hit.title));
                if let Some(fragment) = hit.highlighted_body {
                    println!("          {}", fragment);
                }
            }
        }
        Command::Stats => {
            println!("documents in store: {}", service.count().await?);
            println!("documents in index: {}", service.indexed_count().await?);
        }
    }
    Ok(())
}
