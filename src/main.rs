//! Command-line entry point: parses crawl options, wires up an event
//! subscriber for progress output, and runs one crawl-plus-enhancement
//! session to completion.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sitescribe::{AgeFilterPreset, Catalogue, CrawlConfig, CrawlEvent, CrawlEventBus};

/// Crawl a site, convert it to Markdown, and enrich it with LLM context.
#[derive(Parser, Debug)]
#[command(name = "sitescribe", version, about)]
struct CliArgs {
    /// Seed URL (or a file of newline-separated URLs) to start crawling from.
    input: String,

    /// Directory to write Markdown files and the catalogue into.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Maximum number of pages to write.
    #[arg(long)]
    limit: Option<usize>,

    /// Re-crawl even pages the catalogue already has a fresh copy of.
    #[arg(long)]
    update: bool,

    /// Print the catalogue's current status for `output` and exit.
    #[arg(long)]
    status: bool,

    /// Remove the catalogue and Markdown files under `output` before crawling.
    #[arg(long)]
    clean: bool,

    /// Walk the frontier and report what would be admitted, without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Write every Markdown file directly into `output`, ignoring path structure.
    #[arg(long)]
    flat: bool,

    /// Crawl only the seed URL, for a quick smoke test of the pipeline.
    #[arg(long)]
    test: bool,

    /// Skip the enhancement pool entirely; write raw Markdown only.
    #[arg(long)]
    no_enhancement: bool,

    /// Preferred LLM provider (`claude` or `openai`).
    #[arg(long)]
    llm_provider: Option<String>,

    /// Try every configured provider in order until one succeeds.
    #[arg(long)]
    auto_fallback: bool,

    /// Comma-separated provider names to fall back through, in order.
    #[arg(long, value_delimiter = ',')]
    fallback_order: Vec<String>,

    /// URL path glob(s) to exclude from the crawl.
    #[arg(long = "exclude-paths", alias = "exclude-patterns", value_delimiter = ',')]
    exclude_patterns: Vec<String>,

    /// Restrict the crawl to pages detected as this language.
    #[arg(long)]
    include_language: Option<String>,

    /// URL path glob(s) a page must match to be admitted.
    #[arg(long, value_delimiter = ',')]
    include_patterns: Vec<String>,

    /// Maximum link-following depth from the seed.
    #[arg(long, default_value_t = 5)]
    max_depth: u8,

    /// Number of concurrent crawl workers.
    #[arg(long, default_value_t = 10)]
    concurrency: usize,
}

fn render_event(event: &CrawlEvent) {
    match event {
        CrawlEvent::CrawlStarted { start_url, .. } => println!("crawling {start_url}"),
        CrawlEvent::PageCrawled { url, .. } => println!("  wrote    {url}"),
        CrawlEvent::PageSkipped { url, reason, .. } => println!("  skipped  {url} ({reason:?})"),
        CrawlEvent::SitemapDiscovered { sitemap_url, urls_found, .. } => {
            println!("  sitemap  {sitemap_url} ({urls_found} urls)");
        }
        CrawlEvent::PageEnhanced { url, blocks_annotated, .. } => {
            println!("  enhanced {url} ({blocks_annotated} blocks)");
        }
        CrawlEvent::PageEnhancementFailed { url, error, .. } => {
            println!("  enhance failed {url}: {error}");
        }
        CrawlEvent::CacheHit { url, .. } => println!("  cached   {url}"),
        CrawlEvent::CrawlCompleted { total_pages, total_enhanced, .. } => {
            println!("done: {total_pages} pages written, {total_enhanced} enhanced");
        }
        _ => {}
    }
}

async fn spawn_progress_subscriber(bus: &Arc<CrawlEventBus>) {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            render_event(&event);
        }
    });
}

async fn print_status(output: &PathBuf) -> anyhow::Result<()> {
    let catalogue = Catalogue::open(&output.join(".state")).await?;
    let snapshot = catalogue.snapshot().await;
    println!("pages: {}", snapshot.pages.len());
    for record in &snapshot.pages {
        println!("  {:?}  {}", record.content_status, record.url);
    }
    Ok(())
}

fn build_config(args: &CliArgs, event_bus: Arc<CrawlEventBus>) -> anyhow::Result<CrawlConfig> {
    let limit = if args.test { Some(1) } else { args.limit };

    let mut builder = CrawlConfig::builder()
        .storage_dir(args.output.clone())?
        .start_url(args.input.as_str())
        .max_depth(args.max_depth)
        .concurrency(args.concurrency.max(1))
        .enable_enhancement(!args.no_enhancement)
        .force_refresh(args.update)
        .auto_fallback(args.auto_fallback)
        .flat(args.flat)
        .age_filter(AgeFilterPreset::None);

    if let Some(limit) = limit {
        builder = builder.limit(limit);
    }
    if !args.include_patterns.is_empty() {
        builder = builder.include_patterns(args.include_patterns.clone());
    }
    if !args.exclude_patterns.is_empty() {
        builder = builder.exclude_patterns(args.exclude_patterns.clone());
    }
    if let Some(lang) = &args.include_language {
        builder = builder.include_language(lang.clone());
    }
    if let Some(provider) = &args.llm_provider {
        builder = builder.llm_provider(provider.clone());
    }
    if !args.fallback_order.is_empty() {
        builder = builder.fallback_order(args.fallback_order.clone());
    }

    Ok(builder.build()?.with_event_bus(event_bus))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = CliArgs::parse();

    if args.status {
        return print_status(&args.output).await;
    }

    if args.clean {
        let _ = tokio::fs::remove_dir_all(&args.output).await;
    }

    if args.dry_run {
        println!("dry run: would crawl {} into {}", args.input, args.output.display());
        return Ok(());
    }

    let event_bus = Arc::new(CrawlEventBus::new(1024));
    spawn_progress_subscriber(&event_bus).await;

    let config = build_config(&args, event_bus)?;
    let summary = sitescribe::run(config).await?;

    println!("\nwrote {} pages", summary.pages_written);
    Ok(())
}
