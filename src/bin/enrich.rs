use anyhow::{Context, Result};
use clap::Parser;
use kgflat::cache::AbstractCache;
use kgflat::pubmed::{enrich_rows, PubMedClient};
use kgflat::{export, Config};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "enrich")]
#[command(about = "Attach PubMed abstract metadata to flattened rows")]
struct Args {
    /// Path to a flattened rows JSON file
    input: PathBuf,

    /// Output file (enriched rows go to stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep only the N most recent abstracts per row
    #[arg(long)]
    top_recent: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;

    let rows_text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut rows = export::rows_from_json(&rows_text)?;

    // Wrap in an LRU cache if cache_capacity > 0 (rows often share PMIDs)
    let cache = if config.pubmed.cache_capacity > 0 {
        Some(Arc::new(AbstractCache::new(config.pubmed.cache_capacity)))
    } else {
        None
    };
    let client = PubMedClient::new_with_cache(&config.pubmed, config.pubmed_api_key(), cache);

    log::info!("Enriching {} rows", rows.len());
    let start = Instant::now();
    let summary = enrich_rows(&client, &mut rows, args.top_recent).await;
    let duration = start.elapsed();

    let rendered = export::rows_to_json(&rows)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!("\n╔══════════════════════════════════════════════════════════╗");
            println!("║ KGFlat Enrichment Summary                                ║");
            println!("╚══════════════════════════════════════════════════════════╝");
            println!("Rows processed: {}", summary.rows_processed);
            println!("Rows enriched: {}", summary.rows_enriched);
            println!("Rows failed: {}", summary.rows_failed);
            println!("Abstracts attached: {}", summary.abstracts_attached);
            println!("Latency: {:?}", duration);
            println!("Wrote {}", path.display());
        }
        None => {
            print!("{}", rendered);
            log::info!(
                "Enriched {}/{} rows ({} abstracts) in {:?}",
                summary.rows_enriched,
                summary.rows_processed,
                summary.abstracts_attached,
                duration
            );
        }
    }

    if summary.rows_failed > 0 {
        log::warn!(
            "{} rows failed abstract lookup and carry zero abstracts",
            summary.rows_failed
        );
    }

    Ok(())
}
