use anyhow::{Context, Result};
use clap::Parser;
use kgflat::{export, flatten, Config};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "flatten")]
#[command(about = "Flatten a knowledge-graph response into analyzable rows")]
struct Args {
    /// Path to the raw response JSON file
    input: PathBuf,

    /// Primary key identifying the query
    #[arg(short, long)]
    pk: String,

    /// Environment tag (defaults to the configured value)
    #[arg(short, long)]
    environment: Option<String>,

    /// Output format: csv or json
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// Output file (rows go to stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;
    let environment = args
        .environment
        .unwrap_or_else(|| config.kgflat.environment.clone());

    let raw_text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let raw: serde_json::Value =
        serde_json::from_str(&raw_text).context("Input is not valid JSON")?;

    let start = Instant::now();
    let output = flatten::flatten(&raw, &args.pk, &environment)?;
    let duration = start.elapsed();

    let rendered = match args.format.as_str() {
        "csv" => export::rows_to_csv(&output.rows),
        "json" => export::rows_to_json(&output.rows)?,
        other => anyhow::bail!("Unsupported format: {} (use csv or json)", other),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!("\n╔══════════════════════════════════════════════════════════╗");
            println!("║ KGFlat Flattening Summary                                ║");
            println!("╚══════════════════════════════════════════════════════════╝");
            println!("PK: {}  (environment: {})", output.metadata.pk, output.metadata.environment);
            println!("Results: {}", output.metadata.result_count);
            println!(
                "Rows: {} ({} primary, {} support)",
                output.metadata.row_count,
                output.metadata.primary_row_count,
                output.metadata.support_row_count
            );
            println!("Unresolved references: {}", output.metadata.unresolved_refs);
            println!("Latency: {:?}", duration);
            println!("Wrote {} ({})", path.display(), args.format);
        }
        None => {
            print!("{}", rendered);
            log::info!(
                "Flattened {} rows ({} primary, {} support) in {:?}",
                output.metadata.row_count,
                output.metadata.primary_row_count,
                output.metadata.support_row_count,
                duration
            );
        }
    }

    if output.metadata.unresolved_refs > 0 {
        log::warn!(
            "{} edge/auxiliary-graph references could not be resolved; see warnings above",
            output.metadata.unresolved_refs
        );
    }

    Ok(())
}
