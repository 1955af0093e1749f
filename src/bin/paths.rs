use anyhow::{Context, Result};
use clap::Parser;
use kgflat::paths::analyze_paths;
use kgflat::{export, Config};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "paths")]
#[command(about = "Find multi-hop paths between a subject and object over flattened rows")]
struct Args {
    /// Path to a flattened rows JSON file
    input: PathBuf,

    /// Result-subject name selecting the row subset
    #[arg(short, long)]
    subject: String,

    /// Query object name
    #[arg(short, long)]
    object: String,

    /// Override the configured path cap
    #[arg(long)]
    max_paths: Option<usize>,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;
    let max_paths = args.max_paths.unwrap_or(config.paths.max_paths).max(1);

    let rows_text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let rows = export::rows_from_json(&rows_text)?;

    // Restrict to the selected result-subject's rows
    let subset: Vec<_> = rows
        .into_iter()
        .filter(|r| r.result_subject_name == args.subject)
        .collect();
    if subset.is_empty() {
        anyhow::bail!(
            "No rows with result subject \"{}\" in {}",
            args.subject,
            args.input.display()
        );
    }

    let start = Instant::now();
    let analysis = analyze_paths(&subset, &args.subject, &args.object, max_paths);
    let duration = start.elapsed();

    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║ KGFlat Path Analysis                                     ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!("\n{} -> {}\n", analysis.subject, analysis.object);

    if analysis.paths.is_empty() {
        println!("No paths found within 4 hops.");
    } else {
        for (index, path) in analysis.paths.iter().enumerate() {
            println!("─── Path #{} ({} hops) ───", index + 1, path.hop_count());
            for step in &path.steps {
                let mut evidence = format!("{} publications", step.publications.len());
                if !step.clinical_trials.is_empty() {
                    evidence.push_str(&format!(", {} trials", step.clinical_trials.len()));
                }
                println!(
                    "  {} [{}] {}  ({}; {})",
                    step.from, step.predicate, step.to, step.source, evidence
                );
            }
            println!();
        }

        println!("─── Node participation ───");
        let total = analysis.paths.len();
        for entry in &analysis.participation {
            let share = entry.count as f64 / total as f64 * 100.0;
            let marker = if entry.is_bottleneck { " ⚠ bottleneck" } else { "" };
            println!(
                "  {}: {}/{} paths ({:.0}%){}",
                entry.node, entry.count, total, share, marker
            );
        }
    }

    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║ Statistics                                               ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!("Rows in subset: {}", subset.len());
    println!("Paths: {}", analysis.paths.len());
    println!("Latency: {:?}", duration);
    if analysis.truncated {
        println!("\n⚠️  Warning: search stopped at the {} path cap; results are truncated", max_paths);
    }

    Ok(())
}
