use anyhow::Result;
use kgflat::server::ApiServer;
use kgflat::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => {
            // HTTP API mode (flatten/paths endpoints)
            run_server().await?;
        }
        "verify" | _ => {
            // Default: verify configuration
            run_verify()?;
        }
    }

    Ok(())
}

/// Run the HTTP API server
async fn run_server() -> Result<()> {
    log::info!("Starting KGFlat HTTP server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let port = config.http_server.port;
    if !config.http_server.enabled {
        log::warn!("http_server.enabled is false in config; serving anyway because `serve` was requested");
    }

    let server = ApiServer::new(config);
    server.run(port).await?;

    Ok(())
}

/// Verify and report the effective configuration
fn run_verify() -> Result<()> {
    log::info!("Starting KGFlat v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Environment tag: {}", config.kgflat.environment);
    log::info!("PubMed endpoint: {}", config.pubmed.base_url);
    log::info!(
        "PubMed batching: {} ids per request, {}ms min interval, {} retries",
        config.pubmed.batch_size,
        config.pubmed.min_interval_ms,
        config.pubmed.max_retries
    );
    match config.pubmed_api_key() {
        Some(_) => log::info!("✓ NCBI API key present ({})", config.pubmed.api_key_env),
        None => log::warn!(
            "No NCBI API key in {} (the lower keyless rate ceiling applies)",
            config.pubmed.api_key_env
        ),
    }
    log::info!("Path cap: {} paths per analysis", config.paths.max_paths);
    log::info!("✓ Configuration verified");

    Ok(())
}
