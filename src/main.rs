use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comet_scraper::cache::{CacheConfig, OptionalCache};
use comet_scraper::config::{Config, StoreBackend};
use comet_scraper::driver::NullDriverFactory;
use comet_scraper::engine::SessionEngine;
use comet_scraper::selectors::SelectorSchema;
use comet_scraper::server::ApiServer;
use comet_scraper::store::{MemoryStore, PostgresStore, SessionStore};

#[derive(Parser)]
#[command(
    name = "comet-scraper",
    version,
    about = "Browser-driven profile scrape sessions with REST retrieval",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Bind host (overrides COMET_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides COMET_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Selector schema file (overrides COMET_SCHEMA_PATH)
        #[arg(long)]
        schema: Option<String>,

        /// Use the in-memory session store
        #[arg(long, default_value = "false")]
        memory_store: bool,
    },

    /// Load and validate a selector schema file, then exit
    CheckSchema {
        /// Selector schema file
        schema: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            schema,
            memory_store,
        } => {
            serve(host, port, schema, memory_store).await?;
        }

        Commands::CheckSchema { schema } => {
            let loaded = SelectorSchema::from_path(&schema)
                .with_context(|| format!("failed to load selector schema from {schema}"))?;
            println!("schema ok: start page {}", loaded.urls.start_page);
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("comet_scraper=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("comet_scraper=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn serve(
    host: Option<String>,
    port: Option<u16>,
    schema_path: Option<String>,
    memory_store: bool,
) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(path) = schema_path {
        config.scraper.schema_path = path.into();
    }
    if memory_store {
        config.database.backend = StoreBackend::Memory;
    }
    config.validate()?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.database.backend,
        budget_secs = config.scraper.time_budget_secs,
        "comet-scraper starting"
    );

    let schema = SelectorSchema::from_path(&config.scraper.schema_path).with_context(|| {
        format!(
            "failed to load selector schema from {}",
            config.scraper.schema_path.display()
        )
    })?;

    let store: Arc<dyn SessionStore> = match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory session store, records are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => Arc::new(
            PostgresStore::connect(&config.database.url, config.database.pool_size)
                .await
                .map_err(|e| anyhow::anyhow!("failed to connect to PostgreSQL: {e}"))?,
        ),
    };

    let cache = Arc::new(OptionalCache::from_config(&CacheConfig::from_env()).await);

    let shutdown = CancellationToken::new();
    let engine = Arc::new(SessionEngine::new(
        store,
        cache,
        Arc::new(schema),
        // TODO: wire a WebDriver-backed factory once the chromium sidecar
        // deployment lands
        Arc::new(NullDriverFactory),
        config.time_budget(),
        shutdown.clone(),
    ));

    let server = ApiServer::new(config.server.clone(), engine);

    let signal_token = shutdown.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        tracing::info!("shutdown signal received");
        signal_token.cancel();
    };

    server.start_with_shutdown(shutdown_signal).await?;

    // The token is cancelled by the signal handler; cancel again here so a
    // server error also releases the watchdogs.
    shutdown.cancel();
    Ok(())
}
