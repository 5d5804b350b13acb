//! Stockroom command-line entry point.
//!
//! `serve` runs the HTTP API, `migrate` applies or reports schema
//! migrations and `seed` loads the reference catalogue.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use stockroom::config::{AppConfig, DEFAULT_CONFIG_PATH};
use stockroom::http::server;
use stockroom::migration::{startup_migrations, MigrationLockGuard, Migrator};
use stockroom::{Catalog, DbPool, MemoryCatalog, PgCatalog};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(about = "Catalogue service for products, categories and suppliers")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Database connection URL (`memory://` for the in-process store)
    #[arg(long)]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Listen address, e.g. 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Apply pending migrations
    Migrate {
        /// Only show applied and pending migrations
        #[arg(long)]
        status: bool,
    },

    /// Load the reference catalogue
    Seed,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(&config)
        }
        Commands::Migrate { status } => migrate(&config, status),
        Commands::Seed => seed(&config),
    }
}

/// Builds the catalogue over the configured store, migrating first when
/// PostgreSQL is used and `migrate_on_startup` is set.
fn open_catalog(config: &AppConfig) -> Result<Catalog> {
    if config.database.is_memory() {
        log::warn!("using the in-memory store; data is lost on exit");
        return Ok(Catalog::new(
            Arc::new(MemoryCatalog::new()),
            config.validation.clone(),
        ));
    }

    let pool = Arc::new(DbPool::connect(&config.database).context("connecting to PostgreSQL")?);
    if config.database.migrate_on_startup {
        let primary = pool
            .primary()
            .ok_or_else(|| anyhow!("connection pool is empty"))?;
        startup_migrations(primary, config.database.migration_lock_timeout_seconds)?;
    }
    Ok(Catalog::new(
        Arc::new(PgCatalog::new(pool)),
        config.validation.clone(),
    ))
}

fn serve(config: &AppConfig) -> Result<()> {
    server::configure_runtime(&config.server);
    let catalog = open_catalog(config)?;
    let handle = server::start(catalog, &config.server.bind)
        .with_context(|| format!("binding {}", config.server.bind))?;
    println!(
        "{} stockroom listening on http://{}",
        "▶".green(),
        config.server.bind
    );
    handle
        .join()
        .map_err(|e| anyhow!("server stopped unexpectedly: {:?}", e))
}

fn migrate(config: &AppConfig, status_only: bool) -> Result<()> {
    if config.database.is_memory() {
        bail!("migrations need a PostgreSQL database_url");
    }
    let pool = DbPool::connect(&stockroom::config::DatabaseConfig {
        max_connections: 1,
        ..config.database.clone()
    })
    .context("connecting to PostgreSQL")?;
    let executor = pool
        .primary()
        .ok_or_else(|| anyhow!("connection pool is empty"))?;
    let migrator = Migrator::default();

    if status_only {
        let status = migrator.status(executor)?;
        for record in &status.applied {
            println!(
                "  {} m{}_{} ({})",
                "✓".green(),
                record.version,
                record.name,
                record.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        for pending in &status.pending {
            println!("  {} m{}_{} (pending)", "…".yellow(), pending.version, pending.name);
        }
        println!(
            "{} applied, {} pending",
            status.applied.len(),
            status.pending.len()
        );
        if let Some(version) = status.latest_applied_version() {
            println!("schema at version {version}");
        }
        return Ok(());
    }

    let lock = MigrationLockGuard::acquire(executor, config.database.migration_lock_timeout_seconds)?;
    let applied = migrator.up_with_lock(lock.executor())?;
    println!("{} applied {} migration(s)", "✓".green(), applied);
    Ok(())
}

fn seed(config: &AppConfig) -> Result<()> {
    let catalog = open_catalog(config)?;
    let report = stockroom::seed::seed(&catalog)?;
    println!(
        "{} seeded: {} created, {} skipped",
        "✓".green(),
        report.created,
        report.skipped
    );
    Ok(())
}
