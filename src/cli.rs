use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};

use crate::config::{Config, StoreBackend};
use crate::domain::transaction::timestamp;
use crate::domain::Transaction;
use crate::ports::TransactionStore;

const STUCK_LIST_LIMIT: i64 = 500;

#[derive(Parser, Debug)]
#[command(name = "tx-ingest")]
#[command(about = "Idempotent transaction webhook ingestion service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction inspection commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Validate configuration and store connectivity
    Config,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum TxCommands {
    /// Print a transaction as JSON
    Show {
        #[arg(value_name = "TRANSACTION_ID")]
        transaction_id: String,
    },

    /// List transactions still PROCESSING after the given age
    Stuck {
        #[arg(long, default_value_t = 300)]
        older_than_secs: u64,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx_show(store: &dyn TransactionStore, transaction_id: &str) -> anyhow::Result<()> {
    let tx = store.find(transaction_id).await?;
    println!("{}", serde_json::to_string_pretty(&tx)?);
    Ok(())
}

/// PROCESSING records created more than `older_than_secs` ago, oldest first.
pub async fn stuck_transactions(
    store: &dyn TransactionStore,
    older_than_secs: u64,
) -> anyhow::Result<Vec<Transaction>> {
    let age = ChronoDuration::seconds(i64::try_from(older_than_secs)?);
    Ok(store.list_stuck(Utc::now() - age, STUCK_LIST_LIMIT).await?)
}

pub async fn handle_tx_stuck(store: &dyn TransactionStore, older_than_secs: u64) -> anyhow::Result<()> {
    let stuck = stuck_transactions(store, older_than_secs).await?;

    if stuck.is_empty() {
        println!("No transactions stuck in PROCESSING for more than {}s", older_than_secs);
        return Ok(());
    }

    tracing::warn!(count = stuck.len(), "Transactions stuck in PROCESSING");
    println!("{:<40} {:<22} {:>16} {:<8}", "Transaction", "Created", "Amount", "Currency");
    println!("{}", "-".repeat(90));
    for tx in &stuck {
        println!(
            "{:<40} {:<22} {:>16} {:<8}",
            tx.transaction_id,
            timestamp::format(&tx.created_at),
            tx.amount.to_string(),
            tx.currency
        );
    }

    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let Some(url) = config.database_url.as_deref() else {
        anyhow::bail!("DATABASE_URL must be set to run migrations");
    };

    let pool = crate::db::create_pool(url, 1).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("Database migrations completed");

    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Store Backend: {:?}", config.store_backend);
    if config.store_backend == StoreBackend::Postgres {
        println!(
            "  Database URL: {}",
            config.database_url.as_deref().map(mask_password).unwrap_or_default()
        );
        println!("  Max Connections: {}", config.database_max_connections);
    }
    println!("  Processing Delay: {}ms", config.processing_delay.as_millis());
    println!("  Max Concurrent Processors: {}", config.max_concurrent_processors);

    let report = crate::startup::validate_environment(config).await?;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }

    tracing::info!("Configuration is valid");
    Ok(())
}

fn mask_password(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            // set_password only fails for cannot-be-a-base URLs, which carry no password
            let _ = url.set_password(Some("****"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}
