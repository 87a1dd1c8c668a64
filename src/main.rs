use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tx_ingest::cli::{self, Cli, Commands, DbCommands, TxCommands};
use tx_ingest::config::{Config, LogFormat};
use tx_ingest::services::SimulatedExternalCall;
use tx_ingest::{connect_store, cors_layer, create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Tx(TxCommands::Show { transaction_id }) => {
            let store = connect_store(&config).await?;
            cli::handle_tx_show(store.as_ref(), &transaction_id).await
        }
        Commands::Tx(TxCommands::Stuck { older_than_secs }) => {
            let store = connect_store(&config).await?;
            cli::handle_tx_stuck(store.as_ref(), older_than_secs).await
        }
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => cli::handle_config_validate(&config).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let store = connect_store(&config).await?;

    let external = Arc::new(SimulatedExternalCall::new(config.processing_delay));
    tracing::info!(
        delay_ms = config.processing_delay.as_millis() as u64,
        max_concurrent = config.max_concurrent_processors,
        "Deferred processor configured"
    );

    let state = AppState::new(store, external, config.max_concurrent_processors)
        .with_request_body_logging(config.log_request_body);
    let processor = state.processor.clone();

    let app = create_app(state).layer(cors_layer(config.cors_allowed_origins.as_deref())?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let abandoned = processor.in_flight();
    if abandoned > 0 {
        tracing::warn!(
            count = abandoned,
            "Shutting down with transactions still in PROCESSING; they will not be finalized"
        );
    }
    tracing::info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
