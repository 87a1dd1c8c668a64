pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod openapi;
pub mod ports;
pub mod services;
pub mod startup;
pub mod utils;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::adapters::{InMemoryTransactionStore, PostgresTransactionStore};
use crate::config::{Config, StoreBackend};
use crate::ports::TransactionStore;
use crate::services::{DeferredProcessor, ExternalCall, IngestionGate, QueryService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub ingestion: Arc<IngestionGate>,
    pub query: Arc<QueryService>,
    pub processor: DeferredProcessor,
    pub start_time: Instant,
    pub log_request_body: bool,
}

impl AppState {
    /// Wires the services around one shared store.
    pub fn new(
        store: Arc<dyn TransactionStore>,
        external: Arc<dyn ExternalCall>,
        max_concurrent_processors: usize,
    ) -> Self {
        let processor = DeferredProcessor::new(store.clone(), external, max_concurrent_processors);

        Self {
            ingestion: Arc::new(IngestionGate::new(store.clone(), processor.clone())),
            query: Arc::new(QueryService::new(store.clone())),
            store,
            processor,
            start_time: Instant::now(),
            log_request_body: false,
        }
    }

    pub fn with_request_body_logging(mut self, enabled: bool) -> Self {
        self.log_request_body = enabled;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route(
            "/v1/webhooks/transactions",
            post(handlers::webhook::receive_transaction),
        )
        .route(
            "/v1/transactions/:transaction_id",
            get(handlers::transactions::get_transaction),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(from_fn_with_state(
            state.log_request_body,
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}

/// Builds the CORS layer. `None` or an empty list allows any origin.
pub fn cors_layer(allowed_origins: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let origins = allowed_origins
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(|origin| {
                    origin
                        .parse::<HeaderValue>()
                        .with_context(|| format!("invalid CORS origin '{}'", origin))
                })
                .collect::<anyhow::Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    if origins.is_empty() {
        Ok(layer.allow_origin(Any))
    } else {
        Ok(layer.allow_origin(AllowOrigin::list(origins)))
    }
}

/// Opens the store selected by `STORE_BACKEND`. The Postgres store is migrated first.
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn TransactionStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; records are lost on restart");
            Ok(Arc::new(InMemoryTransactionStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let pool = db::create_pool(url, config.database_max_connections).await?;
            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations completed");
            Ok(Arc::new(PostgresTransactionStore::new(pool)))
        }
    }
}
