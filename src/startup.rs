use crate::config::{Config, StoreBackend};
use anyhow::{Context, Result};
use sqlx::PgPool;

pub struct ValidationReport {
    pub environment: bool,
    pub store: bool,
    pub migrations: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.environment && self.store && self.migrations
    }

    pub fn print(&self) {
        println!("\n=== Startup Validation Report ===");
        println!("Environment Variables: {}", status(self.environment));
        println!("Store Connectivity:    {}", status(self.store));
        println!("Migrations Applied:    {}", status(self.migrations));

        if !self.errors.is_empty() {
            println!("\nErrors:");
            for error in &self.errors {
                println!("  - {}", error);
            }
        }

        println!(
            "\nOverall Status: {}",
            if self.is_valid() { "PASS" } else { "FAIL" }
        );
        println!("=================================\n");
    }
}

fn status(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "FAIL"
    }
}

/// Checks the configuration and, for the postgres backend, that the database
/// answers and has been migrated.
pub async fn validate_environment(config: &Config) -> Result<ValidationReport> {
    let mut report = ValidationReport {
        environment: true,
        store: true,
        migrations: true,
        errors: Vec::new(),
    };

    if let Err(e) = validate_env_vars(config) {
        report.environment = false;
        report.errors.push(format!("Environment: {:#}", e));
    }

    if config.store_backend == StoreBackend::Memory {
        return Ok(report);
    }

    let Some(url) = config.database_url.as_deref() else {
        report.store = false;
        report.migrations = false;
        report.errors.push("Store: DATABASE_URL is not set".to_string());
        return Ok(report);
    };

    let pool = match crate::db::create_pool(url, 1).await {
        Ok(pool) => pool,
        Err(e) => {
            report.store = false;
            report.migrations = false;
            report.errors.push(format!("Store: {}", e));
            return Ok(report);
        }
    };

    if let Err(e) = validate_database(&pool).await {
        report.store = false;
        report.errors.push(format!("Store: {:#}", e));
    }

    if let Err(e) = validate_migrations(&pool).await {
        report.migrations = false;
        report.errors.push(format!("Migrations: {:#}", e));
    }

    Ok(report)
}

fn validate_env_vars(config: &Config) -> Result<()> {
    if config.server_port == 0 {
        anyhow::bail!("SERVER_PORT must be greater than 0");
    }
    if config.max_concurrent_processors == 0 {
        anyhow::bail!("MAX_CONCURRENT_PROCESSORS must be greater than 0");
    }
    if config.store_backend == StoreBackend::Postgres {
        if config.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
        }

        let raw = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is empty")?;
        let url = url::Url::parse(raw).context("DATABASE_URL is not a valid URL")?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            anyhow::bail!("DATABASE_URL must use the postgres scheme, got '{}'", url.scheme());
        }
    }

    Ok(())
}

async fn validate_database(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Failed to connect to database")?;

    Ok(())
}

async fn validate_migrations(pool: &PgPool) -> Result<()> {
    let applied = crate::db::applied_migrations(pool)
        .await
        .context("Failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("No migrations applied; run `tx-ingest db migrate`");
    }

    Ok(())
}
