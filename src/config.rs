use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub processing_delay: Duration,
    pub max_concurrent_processors: usize,
    pub cors_allowed_origins: Option<String>,
    pub log_format: LogFormat,
    pub log_request_body: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let store_backend: StoreBackend = lookup("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND is postgres");
        }

        Ok(Config {
            server_port: parse_or("SERVER_PORT", &lookup, 8000)?,
            store_backend,
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", &lookup, 10)?,
            processing_delay: Duration::from_millis(parse_or("PROCESSING_DELAY_MS", &lookup, 30_000)?),
            max_concurrent_processors: parse_or("MAX_CONCURRENT_PROCESSORS", &lookup, 1024)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS"),
            log_format: lookup("LOG_FORMAT")
                .unwrap_or_else(|| "pretty".to_string())
                .parse()?,
            log_request_body: parse_or("LOG_REQUEST_BODY", &lookup, false)?,
        })
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_service() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/tx")])).unwrap();

        assert_eq!(config.server_port, 8000);
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.processing_delay, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_processors, 1024);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.log_request_body);
        assert!(config.cors_allowed_origins.is_none());
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).is_err());
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("PROCESSING_DELAY_MS", "250"),
            ("LOG_FORMAT", "json"),
            ("LOG_REQUEST_BODY", "true"),
        ]))
        .unwrap();

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.database_url.is_none());
        assert_eq!(config.processing_delay, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.log_request_body);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("SERVER_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));

        assert!(Config::from_lookup(lookup(&[("STORE_BACKEND", "redis")])).is_err());
    }
}
