//! Backend creation and utility functions.

use std::path::{Path, PathBuf};

use weavestore::{
    Storage,
    backend::{
        BackendImpl,
        database::{InMemory, Postgres, Sqlite},
    },
};

use crate::cli::{Backend, BackendConfig};

const SQLITE_FILE: &str = "weavestore.db";
const JSON_FILE: &str = "weavestore.json";

/// Redact credentials from a PostgreSQL connection URL for safe logging
pub fn redact_postgres_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut redacted = parsed.clone();
        if !parsed.username().is_empty() {
            let _ = redacted.set_username("***");
        }
        if parsed.password().is_some() {
            let _ = redacted.set_password(Some("***"));
        }
        redacted.to_string()
    } else {
        "postgres://***@<unparsable-url>".to_string()
    }
}

fn data_dir(config: &BackendConfig) -> PathBuf {
    config.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Path of the JSON file backing the in-memory backend.
pub fn json_path(config: &BackendConfig) -> PathBuf {
    data_dir(config).join(JSON_FILE)
}

/// Human-readable description of the configured backend
pub fn backend_label(config: &BackendConfig) -> String {
    match config.backend {
        Backend::Sqlite => format!("sqlite ({})", data_dir(config).join(SQLITE_FILE).display()),
        Backend::Postgres => match &config.postgres_url {
            Some(url) => format!("postgres ({})", redact_postgres_url(url)),
            None => "postgres".to_string(),
        },
        Backend::Inmemory => format!("inmemory ({})", json_path(config).display()),
    }
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    config: &BackendConfig,
) -> Result<Box<dyn BackendImpl>, Box<dyn std::error::Error>> {
    let data_dir = data_dir(config);

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    match config.backend {
        Backend::Sqlite => {
            let db_path = data_dir.join(SQLITE_FILE);
            tracing::info!("Using SQLite backend at {}", db_path.display());
            Ok(Box::new(Sqlite::open_sqlite(&db_path).await?))
        }
        Backend::Postgres => {
            let url = config
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or WEAVESTORE_POSTGRES_URL")?;

            let display_url = redact_postgres_url(url);
            tracing::info!("Connecting to PostgreSQL backend at {}", display_url);

            match Postgres::connect_postgres(url).await {
                Ok(backend) => {
                    tracing::info!("Connected to PostgreSQL successfully");
                    Ok(Box::new(backend))
                }
                Err(e) => {
                    Err(format!("Failed to connect to PostgreSQL at {}: {}", display_url, e).into())
                }
            }
        }
        Backend::Inmemory => {
            let json_path = data_dir.join(JSON_FILE);
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            // A missing file loads as an empty backend; anything else is a real error
            let backend = InMemory::load_from_file(&json_path).await?;
            Ok(Box::new(backend))
        }
    }
}

/// Open storage over the configured backend.
pub async fn open_storage(config: &BackendConfig) -> Result<Storage, Box<dyn std::error::Error>> {
    Ok(Storage::open(create_backend(config).await?))
}

/// Write the in-memory backend back to its file. Other backends are durable already.
pub async fn persist(storage: &Storage, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(in_memory) = storage.backend().as_any().downcast_ref::<InMemory>() {
        in_memory.save_to_file(path).await?;
        tracing::info!("Database saved to {}", path.display());
    }
    Ok(())
}
