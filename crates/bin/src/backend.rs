//! Backend creation and utility functions.

use std::path::PathBuf;

use roster::{
    Config,
    backend::{
        BackendImpl,
        database::{InMemory, Postgres, Sqlite},
    },
};

use crate::cli::{Backend, BackendConfig};

/// File the in-memory backend persists to inside the data directory.
pub const INMEMORY_FILE: &str = "roster.json";

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

/// Data directory, defaulting to the working directory.
pub fn data_dir(args: &BackendConfig) -> PathBuf {
    args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Path of the in-memory backend's JSON file.
pub fn inmemory_path(args: &BackendConfig) -> PathBuf {
    data_dir(args).join(INMEMORY_FILE)
}

/// Short description of the selected backend for output.
pub fn backend_label(args: &BackendConfig) -> String {
    match args.backend {
        Backend::Sqlite => format!("sqlite ({})", data_dir(args).join("roster.db").display()),
        Backend::Postgres => match &args.postgres_url {
            Some(url) => format!("postgres ({})", redact_postgres_url(url)),
            None => "postgres".to_string(),
        },
        Backend::Inmemory => format!("inmemory ({})", inmemory_path(args).display()),
    }
}

/// Load the configuration file if one was given.
pub async fn load_config(args: &BackendConfig) -> Result<Config, Box<dyn std::error::Error>> {
    match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            Ok(Config::load(path).await?)
        }
        None => Ok(Config::default()),
    }
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    args: &BackendConfig,
) -> Result<Box<dyn BackendImpl>, Box<dyn std::error::Error>> {
    let data_dir = data_dir(args);

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    match args.backend {
        Backend::Sqlite => {
            let db_path = data_dir.join("roster.db");
            tracing::info!("Using SQLite backend at {}", db_path.display());
            Ok(Box::new(Sqlite::open_sqlite(&db_path).await?))
        }
        Backend::Postgres => {
            let url = args
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or ROSTER_POSTGRES_URL")?;

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
            let json_path = data_dir.join(INMEMORY_FILE);
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            // A missing file loads as an empty backend; a corrupt one is an error
            // so it is not silently overwritten on save.
            Ok(Box::new(InMemory::load_from_file(&json_path).await?))
        }
    }
}

/// Write the in-memory backend back to its JSON file. Other backends
/// persist on their own.
pub async fn persist(
    instance: &roster::Instance,
    args: &BackendConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(in_memory) = instance.backend().as_any().downcast_ref::<InMemory>() {
        let path = inmemory_path(args);
        in_memory.save_to_file(&path).await?;
        tracing::debug!("Saved in-memory state to {}", path.display());
    }
    Ok(())
}
