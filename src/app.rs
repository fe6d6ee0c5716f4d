use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::CsvImportUseCase;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::sqlite::connect_pool;
use crate::infrastructure::db::SqliteImportSink;
use crate::interfaces::http::{start_server, HttpState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()?;
    let pool = connect_pool(&config.database.url, config.database.max_connections).await?;

    let sink = SqliteImportSink::new(pool, config.import.table.clone())?;
    sink.ensure_table(&config.import.projection.targets()).await?;

    let import = CsvImportUseCase::new(config.import.clone(), Arc::new(sink))?;
    let (host, port) = config.bind_address();
    info!(table = %config.import.table, "Batch upload service starting");

    start_server(HttpState::new(import), &host, port)
        .map_err(|e| AppError::IoError(format!("Failed to bind {}:{}: {}", host, port, e)))?
        .await
        .map_err(|e| AppError::IoError(format!("HTTP server stopped: {}", e)))
}
