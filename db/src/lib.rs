pub mod models;
pub mod test_utils;

use common::config;
use sea_orm::{Database, DatabaseConnection, DbErr};
use std::path::Path;

/// Opens a fresh connection to the configured database.
///
/// Accepts either a full DSN or a bare SQLite file path in `DATABASE_PATH`.
/// Every caller owns the connection it gets back; the transcript worker in
/// particular opens one of these per calculation and closes it itself.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let path_or_url = config::database_path();
    // If it's already a DSN, use it as-is; otherwise treat it as a SQLite file path.
    let url = if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        path_or_url
    } else {
        // Ensure parent directory exists (SQLite won't create intermediate dirs).
        if let Some(parent) = Path::new(&path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    log::debug!("opening database connection to {url}");
    Database::connect(&url).await
}
