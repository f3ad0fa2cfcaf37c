use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;

/// In-memory database for single-connection tests.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// File-backed database for tests where a second, independently opened
/// connection must see the same data (the transcript worker opens its own).
///
/// Points the global config's `database_path` at the temp file so
/// `db::connect()` lands on it. Keep the returned `TempDir` alive for the
/// duration of the test.
pub async fn setup_shared_test_db() -> (DatabaseConnection, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("test.sqlite");
    let path = path.to_str().expect("temp path is not UTF-8").to_string();

    // Seed the env var first so a cold AppConfig can initialize, then
    // override the live singleton for tests that already touched it.
    unsafe {
        std::env::set_var("DATABASE_PATH", &path);
    }
    common::config::AppConfig::set_database_path(&path);

    let db = Database::connect(format!("sqlite://{path}?mode=rwc"))
        .await
        .expect("Failed to connect to file db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    (db, dir)
}
