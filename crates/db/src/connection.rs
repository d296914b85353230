use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::debug;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

/// Opens the pool, creating the database file on first use.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    debug!(
        event_name = "db.connect",
        max_connections = max_connections.max(1),
        timeout_secs = timeout_secs.max(1),
        "opening sqlite pool"
    );

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::connect_with_settings;

    #[tokio::test]
    async fn in_memory_pool_answers_queries() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        let value: i64 =
            sqlx::query("SELECT 1 AS one").fetch_one(&pool).await.expect("query").get("one");
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        assert!(connect_with_settings("postgres://nope", 1, 1).await.is_err());
    }
}
