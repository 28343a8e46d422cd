use std::fs;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::configs::schema::SchemaManager;
use crate::configs::settings::Database;
use crate::errors::NodeError;

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(database: Database, schema_manager: SchemaManager) -> Result<Self, NodeError> {
        let in_memory = database.url.contains(":memory:") || database.url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(&database.url)?.create_if_missing(true);
        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // every connection to an in-memory url opens a fresh database
        let max_connections = if in_memory { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Self::create_schema(&pool, &schema_manager, &database).await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_schema(
        pool: &SqlitePool,
        schema: &SchemaManager,
        database: &Database,
    ) -> Result<(), sqlx::Error> {
        let mut statements = Vec::new();

        if database.clean_start {
            statements.extend(schema.dispose_schema());
            tracing::warn!("perform a clean boot: clean and recreate schema");
        }
        statements.extend(schema.create_schema());

        sqlx::query(&statements.join("\n")).execute(pool).await?;

        tracing::debug!(tables = ?schema.table_names(), "database schema ready");

        Ok(())
    }
}
