//! LanceDB store wrapper for connection management and table operations.
//!
//! Provides `LanceStore` which wraps a `lancedb::Connection` and offers
//! helper methods for table lifecycle (create, open, drop) using Arrow
//! schemas. Each persona gets an isolated table
//! (`persona_memory_{persona_id}`).

use std::path::PathBuf;
use std::sync::Arc;

use arrow_schema::Schema;
use uuid::Uuid;

/// LanceDB store wrapper for connection and table management.
pub struct LanceStore {
    db: lancedb::Connection,
    base_path: PathBuf,
}

impl LanceStore {
    /// Open or create a LanceDB store at the given path.
    ///
    /// Creates the directory if it does not exist.
    pub async fn new(base_path: PathBuf) -> Result<Self, lancedb::Error> {
        std::fs::create_dir_all(&base_path).map_err(|e| lancedb::Error::CreateDir {
            path: base_path.display().to_string(),
            source: e,
        })?;

        let uri = base_path
            .to_str()
            .ok_or_else(|| lancedb::Error::InvalidInput {
                message: format!("Path contains invalid UTF-8: {}", base_path.display()),
            })?;

        let db = lancedb::connect(uri).execute().await?;

        Ok(Self { db, base_path })
    }

    /// Open or create a store at the default path
    /// (`~/.eidolon/vector_store`).
    pub async fn default() -> Result<Self, lancedb::Error> {
        let base_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".eidolon")
            .join("vector_store");

        Self::new(base_path).await
    }

    /// Ensure a table exists with the given schema.
    ///
    /// If the table already exists, opens it. If not, creates an empty
    /// table with the provided schema.
    pub async fn ensure_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
    ) -> Result<lancedb::Table, lancedb::Error> {
        match self.db.open_table(table_name).execute().await {
            Ok(table) => Ok(table),
            Err(lancedb::Error::TableNotFound { .. }) => {
                self.db
                    .create_empty_table(table_name, schema)
                    .execute()
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Check if a table exists in the database.
    pub async fn table_exists(&self, table_name: &str) -> bool {
        self.db.open_table(table_name).execute().await.is_ok()
    }

    /// Drop a table from the database.
    ///
    /// Returns Ok(()) even if the table does not exist (idempotent).
    pub async fn drop_table(&self, table_name: &str) -> Result<(), lancedb::Error> {
        match self.db.drop_table(table_name, &[]).await {
            Ok(()) => Ok(()),
            Err(lancedb::Error::TableNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// List all table names in the database.
    pub async fn table_names(&self) -> Result<Vec<String>, lancedb::Error> {
        self.db.table_names().execute().await
    }

    /// Get the base path of the store.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Table name for one persona's memory collection.
    pub fn persona_table_name(persona_id: &Uuid) -> String {
        format!("persona_memory_{}", persona_id.simple())
    }
}
