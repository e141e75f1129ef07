use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection, OptionalExt};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::VectorRepository;
use crate::domain::{DomainError, VectorMatch, VectorRecord};

/// Local vector store on a DuckDB file. Vectors live in `FLOAT[]` columns and are
/// ranked with `list_cosine_similarity`, so no extension is required.
pub struct DuckdbVectorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbVectorRepository {
    pub fn new(path: &Path) -> Result<Self, DomainError> {
        let conn = Connection::open(path)
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB database: {}", e)))?;
        Self::initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB in-memory DB: {}", e)))?;
        Self::initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), DomainError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vector_collections (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vector_records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                vector FLOAT[] NOT NULL,
                metadata TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            "#,
        )
        .map_err(|e| DomainError::storage(format!("Failed to initialize DuckDB tables: {}", e)))?;
        debug!("DuckDB vector tables ready");
        Ok(())
    }

    /// Vectors are inlined as literals; DuckDB does not bind list parameters.
    fn vector_literal(vector: &[f32]) -> String {
        let values: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
        format!("[{}]::FLOAT[]", values.join(", "))
    }

    fn dimension_of(conn: &Connection, collection: &str) -> Result<Option<usize>, DomainError> {
        let dimension: Option<i64> = conn
            .query_row(
                "SELECT dimension FROM vector_collections WHERE name = ?",
                params![collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DomainError::storage(format!("Failed to read collection {}: {}", collection, e)))?;
        Ok(dimension.map(|d| d as usize))
    }

    fn check_dimension(conn: &Connection, collection: &str, vector: &[f32]) -> Result<(), DomainError> {
        match Self::dimension_of(conn, collection)? {
            Some(expected) if expected != vector.len() => Err(DomainError::invalid_input(format!(
                "Collection {} expects dimension {}, got {}",
                collection,
                expected,
                vector.len()
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorRepository for DuckdbVectorRepository {
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO vector_collections (name, dimension) VALUES (?, ?)",
            params![collection, dimension as i64],
        )
        .map_err(|e| DomainError::storage(format!("Failed to create collection {}: {}", collection, e)))?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<(), DomainError> {
        let metadata = serde_json::to_string(record.metadata())
            .map_err(|e| DomainError::storage(format!("Failed to encode metadata: {}", e)))?;

        let conn = self.conn.lock().await;
        Self::check_dimension(&conn, collection, record.vector())?;

        let sql = format!(
            "INSERT OR REPLACE INTO vector_records (collection, id, vector, metadata) VALUES (?, ?, {}, ?)",
            Self::vector_literal(record.vector())
        );
        conn.execute(&sql, params![collection, record.id(), metadata])
            .map_err(|e| DomainError::storage(format!("Failed to upsert {}: {}", record.id(), e)))?;

        debug!("Upserted {} into DuckDB collection {}", record.id(), collection);
        Ok(())
    }

    async fn upsert_batch(&self, collection: &str, records: Vec<VectorRecord>) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        for record in &records {
            Self::check_dimension(&conn, collection, record.vector())?;
        }
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        for record in &records {
            let metadata = serde_json::to_string(record.metadata())
                .map_err(|e| DomainError::storage(format!("Failed to encode metadata: {}", e)))?;
            let sql = format!(
                "INSERT OR REPLACE INTO vector_records (collection, id, vector, metadata) VALUES (?, ?, {}, ?)",
                Self::vector_literal(record.vector())
            );
            tx.execute(&sql, params![collection, record.id(), metadata])
                .map_err(|e| DomainError::storage(format!("Failed to upsert {}: {}", record.id(), e)))?;
        }

        tx.commit()
            .map_err(|e| DomainError::storage(format!("Failed to commit: {}", e)))?;
        debug!("Upserted {} records into DuckDB collection {}", records.len(), collection);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, DomainError> {
        let conn = self.conn.lock().await;
        Self::check_dimension(&conn, collection, vector)?;

        let sql = format!(
            "SELECT id, metadata, \
                COALESCE(CAST(list_cosine_similarity(vector, {literal}) AS DOUBLE), 0.0) AS score \
             FROM vector_records \
             WHERE collection = ? \
             ORDER BY score DESC, id \
             LIMIT ?",
            literal = Self::vector_literal(vector)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::storage(format!("Failed to prepare search: {}", e)))?;
        let mut rows = stmt
            .query(params![collection, top_k as i64])
            .map_err(|e| DomainError::storage(format!("Failed to run search: {}", e)))?;

        let mut matches = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DomainError::storage(format!("Failed to read id: {}", e)))?;
            let raw: String = row
                .get(1)
                .map_err(|e| DomainError::storage(format!("Failed to read metadata: {}", e)))?;
            let score: f64 = row
                .get(2)
                .map_err(|e| DomainError::storage(format!("Failed to read score: {}", e)))?;

            let metadata: Map<String, Value> = serde_json::from_str(&raw)
                .map_err(|e| DomainError::storage(format!("Corrupt metadata for {}: {}", id, e)))?;
            matches.push(VectorMatch::new(id, score as f32, metadata));
        }
        Ok(matches)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM vector_records WHERE collection = ? AND id = ?",
            params![collection, id],
        )
        .map_err(|e| DomainError::storage(format!("Failed to delete {}: {}", id, e)))?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM vector_records WHERE collection = ?",
                params![collection],
                |row| row.get(0),
            )
            .map_err(|e| DomainError::storage(format!("Failed to count records: {}", e)))?;
        Ok(count as u64)
    }
}
