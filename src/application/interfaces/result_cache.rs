use async_trait::async_trait;

use crate::domain::Row;

/// Shared cache of source rows, keyed by connector and strategy.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<Row>>;

    async fn put(&self, key: &str, rows: Vec<Row>);
}
