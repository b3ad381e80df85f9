pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod repository;
pub mod table;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::{FilterData, FilterError};

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::Repository;
pub use table::Table;

/// One stored row as a JSON object keyed by column name
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated on {table}")]
    Conflict { table: String },

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Row encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// A write executed as part of an atomic [`CredentialStore::apply`] batch
#[derive(Debug, Clone)]
pub enum Mutation {
    Insert { table: Table, row: Row },
    Update { table: Table, filter: Value, changes: Row },
    Delete { table: Table, filter: Value },
}

/// Query interface to the relational datastore.
///
/// Filters use the JSON where-clause language of [`crate::filter`]. Columns
/// holding JSON `null` are skipped on insert and update so the store's
/// defaults apply.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Rows of `table` matching the filter
    ///
    /// # Arguments
    /// * `table` - Relation to read
    /// * `filter` - Where clause, ordering, projection and limit/offset
    ///
    /// # Returns
    /// * `Result<Vec<Row>, StoreError>` - Matching rows, possibly projected
    async fn select(&self, table: Table, filter: FilterData) -> Result<Vec<Row>, StoreError>;

    /// Inserts one row and returns it as stored, defaults included
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError>;

    /// Updates every row matching `filter`, returning how many changed
    async fn update(&self, table: Table, filter: Value, changes: Row) -> Result<u64, StoreError>;

    /// Inserts or replaces the row sharing the table's conflict key
    async fn upsert(&self, table: Table, row: Row) -> Result<Row, StoreError>;

    /// Deletes every row matching `filter`. Deleting nothing is not an error.
    async fn delete(&self, table: Table, filter: Value) -> Result<u64, StoreError>;

    /// Runs the mutations in order; either all take effect or none do
    ///
    /// PostgreSQL runs the batch in one transaction. The in-memory store
    /// applies it to a copy and swaps the copy in on success.
    ///
    /// # Returns
    /// * `Err(StoreError::Conflict)` - A unique column collided; nothing was applied
    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), StoreError>;

    /// Liveness check behind `/health`
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Canonical text form of a timestamp inside filters and in-memory rows
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drops `null` columns so store defaults apply
pub(crate) fn without_nulls(row: Row) -> Row {
    row.into_iter().filter(|(_, v)| !v.is_null()).collect()
}
