use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgRow, PgConnection, PgPool, Row as _};
use tracing::debug;

use crate::filter::{FilterData, SqlResult};
use crate::store::manager::DatabaseManager;
use crate::store::query_builder::{bind_param_query, QueryBuilder};
use crate::store::{without_nulls, CredentialStore, Mutation, Row, StoreError, Table};

/// [`CredentialStore`] backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_rows(conn: &mut PgConnection, table: Table, sql: &SqlResult) -> Result<Vec<Row>, StoreError> {
        debug!(%table, query = %sql.query, "fetch");
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param_query(query, param);
        }
        let rows = query.fetch_all(conn).await.map_err(|e| Self::map_err(table, e))?;
        rows.iter().map(Self::decode_row).collect()
    }

    async fn execute(conn: &mut PgConnection, table: Table, sql: &SqlResult) -> Result<u64, StoreError> {
        debug!(%table, query = %sql.query, "execute");
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param_query(query, param);
        }
        let result = query.execute(conn).await.map_err(|e| Self::map_err(table, e))?;
        Ok(result.rows_affected())
    }

    async fn apply_one(conn: &mut PgConnection, mutation: &Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::Insert { table, row } => {
                let sql = QueryBuilder::new(*table).insert(&without_nulls(row.clone()))?;
                Self::fetch_rows(conn, *table, &sql).await?;
            }
            Mutation::Update { table, filter, changes } => {
                let sql = QueryBuilder::new(*table).update(filter, &without_nulls(changes.clone()))?;
                Self::execute(conn, *table, &sql).await?;
            }
            Mutation::Delete { table, filter } => {
                let sql = QueryBuilder::new(*table).delete(filter)?;
                Self::execute(conn, *table, &sql).await?;
            }
        }
        Ok(())
    }

    fn decode_row(row: &PgRow) -> Result<Row, StoreError> {
        match row.try_get::<Value, _>("row")? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::QueryError(format!("expected a JSON object row, got {}", other))),
        }
    }

    fn single(table: Table, mut rows: Vec<Row>) -> Result<Row, StoreError> {
        rows.pop()
            .ok_or_else(|| StoreError::QueryError(format!("{} write returned no row", table)))
    }

    fn map_err(table: Table, err: sqlx::Error) -> StoreError {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict {
                table: table.to_string(),
            },
            other => StoreError::Sqlx(other),
        }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn select(&self, table: Table, filter: FilterData) -> Result<Vec<Row>, StoreError> {
        let sql = QueryBuilder::new(table).select(filter)?;
        let mut conn = self.pool.acquire().await?;
        Self::fetch_rows(&mut conn, table, &sql).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        let sql = QueryBuilder::new(table).insert(&without_nulls(row))?;
        let mut conn = self.pool.acquire().await?;
        let rows = Self::fetch_rows(&mut conn, table, &sql).await?;
        Self::single(table, rows)
    }

    async fn update(&self, table: Table, filter: Value, changes: Row) -> Result<u64, StoreError> {
        let sql = QueryBuilder::new(table).update(&filter, &without_nulls(changes))?;
        let mut conn = self.pool.acquire().await?;
        Self::execute(&mut conn, table, &sql).await
    }

    async fn upsert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        let sql = QueryBuilder::new(table).upsert(&without_nulls(row))?;
        let mut conn = self.pool.acquire().await?;
        let rows = Self::fetch_rows(&mut conn, table, &sql).await?;
        Self::single(table, rows)
    }

    async fn delete(&self, table: Table, filter: Value) -> Result<u64, StoreError> {
        let sql = QueryBuilder::new(table).delete(&filter)?;
        let mut conn = self.pool.acquire().await?;
        Self::execute(&mut conn, table, &sql).await
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for mutation in &mutations {
            // Dropping the transaction on error rolls it back
            Self::apply_one(&mut *tx, mutation).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
