use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::filter::FilterData;
use crate::store::{CredentialStore, Row, StoreError, Table};

/// Typed access to one table through a [`CredentialStore`]
pub struct Repository<T> {
    table: Table,
    store: Arc<dyn CredentialStore>,
    _phantom: PhantomData<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(table: Table, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            table,
            store,
            _phantom: PhantomData,
        }
    }

    /// All rows matching `filter_data`, decoded into `T`
    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, StoreError> {
        self.store
            .select(self.table, filter_data)
            .await?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }

    /// First matching row, if any
    ///
    /// # Arguments
    /// * `filter_data` - Where/order clauses; any limit is replaced with 1
    ///
    /// # Returns
    /// * `Result<Option<T>, StoreError>` - Decoded row or `None`
    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<T>, StoreError> {
        let filter_data = FilterData { limit: Some(1), ..filter_data };
        match self.store.select(self.table, filter_data).await?.into_iter().next() {
            Some(row) => Ok(Some(Self::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Like [`Self::select_one`], with a missing row as [`StoreError::NotFound`]
    pub async fn select_404(&self, filter_data: FilterData) -> Result<T, StoreError> {
        self.select_one(filter_data)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{} record not found", self.table)))
    }

    /// Inserts `record`; the returned value carries store defaults (ids, timestamps)
    pub async fn insert(&self, record: &T) -> Result<T, StoreError> {
        let row = self.store.insert(self.table, to_row(record)?).await?;
        Self::from_row(row)
    }

    pub async fn upsert(&self, record: &T) -> Result<T, StoreError> {
        let row = self.store.upsert(self.table, to_row(record)?).await?;
        Self::from_row(row)
    }

    /// Applies `changes` to every row matching `filter`
    ///
    /// # Returns
    /// * `Result<u64, StoreError>` - Number of rows changed; zero is not an error
    pub async fn update_where(&self, filter: Value, changes: Row) -> Result<u64, StoreError> {
        self.store.update(self.table, filter, changes).await
    }

    pub async fn delete_where(&self, filter: Value) -> Result<u64, StoreError> {
        self.store.delete(self.table, filter).await
    }

    fn from_row(row: Row) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(row))?)
    }
}

/// Serialises a record into a row. Records must serialise to JSON objects.
pub fn to_row<T: Serialize>(record: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::QueryError(format!("record serialised to non-object {}", other))),
    }
}
