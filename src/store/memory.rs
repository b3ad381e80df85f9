use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::filter::filter_order::FilterOrder;
use crate::filter::{FilterData, FilterMatch};
use crate::store::{timestamp, without_nulls, CredentialStore, Mutation, Row, StoreError, Table};

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: HashMap<Table, Vec<Row>>,
    sequences: HashMap<Table, i64>,
}

impl Tables {
    fn rows(&self, table: Table) -> &[Row] {
        self.rows.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Row> {
        self.rows.entry(table).or_default()
    }

    fn select(&self, table: Table, filter: &FilterData) -> Result<Vec<Row>, StoreError> {
        let where_clause = filter.where_clause.clone().unwrap_or(Value::Null);
        let mut found = Vec::new();
        for row in self.rows(table) {
            if FilterMatch::matches(row, &where_clause)? {
                found.push(row.clone());
            }
        }

        if let Some(order) = &filter.order {
            FilterMatch::sort(&mut found, &FilterOrder::validate_and_parse(order)?);
        }

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        let page = found.into_iter().skip(offset).take(limit);

        Ok(match &filter.select {
            Some(columns) if !columns.iter().any(|c| c == "*") => page
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                        .collect()
                })
                .collect(),
            _ => page.collect(),
        })
    }

    fn insert(&mut self, table: Table, row: Row) -> Result<Row, StoreError> {
        let mut row = without_nulls(row);

        if table.has_serial_id() {
            let sequence = self.sequences.entry(table).or_insert(0);
            match row.get("id").and_then(Value::as_i64) {
                Some(id) => *sequence = (*sequence).max(id),
                None => {
                    *sequence += 1;
                    row.insert("id".to_string(), Value::from(*sequence));
                }
            }
        }
        if table.has_created_at() && !row.contains_key("created_at") {
            row.insert("created_at".to_string(), Value::String(timestamp(Utc::now())));
        }

        if self.rows(table).iter().any(|existing| Self::collides(table, existing, &row)) {
            return Err(StoreError::Conflict { table: table.to_string() });
        }

        self.rows_mut(table).push(row.clone());
        Ok(row)
    }

    fn update(&mut self, table: Table, filter: &Value, changes: Row) -> Result<u64, StoreError> {
        let changes = without_nulls(changes);
        let mut updated = self.rows(table).to_vec();
        let mut count = 0;
        for row in updated.iter_mut() {
            if FilterMatch::matches(row, filter)? {
                row.extend(changes.clone());
                count += 1;
            }
        }

        Self::check_unique(table, &updated)?;
        self.rows.insert(table, updated);
        Ok(count)
    }

    fn upsert(&mut self, table: Table, row: Row) -> Result<Row, StoreError> {
        let key = table.conflict_key();
        let key_value = row
            .get(key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| StoreError::QueryError(format!("upsert into {} requires the '{}' column", table, key)))?;

        let position = self
            .rows(table)
            .iter()
            .position(|existing| existing.get(key) == Some(&key_value));

        match position {
            None => self.insert(table, row),
            Some(index) => {
                let mut updated = self.rows(table).to_vec();
                updated[index].extend(without_nulls(row));
                let merged = updated[index].clone();
                Self::check_unique(table, &updated)?;
                self.rows.insert(table, updated);
                Ok(merged)
            }
        }
    }

    fn delete(&mut self, table: Table, filter: &Value) -> Result<u64, StoreError> {
        let mut kept = Vec::new();
        let mut count = 0;
        for row in self.rows(table) {
            if FilterMatch::matches(row, filter)? {
                count += 1;
            } else {
                kept.push(row.clone());
            }
        }
        self.rows.insert(table, kept);
        Ok(count)
    }

    fn apply(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::Insert { table, row } => self.insert(table, row).map(|_| ()),
            Mutation::Update { table, filter, changes } => self.update(table, &filter, changes).map(|_| ()),
            Mutation::Delete { table, filter } => self.delete(table, &filter).map(|_| ()),
        }
    }

    /// True when `row` repeats a unique column value of `existing`
    fn collides(table: Table, existing: &Row, row: &Row) -> bool {
        table.unique_columns().iter().any(|column| match (existing.get(*column), row.get(*column)) {
            (Some(a), Some(b)) => !a.is_null() && a == b,
            _ => false,
        })
    }

    fn check_unique(table: Table, rows: &[Row]) -> Result<(), StoreError> {
        for (i, row) in rows.iter().enumerate() {
            if rows[i + 1..].iter().any(|other| Self::collides(table, row, other)) {
                return Err(StoreError::Conflict { table: table.to_string() });
            }
        }
        Ok(())
    }
}

/// In-process [`CredentialStore`] for development and tests.
///
/// Mirrors the PostgreSQL schema closely enough for the services: serial
/// ids, `created_at` defaults and unique columns are enforced. Batches
/// run against a copy of the tables that replaces the live state only
/// when every mutation succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `table`
    pub async fn len(&self, table: Table) -> usize {
        self.state.read().await.rows(table).len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn select(&self, table: Table, filter: FilterData) -> Result<Vec<Row>, StoreError> {
        self.state.read().await.select(table, &filter)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        self.state.write().await.insert(table, row)
    }

    async fn update(&self, table: Table, filter: Value, changes: Row) -> Result<u64, StoreError> {
        self.state.write().await.update(table, &filter, changes)
    }

    async fn upsert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        self.state.write().await.upsert(table, row)
    }

    async fn delete(&self, table: Table, filter: Value) -> Result<u64, StoreError> {
        self.state.write().await.delete(table, &filter)
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let mut draft = state.clone();
        for mutation in mutations {
            draft.apply(mutation)?;
        }
        *state = draft;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
