use serde_json::Value;
use sqlx::{self, postgres::PgArguments};

use crate::filter::{is_valid_identifier, Filter, FilterData, SqlResult};
use crate::store::{Row, StoreError, Table};

/// Renders parameterised PostgreSQL for one table.
///
/// Every statement that yields rows returns them as a single `jsonb`
/// column named `row`.
pub struct QueryBuilder {
    table: Table,
}

impl QueryBuilder {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn select(&self, filter_data: FilterData) -> Result<SqlResult, StoreError> {
        let mut filter = Filter::new(self.table.name())?.with_cast(Table::column_cast);
        filter.assign(filter_data)?;
        Ok(filter.to_sql()?)
    }

    pub fn insert(&self, row: &Row) -> Result<SqlResult, StoreError> {
        if row.is_empty() {
            return Ok(SqlResult {
                query: format!("INSERT INTO \"{}\" AS t DEFAULT VALUES RETURNING to_jsonb(t) AS row", self.table),
                params: vec![],
            });
        }
        let (columns, placeholders, params) = Self::values(row, 0)?;
        Ok(SqlResult {
            query: format!(
                "INSERT INTO \"{}\" AS t ({}) VALUES ({}) RETURNING to_jsonb(t) AS row",
                self.table,
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        })
    }

    pub fn upsert(&self, row: &Row) -> Result<SqlResult, StoreError> {
        let key = self.table.conflict_key();
        if !row.contains_key(key) {
            return Err(StoreError::QueryError(format!(
                "upsert into {} requires the '{}' column",
                self.table, key
            )));
        }

        let (columns, placeholders, params) = Self::values(row, 0)?;
        let mut assignments: Vec<String> = row
            .keys()
            .filter(|c| c.as_str() != key)
            .map(|c| format!("\"{}\" = EXCLUDED.\"{}\"", c, c))
            .collect();
        if assignments.is_empty() {
            // Conflict key only: touch the key so RETURNING still yields the row
            assignments.push(format!("\"{}\" = EXCLUDED.\"{}\"", key, key));
        }

        Ok(SqlResult {
            query: format!(
                "INSERT INTO \"{}\" AS t ({}) VALUES ({}) ON CONFLICT (\"{}\") DO UPDATE SET {} RETURNING to_jsonb(t) AS row",
                self.table,
                columns.join(", "),
                placeholders.join(", "),
                key,
                assignments.join(", ")
            ),
            params,
        })
    }

    pub fn update(&self, where_clause: &Value, changes: &Row) -> Result<SqlResult, StoreError> {
        if changes.is_empty() {
            return Err(StoreError::QueryError(format!("update of {} has no columns to set", self.table)));
        }
        let (columns, placeholders, mut params) = Self::values(changes, 0)?;
        let assignments: Vec<String> = columns
            .iter()
            .zip(placeholders.iter())
            .map(|(c, p)| format!("{} = {}", c, p))
            .collect();

        let where_sql = self.where_sql(where_clause, params.len())?;
        params.extend(where_sql.params);

        Ok(SqlResult {
            query: format!("UPDATE \"{}\" SET {} WHERE {}", self.table, assignments.join(", "), where_sql.query),
            params,
        })
    }

    pub fn delete(&self, where_clause: &Value) -> Result<SqlResult, StoreError> {
        let where_sql = self.where_sql(where_clause, 0)?;
        Ok(SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.table, where_sql.query),
            params: where_sql.params,
        })
    }

    fn where_sql(&self, where_clause: &Value, param_offset: usize) -> Result<SqlResult, StoreError> {
        let mut filter = Filter::new(self.table.name())?.with_cast(Table::column_cast);
        filter.where_clause(where_clause.clone())?;
        Ok(filter.to_where_sql(param_offset)?)
    }

    /// Quoted column list, placeholders and parameters for a row
    fn values(row: &Row, param_offset: usize) -> Result<(Vec<String>, Vec<String>, Vec<Value>), StoreError> {
        let mut columns = Vec::with_capacity(row.len());
        let mut placeholders = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());

        for (i, (column, value)) in row.iter().enumerate() {
            if !is_valid_identifier(column) {
                return Err(StoreError::QueryError(format!("Invalid column name: {}", column)));
            }
            columns.push(format!("\"{}\"", column));
            let index = param_offset + i + 1;
            placeholders.push(match Table::column_cast(column) {
                Some(sql_type) => format!("${}::{}", index, sql_type),
                None => format!("${}", index),
            });
            params.push(value.clone());
        }

        Ok((columns, placeholders, params))
    }
}

pub fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Arrays and objects are stored as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
