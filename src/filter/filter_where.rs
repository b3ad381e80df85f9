use serde_json::Value;

use super::error::FilterError;
use super::types::{is_valid_identifier, ColumnCast, FilterOp};

/// Compiles a JSON where clause into a parameterised SQL predicate
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_offset: usize,
    cast: ColumnCast,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize, cast: ColumnCast) -> Self {
        Self {
            param_values: vec![],
            param_offset: starting_param_index,
            cast,
        }
    }

    /// Returns the predicate and its parameters. Placeholders start at
    /// `$starting_param_index + 1`.
    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
        cast: ColumnCast,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index, cast);
        let clause = filter_where.clause(where_data)?;
        Ok((clause, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn clause(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("1=1".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut parts = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.logical(key, value)?);
            } else {
                parts.extend(self.field(key, value)?);
            }
        }

        Ok(if parts.is_empty() { "1=1".to_string() } else { parts.join(" AND ") })
    }

    fn logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match FilterOp::from_key(op) {
            Some(FilterOp::And) | Some(FilterOp::Or) => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    // Empty OR matches nothing, empty AND matches everything
                    return Ok(if op == "$or" { "1=0".to_string() } else { "1=1".to_string() });
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(format!("({})", self.clause(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            Some(FilterOp::Not) => Ok(format!("NOT ({})", self.clause(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        if !is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }

        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                let mut out = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::from_key(op_key)
                        .filter(|op| !op.is_logical())
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    out.push(self.condition(field, operator, op_val)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![self.condition(field, FilterOp::Eq, value)?]),
        }
    }

    fn condition(&mut self, column: &str, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", column);
        let comparison = |sql_op: &str, this: &mut Self| {
            format!("{} {} {}", quoted_column, sql_op, this.param(column, data.clone()))
        };

        Ok(match operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Eq => comparison("=", self),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::Ne => comparison("<>", self),
            FilterOp::Gt => comparison(">", self),
            FilterOp::Gte => comparison(">=", self),
            FilterOp::Lt => comparison("<", self),
            FilterOp::Lte => comparison("<=", self),
            FilterOp::In | FilterOp::NIn => {
                let values = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$in / $nin require an array".to_string())
                })?;
                let negate = operator == FilterOp::NIn;
                if values.is_empty() {
                    return Ok(if negate { "1=1".to_string() } else { "1=0".to_string() });
                }
                let params: Vec<String> = values.iter().map(|v| self.param(column, v.clone())).collect();
                let keyword = if negate { "NOT IN" } else { "IN" };
                format!("{} {} ({})", quoted_column, keyword, params.join(", "))
            }
            FilterOp::And | FilterOp::Or | FilterOp::Not => {
                return Err(FilterError::UnsupportedOperator(format!("{:?} on a column", operator)))
            }
        })
    }

    fn param(&mut self, column: &str, value: Value) -> String {
        self.param_values.push(value);
        let index = self.param_offset + self.param_values.len();
        match (self.cast)(column) {
            Some(sql_type) => format!("${}::{}", index, sql_type),
            None => format!("${}", index),
        }
    }
}
