use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FilterOp, FilterOrderInfo, SortDirection};

/// Evaluates the JSON filter language directly against JSON rows.
///
/// Semantics follow the SQL rendering in `filter_where`: a missing column
/// reads as `NULL`, and comparisons involving `NULL` never match.
pub struct FilterMatch;

impl FilterMatch {
    pub fn matches(row: &Map<String, Value>, where_data: &Value) -> Result<bool, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(true),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        };

        for (key, value) in obj {
            let matched = if key.starts_with('$') {
                Self::logical(row, key, value)?
            } else {
                Self::field(row, key, value)?
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn logical(row: &Map<String, Value>, op: &str, value: &Value) -> Result<bool, FilterError> {
        match FilterOp::from_key(op) {
            Some(FilterOp::And) | Some(FilterOp::Or) => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut results = Vec::with_capacity(arr.len());
                for clause in arr {
                    results.push(Self::matches(row, clause)?);
                }
                Ok(if op == "$and" {
                    results.iter().all(|m| *m)
                } else {
                    results.iter().any(|m| *m)
                })
            }
            Some(FilterOp::Not) => Ok(!Self::matches(row, value)?),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field(row: &Map<String, Value>, field: &str, value: &Value) -> Result<bool, FilterError> {
        let actual = row.get(field).unwrap_or(&Value::Null);
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                for (op_key, op_val) in obj {
                    let operator = FilterOp::from_key(op_key)
                        .filter(|op| !op.is_logical())
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    if !Self::condition(actual, operator, op_val)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Self::condition(actual, FilterOp::Eq, value),
        }
    }

    fn condition(actual: &Value, operator: FilterOp, expected: &Value) -> Result<bool, FilterError> {
        Ok(match operator {
            FilterOp::Eq if expected.is_null() => actual.is_null(),
            FilterOp::Ne if expected.is_null() => !actual.is_null(),
            FilterOp::Eq => Self::compare(actual, expected) == Some(Ordering::Equal),
            FilterOp::Ne => matches!(Self::compare(actual, expected), Some(o) if o != Ordering::Equal),
            FilterOp::Gt => Self::compare(actual, expected) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(Self::compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => Self::compare(actual, expected) == Some(Ordering::Less),
            FilterOp::Lte => matches!(Self::compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::In | FilterOp::NIn => {
                let values = expected.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData("$in / $nin require an array".to_string())
                })?;
                if actual.is_null() {
                    return Ok(false);
                }
                let found = values.iter().any(|v| Self::compare(actual, v) == Some(Ordering::Equal));
                if operator == FilterOp::In { found } else { !found }
            }
            FilterOp::And | FilterOp::Or | FilterOp::Not => {
                return Err(FilterError::UnsupportedOperator(format!("{:?} on a column", operator)))
            }
        })
    }

    /// Ordering between two JSON scalars of the same kind. Numbers compare
    /// numerically, strings lexically. Mixed kinds and nulls are unordered.
    pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
                (a == b).then_some(Ordering::Equal)
            }
            _ => None,
        }
    }

    /// Sorts rows in place. Nulls sort last ascending and first descending,
    /// as PostgreSQL does.
    pub fn sort(rows: &mut [Map<String, Value>], order: &[FilterOrderInfo]) {
        if order.is_empty() {
            return;
        }
        rows.sort_by(|left, right| {
            for info in order {
                let a = left.get(&info.column).unwrap_or(&Value::Null);
                let b = right.get(&info.column).unwrap_or(&Value::Null);
                let ordering = match (a.is_null(), b.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => Self::compare(a, b).unwrap_or(Ordering::Equal),
                };
                let ordering = match info.sort {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}
