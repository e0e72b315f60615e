use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{Result, StoreError};

/// A dynamically typed statement parameter or result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// A single result row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: HashMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Builder-style variant of [`Row::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Returns the raw value of a column, if present.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Reads a column as an integer.
    pub fn integer(&self, column: &str) -> Result<i64> {
        match self.columns.get(column) {
            Some(Value::Integer(v)) => Ok(*v),
            _ => Err(StoreError::decode(column)),
        }
    }

    /// Reads a column as a float, widening integers.
    pub fn real(&self, column: &str) -> Result<f64> {
        match self.columns.get(column) {
            Some(Value::Real(v)) => Ok(*v),
            Some(Value::Integer(v)) => Ok(*v as f64),
            _ => Err(StoreError::decode(column)),
        }
    }

    /// Reads a column as text.
    pub fn text(&self, column: &str) -> Result<&str> {
        match self.columns.get(column) {
            Some(Value::Text(v)) => Ok(v.as_str()),
            _ => Err(StoreError::decode(column)),
        }
    }

    /// Reads a nullable text column.
    pub fn text_opt(&self, column: &str) -> Result<Option<&str>> {
        match self.columns.get(column) {
            Some(Value::Text(v)) => Ok(Some(v.as_str())),
            Some(Value::Null) | None => Ok(None),
            _ => Err(StoreError::decode(column)),
        }
    }
}

/// Returns a comma-separated run of `?` placeholders.
///
/// Used for variable-length `IN (...)` lists: the placeholder text varies
/// with the list length but every value is still bound, never spliced
/// into the statement.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Core trait for store gateway implementations.
///
/// Each call executes exactly one parameterized statement. The engine
/// guarantees atomicity per statement only; nothing here spans calls.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Executes a statement and returns the number of affected rows.
    async fn run(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Executes a query and returns the first row, if any.
    async fn get(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Executes a query and returns all rows.
    async fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;
}
