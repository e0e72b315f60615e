//! SQLite-backed gateway implementation.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo};

use crate::error::Result;
use crate::gateway::{Row, StoreGateway, Value};

/// SQLite-backed store gateway.
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    /// Creates a gateway over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to the given SQLite URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Integer(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Null => query.bind(Option::<i64>::None),
        };
    }
    query
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    let mut converted = Row::new();
    for column in row.columns() {
        let ordinal = column.ordinal();
        let value = match column.type_info().name() {
            "INTEGER" | "BOOLEAN" => row
                .try_get::<Option<i64>, _>(ordinal)?
                .map_or(Value::Null, Value::Integer),
            "REAL" => row
                .try_get::<Option<f64>, _>(ordinal)?
                .map_or(Value::Null, Value::Real),
            "TEXT" | "DATETIME" => row
                .try_get::<Option<String>, _>(ordinal)?
                .map_or(Value::Null, Value::Text),
            "NULL" => Value::Null,
            // Expression columns come back with engine-derived types;
            // fall through the affinities in order.
            _ => {
                if let Ok(v) = row.try_get::<Option<i64>, _>(ordinal) {
                    v.map_or(Value::Null, Value::Integer)
                } else if let Ok(v) = row.try_get::<Option<f64>, _>(ordinal) {
                    v.map_or(Value::Null, Value::Real)
                } else {
                    row.try_get::<Option<String>, _>(ordinal)?
                        .map_or(Value::Null, Value::Text)
                }
            }
        };
        converted.insert(column.name(), value);
    }
    Ok(converted)
}

#[async_trait]
impl StoreGateway for SqliteGateway {
    async fn run(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        let affected = result.rows_affected();
        tracing::debug!(sql, params = params.len(), affected, "statement executed");
        Ok(affected)
    }

    async fn get(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        tracing::debug!(sql, params = params.len(), found = row.is_some(), "row fetched");
        row.as_ref().map(convert_row).transpose()
    }

    async fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(sql, params = params.len(), rows = rows.len(), "rows fetched");
        rows.iter().map(convert_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn gateway() -> SqliteGateway {
        // A single connection keeps every statement on the same
        // in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let gateway = SqliteGateway::new(pool);
        gateway.run_migrations().await.unwrap();
        gateway
    }

    #[tokio::test]
    async fn run_reports_affected_rows() {
        let gateway = gateway().await;

        let affected = gateway
            .run(
                "INSERT INTO item (title, price, category, in_stock, sold_quantity) \
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    Value::Text("Widget".into()),
                    Value::Real(9.99),
                    Value::Text("tools".into()),
                    Value::Integer(5),
                    Value::Integer(0),
                ],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let affected = gateway
            .run(
                "UPDATE item SET in_stock = in_stock - ? WHERE id = ? AND in_stock >= ?",
                &[Value::Integer(10), Value::Integer(1), Value::Integer(10)],
            )
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn get_decodes_typed_columns() {
        let gateway = gateway().await;
        gateway
            .run(
                "INSERT INTO item (title, price, category, in_stock, sold_quantity) \
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    Value::Text("Gadget".into()),
                    Value::Real(25.0),
                    Value::Text("toys".into()),
                    Value::Integer(3),
                    Value::Integer(0),
                ],
            )
            .await
            .unwrap();

        let row = gateway
            .get(
                "SELECT id, title, price, in_stock FROM item WHERE id = ?",
                &[Value::Integer(1)],
            )
            .await
            .unwrap()
            .expect("row should exist");

        assert_eq!(row.integer("id").unwrap(), 1);
        assert_eq!(row.text("title").unwrap(), "Gadget");
        assert_eq!(row.real("price").unwrap(), 25.0);
        assert_eq!(row.integer("in_stock").unwrap(), 3);
    }

    #[tokio::test]
    async fn get_returns_none_for_missing_row() {
        let gateway = gateway().await;
        let row = gateway
            .get("SELECT id FROM item WHERE id = ?", &[Value::Integer(999)])
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn all_with_generated_placeholders() {
        let gateway = gateway().await;
        for (title, stock) in [("A", 1i64), ("B", 2), ("C", 3)] {
            gateway
                .run(
                    "INSERT INTO item (title, price, category, in_stock, sold_quantity) \
                     VALUES (?, ?, ?, ?, ?)",
                    &[
                        Value::Text(title.into()),
                        Value::Real(1.0),
                        Value::Text("misc".into()),
                        Value::Integer(stock),
                        Value::Integer(0),
                    ],
                )
                .await
                .unwrap();
        }

        let sql = format!(
            "SELECT id, in_stock FROM item WHERE id IN ({})",
            crate::gateway::placeholders(2)
        );
        let rows = gateway
            .all(&sql, &[Value::Integer(1), Value::Integer(3)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn check_constraint_rejects_negative_stock() {
        let gateway = gateway().await;
        gateway
            .run(
                "INSERT INTO item (title, price, category, in_stock, sold_quantity) \
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    Value::Text("X".into()),
                    Value::Real(1.0),
                    Value::Text("misc".into()),
                    Value::Integer(1),
                    Value::Integer(0),
                ],
            )
            .await
            .unwrap();

        // An unguarded over-decrement trips the CHECK constraint.
        let result = gateway
            .run(
                "UPDATE item SET in_stock = in_stock - ? WHERE id = ?",
                &[Value::Integer(5), Value::Integer(1)],
            )
            .await;
        assert!(result.is_err());
    }
}
