//! SQLite record storage using `rusqlite`.
//!
//! Every statement runs inside `tokio::task::spawn_blocking` against a
//! connection guarded by an async `Mutex`, so several stores can share one
//! database. Column names are introspected once with `PRAGMA table_info` and
//! only those names ever reach the generated SQL; values are always bound as
//! parameters.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode};
use serde_json::{Map, Number, Value};
use tokio::sync::Mutex;

use super::{ListQuery, ModelStore};
use crate::error::{AdminError, AdminResult};
use crate::request::OrderDirection;

/// A connection shared between stores.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Opens a database with foreign keys enforced. `":memory:"` opens an
/// in-memory database.
pub fn open_database(path: impl AsRef<Path>) -> AdminResult<SharedConnection> {
    let path = path.as_ref();
    let conn = if path.to_str() == Some(":memory:") {
        Connection::open_in_memory()
    } else {
        Connection::open(path)
    }
    .map_err(|e| AdminError::Database(format!("SQLite open failed: {e}")))?;

    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .map_err(|e| AdminError::Database(format!("Failed to set pragmas: {e}")))?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Runs a batch of SQL statements, e.g. to create tables.
pub async fn execute_batch(conn: &SharedConnection, sql: impl Into<String>) -> AdminResult<()> {
    let sql = sql.into();
    run(conn, move |conn| conn.execute_batch(&sql).map_err(db_error)).await
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    decl_type: String,
}

impl Column {
    fn quoted(&self) -> String {
        quote(&self.name)
    }
}

/// A [`ModelStore`] over one SQLite table with an `id` primary key.
#[derive(Clone)]
pub struct SqliteStore {
    conn: SharedConnection,
    table: String,
    columns: Arc<Vec<Column>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("table", &self.table)
            .field("columns", &self.columns.iter().map(|c| &c.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Binds a store to `table`, reading its columns.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::ImproperlyConfigured`] if the table name is not
    /// a plain identifier, the table does not exist, or it has no `id` column.
    pub async fn new(conn: SharedConnection, table: &str) -> AdminResult<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AdminError::ImproperlyConfigured(format!(
                "invalid table name '{table}'"
            )));
        }

        let sql = format!("PRAGMA table_info({})", quote(table));
        let columns = run(&conn, move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Column {
                        name: row.get(1)?,
                        decl_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                })
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
        .await?;

        if columns.is_empty() {
            return Err(AdminError::ImproperlyConfigured(format!(
                "table '{table}' does not exist"
            )));
        }
        if !columns.iter().any(|c| c.name == "id") {
            return Err(AdminError::ImproperlyConfigured(format!(
                "table '{table}' has no 'id' column"
            )));
        }

        tracing::debug!(table, columns = columns.len(), "bound sqlite store");
        Ok(Self {
            conn,
            table: table.to_string(),
            columns: Arc::new(columns),
        })
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Splits `data` into quoted column names and bound values, dropping
    /// unknown keys and `id`.
    fn assignments(&self, data: &Map<String, Value>) -> (Vec<String>, Vec<SqlValue>) {
        data.iter()
            .filter(|(key, _)| key.as_str() != "id")
            .filter_map(|(key, value)| {
                self.column(key)
                    .map(|column| (column.quoted(), to_sql(value)))
            })
            .unzip()
    }

    async fn select(&self, sql: String, params: Vec<SqlValue>) -> AdminResult<Vec<Value>> {
        let columns = Arc::clone(&self.columns);
        run(&self.conn, move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let names: Vec<String> = stmt.column_names().iter().map(|n| (*n).to_string()).collect();
            let mut rows = stmt.query(params_from_iter(params)).map_err(db_error)?;
            let mut records = Vec::new();
            while let Some(row) = rows.next().map_err(db_error)? {
                let mut record = Map::new();
                for (index, name) in names.iter().enumerate() {
                    let decl_type = columns
                        .iter()
                        .find(|c| &c.name == name)
                        .map_or("", |c| c.decl_type.as_str());
                    let value = row.get_ref(index).map_err(db_error)?;
                    record.insert(name.clone(), from_sql(value, decl_type));
                }
                records.push(Value::Object(record));
            }
            Ok(records)
        })
        .await
    }

    async fn execute(&self, sql: String, params: Vec<SqlValue>) -> AdminResult<usize> {
        run(&self.conn, move |conn| {
            conn.execute(&sql, params_from_iter(params)).map_err(db_error)
        })
        .await
    }
}

#[async_trait]
impl ModelStore for SqliteStore {
    async fn columns(&self) -> AdminResult<Vec<String>> {
        Ok(self.columns.iter().map(|c| c.name.clone()).collect())
    }

    async fn list(&self, query: &ListQuery) -> AdminResult<Vec<Value>> {
        let mut sql = format!("SELECT * FROM {}", quote(&self.table));
        let mut params = Vec::new();

        if let Some(filter) = query.search.as_ref().filter(|f| !f.term.is_empty()) {
            let searched: Vec<String> = filter
                .fields
                .iter()
                .filter_map(|field| self.column(field))
                .map(|column| format!("lower({}) LIKE ?1", column.quoted()))
                .collect();
            if !searched.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&searched.join(" OR "));
                params.push(SqlValue::Text(format!("%{}%", filter.term.to_lowercase())));
            }
        }

        let (field, direction) = query
            .order
            .as_ref()
            .and_then(|o| self.column(&o.field).map(|c| (c.quoted(), o.direction)))
            .unwrap_or_else(|| (quote("id"), OrderDirection::Asc));
        sql.push_str(&format!(" ORDER BY {field} {}", direction.as_str().to_uppercase()));

        self.select(sql, params).await
    }

    async fn get(&self, id: &str) -> AdminResult<Option<Value>> {
        let sql = format!("SELECT * FROM {} WHERE \"id\" = ?1", quote(&self.table));
        let rows = self.select(sql, vec![SqlValue::Text(id.to_string())]).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, data: Map<String, Value>) -> AdminResult<Value> {
        let (names, params) = self.assignments(&data);
        let table = quote(&self.table);
        let sql = if names.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                names.join(", "),
                placeholders.join(", ")
            )
        };

        let rowid = run(&self.conn, move |conn| {
            conn.execute(&sql, params_from_iter(params)).map_err(db_error)?;
            Ok(conn.last_insert_rowid())
        })
        .await?;

        let sql = format!("SELECT * FROM {table} WHERE rowid = ?1");
        self.select(sql, vec![SqlValue::Integer(rowid)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::Database("inserted row vanished".to_string()))
    }

    async fn update(&self, id: &str, data: Map<String, Value>) -> AdminResult<Value> {
        let (names, mut params) = self.assignments(&data);
        if !names.is_empty() {
            let sets: Vec<String> = names
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{name} = ?{}", i + 1))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE \"id\" = ?{}",
                quote(&self.table),
                sets.join(", "),
                names.len() + 1
            );
            params.push(SqlValue::Text(id.to_string()));
            if self.execute(sql, params).await? == 0 {
                return Err(AdminError::NotFound(format!("no record with id '{id}'")));
            }
        }

        self.get(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("no record with id '{id}'")))
    }

    async fn delete(&self, id: &str) -> AdminResult<bool> {
        let sql = format!("DELETE FROM {} WHERE \"id\" = ?1", quote(&self.table));
        Ok(self.execute(sql, vec![SqlValue::Text(id.to_string())]).await? > 0)
    }

    async fn first(&self) -> AdminResult<Option<Value>> {
        let sql = format!("SELECT * FROM {} ORDER BY \"id\" LIMIT 1", quote(&self.table));
        Ok(self.select(sql, Vec::new()).await?.into_iter().next())
    }
}

/// Runs `f` on the blocking pool with the connection locked.
async fn run<T, F>(conn: &SharedConnection, f: F) -> AdminResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> AdminResult<T> + Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let conn = conn.blocking_lock();
        f(&conn)
    })
    .await
    .map_err(|e| AdminError::Database(format!("Task join error: {e}")))?
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn db_error(err: rusqlite::Error) -> AdminError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            AdminError::Integrity(err.to_string())
        }
        _ => AdminError::Database(err.to_string()),
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| SqlValue::Real(n.as_f64().unwrap_or_default()), SqlValue::Integer),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>, decl_type: &str) -> Value {
    let decl_type = decl_type.to_ascii_uppercase();
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if decl_type.starts_with("BOOL") => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if decl_type == "JSON" {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            } else {
                Value::String(text)
            }
        }
        ValueRef::Blob(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}
