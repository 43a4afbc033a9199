//! In-memory record storage.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use super::{id_matches, ListQuery, ModelStore, Ordering, SearchFilter};
use crate::error::{AdminError, AdminResult};
use crate::request::OrderDirection;

#[derive(Debug)]
struct Table {
    rows: Vec<Value>,
    next_id: i64,
}

/// A [`ModelStore`] keeping JSON rows in memory.
///
/// Ids are assigned from an auto-incrementing counter. Clones share the
/// same rows.
///
/// # Examples
///
/// ```
/// use adminkit::store::{ListQuery, MemoryStore, ModelStore};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = MemoryStore::with_rows(["name"], vec![json!({"name": "Record 01"})]);
/// let rows = store.list(&ListQuery::default()).await.unwrap();
/// assert_eq!(rows[0]["id"], 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    columns: Arc<Vec<String>>,
    table: Arc<RwLock<Table>>,
}

impl MemoryStore {
    /// Creates an empty store. An `id` column is always present.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_rows(columns, Vec::new())
    }

    /// Creates a store seeded with `rows`. Rows without an integer `id` get one.
    pub fn with_rows<I, S>(columns: I, rows: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = vec!["id".to_string()];
        for column in columns {
            let column = column.into();
            if !names.contains(&column) {
                names.push(column);
            }
        }

        let mut next_id = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if let Value::Object(map) = &mut row {
                    if !map.get("id").is_some_and(Value::is_i64) {
                        map.insert("id".to_string(), json!(next_id));
                        next_id += 1;
                    }
                }
                row
            })
            .collect();

        Self {
            columns: Arc::new(names),
            table: Arc::new(RwLock::new(Table { rows, next_id })),
        }
    }

    /// Returns the number of stored rows.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Returns whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    async fn columns(&self) -> AdminResult<Vec<String>> {
        Ok(self.columns.as_ref().clone())
    }

    async fn list(&self, query: &ListQuery) -> AdminResult<Vec<Value>> {
        let rows = self.table.read().await.rows.clone();
        let rows = match &query.search {
            Some(filter) => apply_search(rows, filter),
            None => rows,
        };
        Ok(apply_ordering(rows, query.order.as_ref()))
    }

    async fn get(&self, id: &str) -> AdminResult<Option<Value>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .find(|row| row.get("id").is_some_and(|v| id_matches(v, id)))
            .cloned())
    }

    async fn insert(&self, data: Map<String, Value>) -> AdminResult<Value> {
        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id += 1;

        let mut row = data;
        row.insert("id".to_string(), json!(id));
        let row = Value::Object(row);
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &str, data: Map<String, Value>) -> AdminResult<Value> {
        let mut table = self.table.write().await;
        let row = table
            .rows
            .iter_mut()
            .find(|row| row.get("id").is_some_and(|v| id_matches(v, id)))
            .ok_or_else(|| AdminError::NotFound(format!("no record with id '{id}'")))?;

        if let Value::Object(map) = row {
            for (key, value) in data {
                if key != "id" {
                    map.insert(key, value);
                }
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> AdminResult<bool> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table
            .rows
            .retain(|row| !row.get("id").is_some_and(|v| id_matches(v, id)));
        Ok(table.rows.len() < before)
    }

    async fn first(&self) -> AdminResult<Option<Value>> {
        let rows = self.list(&ListQuery::default()).await?;
        Ok(rows.into_iter().next())
    }
}

/// Keeps rows where any search field contains the term, ignoring case.
fn apply_search(rows: Vec<Value>, filter: &SearchFilter) -> Vec<Value> {
    if filter.term.is_empty() || filter.fields.is_empty() {
        return rows;
    }
    let term = filter.term.to_lowercase();
    rows.into_iter()
        .filter(|row| {
            filter.fields.iter().any(|field| {
                row.get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.to_lowercase().contains(&term))
            })
        })
        .collect()
}

/// Sorts rows by the ordering field, or by id when there is none.
fn apply_ordering(mut rows: Vec<Value>, ordering: Option<&Ordering>) -> Vec<Value> {
    let (field, direction) = ordering.map_or(("id", OrderDirection::Asc), |o| {
        (o.field.as_str(), o.direction)
    });
    rows.sort_by(|a, b| {
        let cmp = compare_json_values(a.get(field), b.get(field));
        match direction {
            OrderDirection::Asc => cmp,
            OrderDirection::Desc => cmp.reverse(),
        }
    });
    rows
}

fn compare_json_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => CmpOrdering::Equal,
        (None | Some(Value::Null), Some(_)) => CmpOrdering::Less,
        (Some(_), None | Some(Value::Null)) => CmpOrdering::Greater,
        (Some(a), Some(b)) => {
            if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
                a.cmp(b)
            } else if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
                a.partial_cmp(&b).unwrap_or(CmpOrdering::Equal)
            } else if let (Some(a), Some(b)) = (a.as_bool(), b.as_bool()) {
                a.cmp(&b)
            } else {
                a.to_string().cmp(&b.to_string())
            }
        }
    }
}
