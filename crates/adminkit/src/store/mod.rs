//! Table-like record storage behind [`ModelAdmin`](crate::model_admin::ModelAdmin).
//!
//! A [`ModelStore`] knows its column names and can list, fetch, insert,
//! update and delete JSON records keyed by an `id` column. Two backends are
//! bundled: [`MemoryStore`] for tests and demos, and `SqliteStore` (behind
//! the `sqlite` feature) for a real table.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::AdminResult;
use crate::request::OrderDirection;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Case-insensitive substring search over a set of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    /// The lowercased search term.
    pub term: String,
    /// Columns searched; a record matches if any of them contains the term.
    pub fields: Vec<String>,
}

/// Sort order for a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    /// Column to sort by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl Ordering {
    /// Ascending order on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Parameters of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Optional search filter.
    pub search: Option<SearchFilter>,
    /// Optional ordering; unordered listings come back in id order.
    pub order: Option<Ordering>,
}

/// Storage for one collection of records.
#[async_trait]
pub trait ModelStore: Send + Sync + 'static {
    /// Returns the column names, including `id`.
    async fn columns(&self) -> AdminResult<Vec<String>>;

    /// Lists records matching `query`.
    async fn list(&self, query: &ListQuery) -> AdminResult<Vec<Value>>;

    /// Fetches the record with this id.
    async fn get(&self, id: &str) -> AdminResult<Option<Value>>;

    /// Inserts a record, assigning its id. Returns the stored record.
    async fn insert(&self, data: Map<String, Value>) -> AdminResult<Value>;

    /// Overwrites the given columns of a record. Returns the stored record.
    ///
    /// Fails with [`AdminError::NotFound`](crate::error::AdminError::NotFound)
    /// if no record has this id.
    async fn update(&self, id: &str, data: Map<String, Value>) -> AdminResult<Value>;

    /// Deletes a record. Returns whether one was removed.
    async fn delete(&self, id: &str) -> AdminResult<bool>;

    /// Returns the record with the lowest id.
    async fn first(&self) -> AdminResult<Option<Value>>;
}

/// Returns whether a JSON id equals the path text `id`.
pub(crate) fn id_matches(value: &Value, id: &str) -> bool {
    match value {
        Value::Number(n) => n.to_string() == id,
        Value::String(s) => s == id,
        _ => false,
    }
}
