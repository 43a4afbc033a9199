//! An [`Admin`] backed by a [`ModelStore`].
//!
//! `ModelAdmin` implements every data hook on top of a store: listing with
//! search and ordering, fetching by the `id` path parameter, and writing
//! only the form fields that name real columns.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::admin::{record_id, Admin, AdminOptions};
use crate::error::{AdminError, AdminResult};
use crate::forms::Form;
use crate::request::AdminRequest;
use crate::store::{ListQuery, ModelStore, Ordering, SearchFilter};

/// Generic CRUD admin over a store.
///
/// # Examples
///
/// ```
/// use adminkit::admin::AdminOptions;
/// use adminkit::model_admin::ModelAdmin;
/// use adminkit::store::{MemoryStore, Ordering};
///
/// let admin = ModelAdmin::new(
///     AdminOptions::new("Catalog", "Products")
///         .list_field_names(["name", "price"])
///         .search_enabled(true)
///         .order_enabled(true),
///     MemoryStore::new(["name", "price"]),
/// )
/// .search_fields(["name"])
/// .default_ordering(Ordering::asc("name"));
/// ```
#[derive(Debug, Clone)]
pub struct ModelAdmin<S> {
    options: AdminOptions,
    store: S,
    search_fields: Vec<String>,
    default_ordering: Option<Ordering>,
}

impl<S: ModelStore> ModelAdmin<S> {
    /// Creates an admin over `store`.
    pub const fn new(options: AdminOptions, store: S) -> Self {
        Self {
            options,
            store,
            search_fields: Vec::new(),
            default_ordering: None,
        }
    }

    /// Sets the columns searched by the list view.
    #[must_use]
    pub fn search_fields<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the ordering used when none is requested.
    #[must_use]
    pub fn default_ordering(mut self, ordering: Ordering) -> Self {
        self.default_ordering = Some(ordering);
        self
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Translates the request's search and ordering parameters into a query.
    pub async fn list_query(&self, request: &AdminRequest) -> AdminResult<ListQuery> {
        let search = request
            .search_term()
            .filter(|_| self.options.search_enabled)
            .map(|term| SearchFilter {
                term,
                fields: self.search_fields.clone(),
            });

        let mut order = None;
        if self.options.order_enabled {
            let (field, direction) = request.ordering("id");
            if self.store.columns().await?.contains(&field) {
                order = Some(Ordering { field, direction });
            }
        }

        Ok(ListQuery {
            search,
            order: order.or_else(|| self.default_ordering.clone()),
        })
    }

    /// Copies the cleaned form values that name existing columns.
    async fn writable(&self, form: &Form) -> AdminResult<Map<String, Value>> {
        let columns = self.store.columns().await?;
        Ok(form
            .data()
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && columns.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn instance_id(instance: &Value, request: &AdminRequest) -> AdminResult<String> {
        record_id(instance)
            .or_else(|| request.path_param("id").map(str::to_string))
            .ok_or_else(|| AdminError::NotFound("record has no id".to_string()))
    }
}

#[async_trait]
impl<S: ModelStore> Admin for ModelAdmin<S> {
    fn options(&self) -> &AdminOptions {
        &self.options
    }

    async fn get_list_objects(&self, request: &AdminRequest) -> AdminResult<Vec<Value>> {
        let query = self.list_query(request).await?;
        self.store.list(&query).await
    }

    async fn get_object(&self, request: &AdminRequest) -> AdminResult<Value> {
        let id = request
            .path_param("id")
            .ok_or_else(|| AdminError::NotFound("missing id".to_string()))?;
        self.store.get(id).await?.ok_or_else(|| {
            AdminError::NotFound(format!(
                "no {} with id '{id}'",
                self.options.collection_name
            ))
        })
    }

    async fn do_create(&self, form: &Form, _request: &AdminRequest) -> AdminResult<()> {
        let data = self.writable(form).await?;
        self.store.insert(data).await?;
        Ok(())
    }

    async fn do_update(
        &self,
        instance: &Value,
        form: &Form,
        request: &AdminRequest,
    ) -> AdminResult<()> {
        let id = Self::instance_id(instance, request)?;
        let data = self.writable(form).await?;
        self.store.update(&id, data).await?;
        Ok(())
    }

    async fn do_delete(
        &self,
        instance: &Value,
        _form: &Form,
        request: &AdminRequest,
    ) -> AdminResult<()> {
        let id = Self::instance_id(instance, request)?;
        if self.store.delete(&id).await? {
            Ok(())
        } else {
            Err(AdminError::NotFound(format!("no record with id '{id}'")))
        }
    }
}
