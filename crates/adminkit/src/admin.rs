//! The admin abstraction: one collection of records exposed through a list,
//! create, edit and delete view.
//!
//! Implementors describe their collection with [`AdminOptions`] and supply
//! the data hooks (`get_list_objects`, `get_object`, `do_create`,
//! `do_update`, `do_delete`). The view flows themselves (permission checks,
//! form handling, pagination, flash messages and redirects) are provided by
//! default methods that delegate to [`crate::views`], so an implementor can
//! override one view and still call the stock behaviour from it.

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tera::Context;

use crate::error::{AdminError, AdminResult};
use crate::forms::{Form, FormSpec};
use crate::pagination::{Page, Paginator};
use crate::request::AdminRequest;
use crate::routing::{self, IdKind};
use crate::site::SiteState;
use crate::views;

/// Declarative description of an admin.
///
/// # Examples
///
/// ```
/// use adminkit::admin::AdminOptions;
/// use adminkit::forms::{FieldSpec, FormSpec};
///
/// let options = AdminOptions::new("Basic", "Demos")
///     .list_field_names(["name", "description"])
///     .paginate_by(10)
///     .search_enabled(true)
///     .create_form(FormSpec::new(vec![FieldSpec::text("name")]));
///
/// assert_eq!(options.mount_point(), "/basic/demos");
/// assert_eq!(options.list_template, "list.html");
/// ```
#[derive(Debug, Clone)]
pub struct AdminOptions {
    /// The section this collection is listed under.
    pub section_name: String,
    /// The collection's display name.
    pub collection_name: String,
    /// Record keys shown as list columns.
    pub list_field_names: Vec<String>,
    /// Records per page, or `None` to list everything on one page.
    pub paginate_by: Option<usize>,
    /// Whether the list view shows a search box.
    pub search_enabled: bool,
    /// Whether list column headers toggle ordering.
    pub order_enabled: bool,
    /// How the `{id}` path segment is matched.
    pub id_kind: IdKind,
    /// Scopes every view requires.
    pub permission_scopes: Vec<String>,
    /// Template for the list view.
    pub list_template: String,
    /// Template for the create view.
    pub create_template: String,
    /// Template for the update view.
    pub update_template: String,
    /// Template for the delete view.
    pub delete_template: String,
    /// Stylesheets added to every page of this admin.
    pub extra_css_urls: Vec<String>,
    /// Scripts added to every page of this admin.
    pub extra_js_urls: Vec<String>,
    /// Form for new records.
    pub create_form: Option<FormSpec>,
    /// Form for existing records.
    pub update_form: Option<FormSpec>,
    /// Form confirming a delete.
    pub delete_form: Option<FormSpec>,
}

impl AdminOptions {
    /// Creates options with the stock templates and no forms.
    pub fn new(section_name: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            section_name: section_name.into(),
            collection_name: collection_name.into(),
            list_field_names: Vec::new(),
            paginate_by: None,
            search_enabled: false,
            order_enabled: false,
            id_kind: IdKind::default(),
            permission_scopes: Vec::new(),
            list_template: "list.html".to_string(),
            create_template: "create.html".to_string(),
            update_template: "update.html".to_string(),
            delete_template: "delete.html".to_string(),
            extra_css_urls: Vec::new(),
            extra_js_urls: Vec::new(),
            create_form: None,
            update_form: None,
            delete_form: None,
        }
    }

    /// Sets the list columns.
    #[must_use]
    pub fn list_field_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_field_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enables pagination with `per_page` records per page.
    #[must_use]
    pub const fn paginate_by(mut self, per_page: usize) -> Self {
        self.paginate_by = Some(per_page);
        self
    }

    /// Shows or hides the search box.
    #[must_use]
    pub const fn search_enabled(mut self, enabled: bool) -> Self {
        self.search_enabled = enabled;
        self
    }

    /// Enables or disables ordering by column.
    #[must_use]
    pub const fn order_enabled(mut self, enabled: bool) -> Self {
        self.order_enabled = enabled;
        self
    }

    /// Sets how record ids are matched in paths.
    #[must_use]
    pub const fn id_kind(mut self, kind: IdKind) -> Self {
        self.id_kind = kind;
        self
    }

    /// Sets the scopes required by every view.
    #[must_use]
    pub fn permission_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permission_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the list template.
    #[must_use]
    pub fn list_template(mut self, name: impl Into<String>) -> Self {
        self.list_template = name.into();
        self
    }

    /// Overrides the create template.
    #[must_use]
    pub fn create_template(mut self, name: impl Into<String>) -> Self {
        self.create_template = name.into();
        self
    }

    /// Overrides the update template.
    #[must_use]
    pub fn update_template(mut self, name: impl Into<String>) -> Self {
        self.update_template = name.into();
        self
    }

    /// Overrides the delete template.
    #[must_use]
    pub fn delete_template(mut self, name: impl Into<String>) -> Self {
        self.delete_template = name.into();
        self
    }

    /// Adds a stylesheet URL.
    #[must_use]
    pub fn extra_css_url(mut self, url: impl Into<String>) -> Self {
        self.extra_css_urls.push(url.into());
        self
    }

    /// Adds a script URL.
    #[must_use]
    pub fn extra_js_url(mut self, url: impl Into<String>) -> Self {
        self.extra_js_urls.push(url.into());
        self
    }

    /// Sets the create form.
    #[must_use]
    pub fn create_form(mut self, form: FormSpec) -> Self {
        self.create_form = Some(form);
        self
    }

    /// Sets the update form.
    #[must_use]
    pub fn update_form(mut self, form: FormSpec) -> Self {
        self.update_form = Some(form);
        self
    }

    /// Sets the delete confirmation form.
    #[must_use]
    pub fn delete_form(mut self, form: FormSpec) -> Self {
        self.delete_form = Some(form);
        self
    }

    /// Returns `/{section}/{collection}`.
    pub fn mount_point(&self) -> String {
        routing::mount_point(&self.section_name, &self.collection_name)
    }

    /// Returns `{section}_{collection}`.
    pub fn mount_name(&self) -> String {
        routing::mount_name(&self.section_name, &self.collection_name)
    }
}

/// A collection exposed through the admin site.
///
/// Only the data hooks must be implemented. Views are overridable, e.g. to
/// redirect a singleton collection's list straight to its edit page.
#[async_trait]
pub trait Admin: Send + Sync + 'static {
    /// Returns the admin's declarative options.
    fn options(&self) -> &AdminOptions;

    /// Returns the records for the list view.
    ///
    /// When searching or ordering is enabled, the implementation is
    /// responsible for honouring the `search`, `order_by` and
    /// `order_direction` query parameters.
    async fn get_list_objects(&self, request: &AdminRequest) -> AdminResult<Vec<Value>>;

    /// Returns the record addressed by the `id` path parameter.
    async fn get_object(&self, request: &AdminRequest) -> AdminResult<Value>;

    /// Persists a new record from a validated create form.
    async fn do_create(&self, form: &Form, request: &AdminRequest) -> AdminResult<()>;

    /// Applies a validated update form to `instance`.
    async fn do_update(
        &self,
        instance: &Value,
        form: &Form,
        request: &AdminRequest,
    ) -> AdminResult<()>;

    /// Deletes `instance`. Return [`AdminError::Integrity`] when a
    /// constraint prevents the delete.
    async fn do_delete(
        &self,
        instance: &Value,
        form: &Form,
        request: &AdminRequest,
    ) -> AdminResult<()>;

    /// Checks the caller holds every scope in `permission_scopes`.
    async fn has_required_scope(&self, request: &AdminRequest) -> bool {
        request
            .credentials()
            .has_required_scope(&self.options().permission_scopes)
    }

    /// Builds a form instance. Override to adjust fields per request.
    fn get_form(
        &self,
        spec: &FormSpec,
        initial: Option<&Value>,
        submitted: Option<&[(String, String)]>,
    ) -> Form {
        Form::new(spec, initial, submitted)
    }

    /// Splits `objects` into the page requested by the `page` parameter.
    fn paginate(
        &self,
        request: &AdminRequest,
        objects: Vec<Value>,
    ) -> AdminResult<(Paginator<Value>, Page<Value>)> {
        views::paginate(self.options(), request, objects)
    }

    /// Builds the template context shared by all four views.
    fn get_context(&self, site: &SiteState, request: &AdminRequest) -> AdminResult<Context> {
        views::admin_context(self.options(), site, request)
    }

    /// Renders the list of records.
    async fn list_view(&self, site: &SiteState, request: &AdminRequest) -> AdminResult<Response> {
        views::list_view(self, site, request).await
    }

    /// Shows and handles the create form.
    async fn create_view(
        &self,
        site: &SiteState,
        request: &AdminRequest,
    ) -> AdminResult<Response> {
        views::create_view(self, site, request).await
    }

    /// Shows and handles the update form.
    async fn update_view(
        &self,
        site: &SiteState,
        request: &AdminRequest,
    ) -> AdminResult<Response> {
        views::update_view(self, site, request).await
    }

    /// Shows and handles the delete confirmation.
    async fn delete_view(
        &self,
        site: &SiteState,
        request: &AdminRequest,
    ) -> AdminResult<Response> {
        views::delete_view(self, site, request).await
    }
}

/// Returns the text used to name a record: its `name`, `title` or `id`.
pub fn display_label(record: &Value) -> String {
    ["name", "title", "id"]
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "Object".to_string())
}

/// Returns a record's `id` as path text, if it has one.
pub fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn missing_form(view: &'static str) -> AdminError {
    AdminError::MissingForm { view }
}
