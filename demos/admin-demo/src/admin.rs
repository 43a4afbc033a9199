//! The admins registered by the demo site.
//!
//! - `Basic / Demos`: a hand-written [`Admin`] over an in-memory store.
//! - `SQLite / Demos`: a [`ModelAdmin`] over a `SQLite` table.
//! - `Settings / System Settings`: a singleton whose list page jumps
//!   straight to the edit form of its only row.

use std::collections::HashMap;

use adminkit::admin::{record_id, Admin, AdminOptions};
use adminkit::error::{AdminError, AdminResult};
use adminkit::forms::{Choice, FieldSpec, Form, FormSpec};
use adminkit::model_admin::ModelAdmin;
use adminkit::request::AdminRequest;
use adminkit::routing::UrlNames;
use adminkit::site::SiteState;
use adminkit::store::sqlite::{execute_batch, open_database, SharedConnection};
use adminkit::store::{ListQuery, MemoryStore, ModelStore, Ordering, SearchFilter, SqliteStore};
use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

const FLATPICKR_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/flatpickr/4.6.3/flatpickr.min.css";
const FLATPICKR_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/flatpickr/4.6.3/flatpickr.min.js";

const SCHEMA: &str = "
    CREATE TABLE demo (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        date DATE
    );
    CREATE TABLE system_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_name TEXT NOT NULL DEFAULT 'adminkit demo',
        contact_email TEXT,
        maintenance_mode BOOLEAN NOT NULL DEFAULT 0
    );
    INSERT INTO demo (name, description, date) VALUES
        ('Alpha', 'The first demo row', '2026-01-01'),
        ('Bravo', 'Another demo row', '2026-02-14'),
        ('Charlie', NULL, NULL);
";

// ── Basic / Demos ───────────────────────────────────────────────────

/// Fifteen records exercising every widget type.
fn demo_records() -> Vec<Value> {
    (1..=15)
        .map(|id| {
            json!({
                "id": id,
                "name": format!("Record {id:02}"),
                "description": "Some description",
                "sex": "Male",
                "password": "",
                "tags": ["awesome", "axum"],
                "options": ["One"],
                "choices": ["One"],
                "choice": "One",
                "agree": true,
            })
        })
        .collect()
}

fn demo_form() -> FormSpec {
    FormSpec::new(vec![
        FieldSpec::text("name"),
        FieldSpec::textarea("description"),
        FieldSpec::select(
            "sex",
            vec![
                Choice::new("", "Please Select.."),
                Choice::new("Male", "Male"),
                Choice::new("Female", "Female"),
                Choice::new("Other", "Other"),
            ],
        ),
        FieldSpec::password("password"),
        FieldSpec::tags("tags"),
        FieldSpec::select_multiple(
            "options",
            Choice::same([
                "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
            ]),
        ),
        FieldSpec::checkbox_multiple(
            "choices",
            Choice::same(["One", "Two", "Three", "Four", "Five"]),
        ),
        FieldSpec::radio("choice", Choice::same(["One", "Two", "Three", "Four", "Five"])),
        FieldSpec::boolean("agree").required(),
        FieldSpec::file("attachment").optional(),
    ])
}

/// Hand-written admin: search on name, ordering by any field.
pub struct DemoAdmin {
    options: AdminOptions,
    store: MemoryStore,
}

impl DemoAdmin {
    pub fn new() -> Self {
        Self {
            options: AdminOptions::new("Basic", "Demos")
                .list_field_names(["name", "description"])
                .paginate_by(10)
                .search_enabled(true)
                .order_enabled(true)
                .create_form(demo_form())
                .update_form(demo_form())
                .delete_form(FormSpec::empty()),
            store: MemoryStore::with_rows(
                [
                    "name", "description", "sex", "password", "tags", "options", "choices",
                    "choice", "agree", "attachment",
                ],
                demo_records(),
            ),
        }
    }

    fn instance_id(instance: &Value) -> AdminResult<String> {
        record_id(instance).ok_or_else(|| AdminError::NotFound("record has no id".to_string()))
    }
}

impl Default for DemoAdmin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Admin for DemoAdmin {
    fn options(&self) -> &AdminOptions {
        &self.options
    }

    async fn get_list_objects(&self, request: &AdminRequest) -> AdminResult<Vec<Value>> {
        let search = request
            .search_term()
            .filter(|_| self.options.search_enabled)
            .map(|term| SearchFilter {
                term,
                fields: vec!["name".to_string()],
            });
        let order = self.options.order_enabled.then(|| {
            let (field, direction) = request.ordering("name");
            Ordering { field, direction }
        });
        self.store.list(&ListQuery { search, order }).await
    }

    async fn get_object(&self, request: &AdminRequest) -> AdminResult<Value> {
        let id: i64 = request.id()?;
        self.store
            .get(&id.to_string())
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("no demo record {id}")))
    }

    async fn do_create(&self, form: &Form, _request: &AdminRequest) -> AdminResult<()> {
        self.store.insert(form.data().clone()).await?;
        Ok(())
    }

    async fn do_update(
        &self,
        instance: &Value,
        form: &Form,
        _request: &AdminRequest,
    ) -> AdminResult<()> {
        let id = Self::instance_id(instance)?;
        self.store.update(&id, form.data().clone()).await?;
        Ok(())
    }

    async fn do_delete(
        &self,
        instance: &Value,
        _form: &Form,
        _request: &AdminRequest,
    ) -> AdminResult<()> {
        let id = Self::instance_id(instance)?;
        if self.store.delete(&id).await? {
            Ok(())
        } else {
            Err(AdminError::NotFound(format!("no demo record {id}")))
        }
    }
}

// ── SQLite / Demos ──────────────────────────────────────────────────

/// Opens the demo database and creates its tables.
pub async fn open_demo_database() -> AdminResult<SharedConnection> {
    let conn = open_database(":memory:")?;
    execute_batch(&conn, SCHEMA).await?;
    Ok(conn)
}

fn datepicker_options() -> String {
    json!({
        "opts": {
            "altInput": true,
            "altFormat": "d/m/Y",
            "dateFormat": "Y-m-d",
        }
    })
    .to_string()
}

/// `ModelAdmin` over the `demo` table.
pub async fn sqlite_demos(conn: SharedConnection) -> AdminResult<ModelAdmin<SqliteStore>> {
    let form = FormSpec::new(vec![
        FieldSpec::text("name"),
        FieldSpec::textarea("description").optional(),
        FieldSpec::date("date")
            .optional()
            .attr("x-data", datepicker_options())
            .attr("x-init", "flatpickr($el, opts)"),
    ]);

    Ok(ModelAdmin::new(
        AdminOptions::new("SQLite", "Demos")
            .list_field_names(["name", "description"])
            .paginate_by(10)
            .search_enabled(true)
            .order_enabled(true)
            .extra_css_url(FLATPICKR_CSS)
            .extra_js_url(FLATPICKR_JS)
            .create_form(form.clone())
            .update_form(form)
            .delete_form(FormSpec::empty()),
        SqliteStore::new(conn, "demo").await?,
    )
    .search_fields(["name", "description"])
    .default_ordering(Ordering::asc("name")))
}

// ── Settings / System Settings ──────────────────────────────────────

/// A collection holding exactly one row.
pub struct SystemSettingsAdmin {
    inner: ModelAdmin<SqliteStore>,
    /// Held while looking up or creating the row.
    singleton: Mutex<()>,
}

impl SystemSettingsAdmin {
    pub async fn new(conn: SharedConnection) -> AdminResult<Self> {
        let form = FormSpec::new(vec![
            FieldSpec::text("site_name"),
            FieldSpec::text("contact_email").optional(),
            FieldSpec::boolean("maintenance_mode"),
        ]);
        Ok(Self {
            inner: ModelAdmin::new(
                AdminOptions::new("Settings", "System Settings")
                    .update_form(form)
                    .delete_form(FormSpec::empty()),
                SqliteStore::new(conn, "system_settings").await?,
            ),
            singleton: Mutex::new(()),
        })
    }
}

#[async_trait]
impl Admin for SystemSettingsAdmin {
    fn options(&self) -> &AdminOptions {
        self.inner.options()
    }

    async fn get_list_objects(&self, request: &AdminRequest) -> AdminResult<Vec<Value>> {
        self.inner.get_list_objects(request).await
    }

    /// Always the single settings row, created on first access.
    async fn get_object(&self, _request: &AdminRequest) -> AdminResult<Value> {
        let store = self.inner.store();
        let _guard = self.singleton.lock().await;
        match store.first().await? {
            Some(settings) => Ok(settings),
            None => {
                tracing::info!("creating default system settings");
                store.insert(Map::new()).await
            }
        }
    }

    async fn do_create(&self, form: &Form, request: &AdminRequest) -> AdminResult<()> {
        self.inner.do_create(form, request).await
    }

    async fn do_update(
        &self,
        instance: &Value,
        form: &Form,
        request: &AdminRequest,
    ) -> AdminResult<()> {
        self.inner.do_update(instance, form, request).await
    }

    async fn do_delete(
        &self,
        instance: &Value,
        form: &Form,
        request: &AdminRequest,
    ) -> AdminResult<()> {
        self.inner.do_delete(instance, form, request).await
    }

    async fn list_view(&self, site: &SiteState, request: &AdminRequest) -> AdminResult<Response> {
        if !self.has_required_scope(request).await {
            return Err(AdminError::forbidden(&self.options().permission_scopes));
        }
        let instance = self.get_object(request).await?;
        let id = record_id(&instance)
            .ok_or_else(|| AdminError::NotFound("settings row has no id".to_string()))?;
        let names = UrlNames::new(site.name(), &self.options().mount_name());
        let url = site
            .urls()
            .reverse(&names.edit, &HashMap::from([("id", id.as_str())]))?;
        Ok(site.redirect(&url, &[]))
    }
}
