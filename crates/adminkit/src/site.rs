//! The admin site: registry of admins and widgets, and router generation.
//!
//! An [`AdminSite`] collects [`Admin`]s and dashboard [`Widget`]s, then
//! [`AdminSite::into_router`] turns them into an axum [`Router`]:
//!
//! - `GET {prefix}/` - the dashboard
//! - `GET {prefix}/{static_url}/{file}` - bundled `admin.css` / `admin.js`
//! - `GET {prefix}/{section}/{collection}/` - list view
//! - `GET|POST {prefix}/{section}/{collection}/create` - create view
//! - `GET|POST {prefix}/{section}/{collection}/{id}/edit` - update view
//! - `GET|POST {prefix}/{section}/{collection}/{id}/delete` - delete view
//!
//! Once built, the routes share one [`SiteState`], which views use to build
//! template contexts, reverse URLs and render responses.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tera::Context;
use tracing::Instrument;

use crate::admin::Admin;
use crate::config::AdminConfig;
use crate::error::{AdminError, AdminResult};
use crate::logging::admin_span;
use crate::messages::{self, Message, MessageSigner};
use crate::request::AdminRequest;
use crate::routing::{checked_segment, normalize_prefix, UrlNames, UrlRegistry};
use crate::templates::{self, Templates};
use crate::widgets::Widget;

/// The admin site registry.
///
/// # Examples
///
/// ```
/// use adminkit::admin::AdminOptions;
/// use adminkit::model_admin::ModelAdmin;
/// use adminkit::site::AdminSite;
/// use adminkit::store::MemoryStore;
///
/// let mut site = AdminSite::new("admin")
///     .url_prefix("/admin")
///     .permission_scopes(["authenticated"]);
/// site.register(ModelAdmin::new(
///     AdminOptions::new("Catalog", "Products"),
///     MemoryStore::new(["name"]),
/// ))
/// .unwrap();
/// let router = site.into_router().unwrap();
/// # let _: axum::Router = router;
/// ```
pub struct AdminSite {
    name: String,
    url_prefix: String,
    permission_scopes: Vec<String>,
    config: AdminConfig,
    admins: Vec<Arc<dyn Admin>>,
    widgets: Vec<Arc<dyn Widget>>,
}

impl AdminSite {
    /// Creates a site named `name` (the route-name namespace), mounted at `/`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            url_prefix: "/".to_string(),
            permission_scopes: Vec::new(),
            config: AdminConfig::default(),
            admins: Vec::new(),
            widgets: Vec::new(),
        }
    }

    /// Sets the path the site is served under.
    #[must_use]
    pub fn url_prefix(mut self, prefix: &str) -> Self {
        self.url_prefix = prefix.to_string();
        self
    }

    /// Sets the scopes required to see the dashboard.
    #[must_use]
    pub fn permission_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permission_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the site configuration.
    #[must_use]
    pub fn config(mut self, config: AdminConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the site name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the normalised URL prefix (empty for the root).
    pub fn prefix(&self) -> String {
        normalize_prefix(&self.url_prefix)
    }

    /// Registers an admin.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::ImproperlyConfigured`] if the admin's section or
    /// collection name does not make a valid path segment (see
    /// [`checked_segment`]), or another admin already uses its mount point.
    pub fn register<A: Admin>(&mut self, admin: A) -> AdminResult<()> {
        self.register_arc(Arc::new(admin))
    }

    /// Registers an admin that is shared with other code.
    pub fn register_arc(&mut self, admin: Arc<dyn Admin>) -> AdminResult<()> {
        let options = admin.options();
        checked_segment(&options.section_name)?;
        checked_segment(&options.collection_name)?;

        let mount = options.mount_name();
        if self.admins.iter().any(|a| a.options().mount_name() == mount) {
            return Err(AdminError::ImproperlyConfigured(format!(
                "an admin is already registered at '{}'",
                options.mount_point()
            )));
        }

        tracing::debug!(site = %self.name, mount = %options.mount_point(), "registered admin");
        self.admins.push(admin);
        Ok(())
    }

    /// Adds a dashboard widget.
    pub fn register_widget<W: Widget + 'static>(&mut self, widget: W) {
        self.widgets.push(Arc::new(widget));
    }

    /// Returns the number of registered admins.
    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }

    /// Groups the registered admins by section.
    ///
    /// Admins are sorted by collection name, then grouped by section name in
    /// the order sections are first seen.
    pub fn entities_by_section(&self) -> Vec<(String, Vec<Arc<dyn Admin>>)> {
        let mut sorted = self.admins.clone();
        sorted.sort_by(|a, b| a.options().collection_name.cmp(&b.options().collection_name));

        let mut sections: Vec<(String, Vec<Arc<dyn Admin>>)> = Vec::new();
        for admin in sorted {
            let section = &admin.options().section_name;
            if let Some((_, admins)) = sections.iter_mut().find(|(name, _)| name == section) {
                admins.push(admin);
            } else {
                sections.push((section.clone(), vec![admin]));
            }
        }
        sections
    }

    fn url_registry(&self) -> UrlRegistry {
        let mut urls = UrlRegistry::new(&self.url_prefix);
        urls.add(format!("{}:root", self.name), "/");
        if let Some(path) = static_route(&self.config.static_url) {
            urls.add(format!("{}:statics", self.name), format!("{path}/{{file}}"));
        }
        for admin in &self.admins {
            let options = admin.options();
            let mount = options.mount_point();
            let names = UrlNames::new(&self.name, &options.mount_name());
            urls.add(names.list, format!("{mount}/"));
            urls.add(names.create, format!("{mount}/create"));
            urls.add(names.edit, format!("{mount}/{{id}}/edit"));
            urls.add(names.delete, format!("{mount}/{{id}}/delete"));
        }
        urls
    }

    /// Builds the axum router serving the whole site.
    ///
    /// # Errors
    ///
    /// Fails if the templates cannot be loaded or a route cannot be reversed.
    pub fn into_router(self) -> AdminResult<Router> {
        let urls = Arc::new(self.url_registry());
        let templates = Templates::with_urls(&self.config, Arc::clone(&urls))?;
        let prefix = urls.prefix().to_string();

        let mut sections = Vec::new();
        for (section_name, admins) in self.entities_by_section() {
            let mut entities = Vec::new();
            for admin in admins {
                let options = admin.options();
                let names = UrlNames::new(&self.name, &options.mount_name());
                entities.push(EntityEntry {
                    collection_name: options.collection_name.clone(),
                    url: urls.reverse_plain(&names.list)?,
                    active: false,
                });
            }
            sections.push(SectionEntry {
                section_name,
                entities,
            });
        }

        let static_url = match static_route(&self.config.static_url) {
            Some(path) => format!("{prefix}{path}"),
            None => self.config.static_url.trim_end_matches('/').to_string(),
        };

        let signer = if self.config.secret_key.is_empty() {
            tracing::debug!("no secret_key configured, signing messages with a random key");
            MessageSigner::random()
        } else {
            MessageSigner::new(&self.config.secret_key)
        };

        let state = Arc::new(SiteState {
            name: self.name,
            prefix: prefix.clone(),
            permission_scopes: self.permission_scopes,
            static_url,
            config: self.config,
            templates,
            urls,
            sections,
            widgets: self.widgets,
            signer,
        });

        let mut router: Router<Arc<SiteState>> = Router::new();
        if prefix.is_empty() {
            router = router.route("/", get(dashboard));
        } else {
            router = router
                .route(&prefix, get(dashboard))
                .route(&format!("{prefix}/"), get(dashboard));
        }
        if let Some(path) = static_route(&state.config.static_url) {
            router = router.route(&format!("{prefix}{path}/{{file}}"), get(statics));
        }

        let mut router = router.with_state(Arc::clone(&state));
        for admin in self.admins {
            router = router.merge(admin_routes(&admin, &state));
        }

        tracing::info!(
            site = %state.name,
            prefix = %state.cookie_path(),
            routes = state.urls.names().count(),
            "admin site ready"
        );
        Ok(router)
    }

    /// Merges the site's routes into a host application's router.
    pub fn attach(self, app: Router) -> AdminResult<Router> {
        Ok(app.merge(self.into_router()?))
    }
}

impl std::fmt::Debug for AdminSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSite")
            .field("name", &self.name)
            .field("url_prefix", &self.url_prefix)
            .field("admin_count", &self.admins.len())
            .field("widget_count", &self.widgets.len())
            .finish_non_exhaustive()
    }
}

/// One collection link in the navigation.
#[derive(Debug, Clone, Serialize)]
pub struct EntityEntry {
    /// The collection's display name.
    pub collection_name: String,
    /// Its list URL.
    pub url: String,
    /// Whether the current request is inside this collection.
    pub active: bool,
}

/// A navigation section.
#[derive(Debug, Clone, Serialize)]
pub struct SectionEntry {
    /// The section's display name.
    pub section_name: String,
    /// Collections in the section, sorted by name.
    pub entities: Vec<EntityEntry>,
}

/// State shared by every route of a built site.
pub struct SiteState {
    name: String,
    prefix: String,
    permission_scopes: Vec<String>,
    static_url: String,
    config: AdminConfig,
    templates: Templates,
    urls: Arc<UrlRegistry>,
    sections: Vec<SectionEntry>,
    widgets: Vec<Arc<dyn Widget>>,
    signer: MessageSigner,
}

impl std::fmt::Debug for SiteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteState")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("sections", &self.sections)
            .finish_non_exhaustive()
    }
}

impl SiteState {
    /// Returns the site name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the site configuration.
    pub const fn config(&self) -> &AdminConfig {
        &self.config
    }

    /// Returns the named-route registry.
    pub fn urls(&self) -> &UrlRegistry {
        &self.urls
    }

    /// Returns the template engine.
    pub const fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Returns the signer for the flash-message cookie.
    pub const fn signer(&self) -> &MessageSigner {
        &self.signer
    }

    /// Returns the scopes the dashboard requires.
    pub fn permission_scopes(&self) -> &[String] {
        &self.permission_scopes
    }

    /// Builds the context every admin page starts from.
    pub fn get_context(&self, request: &AdminRequest) -> Context {
        let root_url = if self.prefix.is_empty() {
            "/".to_string()
        } else {
            format!("{}/", self.prefix)
        };
        let sections: Vec<SectionEntry> = self
            .sections
            .iter()
            .map(|section| SectionEntry {
                section_name: section.section_name.clone(),
                entities: section
                    .entities
                    .iter()
                    .map(|entity| EntityEntry {
                        active: request.path().starts_with(&entity.url)
                            || request.path() == entity.url.trim_end_matches('/'),
                        ..entity.clone()
                    })
                    .collect(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("site_name", &self.name);
        context.insert("site_title", &self.config.site_title);
        context.insert("logout_url", &self.config.logout_url);
        context.insert("static_url", &self.static_url);
        context.insert("root_url", &root_url);
        context.insert("entities_by_section", &sections);
        context.insert("request_path", request.path());
        context.insert("messages", request.messages());
        context
    }

    /// Renders `template` as an HTML response.
    ///
    /// When the request carried flash messages they have now been displayed,
    /// so the response clears the message cookie.
    pub fn render(
        &self,
        template: &str,
        context: &Context,
        request: &AdminRequest,
    ) -> AdminResult<Response> {
        let html = self.templates.render(template, context)?;
        let mut response = Html(html).into_response();
        if !request.messages().is_empty() {
            messages::append_cookie(
                response.headers_mut(),
                messages::clear_cookie(self.cookie_path()),
            );
        }
        Ok(response)
    }

    /// Builds a `302 Found` redirect that flashes `messages` on the next page.
    pub fn redirect(&self, url: &str, flash: &[Message]) -> Response {
        let mut response = StatusCode::FOUND.into_response();
        if let Ok(location) = HeaderValue::from_str(url) {
            response.headers_mut().insert(LOCATION, location);
        }
        if !flash.is_empty() {
            messages::append_cookie(
                response.headers_mut(),
                self.signer.store_cookie(flash, self.cookie_path()),
            );
        }
        response
    }

    fn cookie_path(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }
}

/// The path segment serving bundled assets, unless `static_url` points
/// elsewhere (an absolute path or full URL).
fn static_route(static_url: &str) -> Option<String> {
    let trimmed = static_url.trim_matches('/');
    if static_url.starts_with('/') || static_url.contains("://") || trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

#[derive(Debug, Clone, Copy)]
enum View {
    List,
    Create,
    Update,
    Delete,
}

impl View {
    const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

fn admin_routes(admin: &Arc<dyn Admin>, state: &Arc<SiteState>) -> Router {
    let mount = format!("{}{}", state.prefix, admin.options().mount_point());

    let without_id = |view: View| {
        let (admin, state) = (Arc::clone(admin), Arc::clone(state));
        move |request: Request| {
            let (admin, state) = (Arc::clone(&admin), Arc::clone(&state));
            async move { dispatch(admin, state, view, None, request).await }
        }
    };
    let with_id = |view: View| {
        let (admin, state) = (Arc::clone(admin), Arc::clone(state));
        move |Path(id): Path<String>, request: Request| {
            let (admin, state) = (Arc::clone(&admin), Arc::clone(&state));
            async move { dispatch(admin, state, view, Some(id), request).await }
        }
    };

    let list = without_id(View::List);
    let create = without_id(View::Create);
    let update = with_id(View::Update);
    let delete = with_id(View::Delete);

    Router::new()
        .route(&mount, get(list.clone()))
        .route(&format!("{mount}/"), get(list))
        .route(&format!("{mount}/create"), get(create.clone()).post(create))
        .route(&format!("{mount}/{{id}}/edit"), get(update.clone()).post(update))
        .route(&format!("{mount}/{{id}}/delete"), get(delete.clone()).post(delete))
}

async fn dispatch(
    admin: Arc<dyn Admin>,
    state: Arc<SiteState>,
    view: View,
    id: Option<String>,
    request: Request,
) -> Response {
    let span = admin_span(
        &admin.options().mount_name(),
        view.as_str(),
        request.method().as_str(),
    );

    async move {
        let mut params = HashMap::new();
        if let Some(id) = id {
            if !admin.options().id_kind.accepts(&id) {
                return AdminError::NotFound(format!("invalid id '{id}'")).into_response();
            }
            params.insert("id".to_string(), id);
        }

        let request = match AdminRequest::from_axum(request, params, &state.signer).await {
            Ok(request) => request,
            Err(err) => return err.into_response(),
        };

        let result = match view {
            View::List => admin.list_view(&state, &request).await,
            View::Create => admin.create_view(&state, &request).await,
            View::Update => admin.update_view(&state, &request).await,
            View::Delete => admin.delete_view(&state, &request).await,
        };
        result.unwrap_or_else(IntoResponse::into_response)
    }
    .instrument(span)
    .await
}

async fn dashboard(State(state): State<Arc<SiteState>>, request: Request) -> Response {
    let span = admin_span("root", "dashboard", request.method().as_str());
    async move {
        let request = match AdminRequest::from_axum(request, HashMap::new(), &state.signer).await {
            Ok(request) => request,
            Err(err) => return err.into_response(),
        };
        render_dashboard(&state, &request).unwrap_or_else(IntoResponse::into_response)
    }
    .instrument(span)
    .await
}

fn render_dashboard(state: &SiteState, request: &AdminRequest) -> AdminResult<Response> {
    if !request
        .credentials()
        .has_required_scope(&state.permission_scopes)
    {
        tracing::warn!(path = request.path(), "permission denied");
        return Err(AdminError::forbidden(&state.permission_scopes));
    }

    let widgets = state
        .widgets
        .iter()
        .map(|widget| widget.render(&state.templates))
        .collect::<AdminResult<Vec<_>>>()?;

    let mut context = state.get_context(request);
    context.insert("widgets", &widgets);
    state.render("root.html", &context, request)
}

async fn statics(Path(file): Path<String>) -> Response {
    match templates::static_asset(&file) {
        Some((content_type, body)) => (
            [
                (CONTENT_TYPE, HeaderValue::from_static(content_type)),
                (CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600")),
            ],
            body,
        )
            .into_response(),
        None => AdminError::NotFound(format!("no static file '{file}'")).into_response(),
    }
}
