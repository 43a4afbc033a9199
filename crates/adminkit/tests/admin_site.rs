//! End-to-end tests driving a built admin site through its axum router:
//! dashboard, list/search/order/pagination, the create/edit/delete flows,
//! flash messages, permissions, id matching, uploads and static assets.

use adminkit::admin::AdminOptions;
use adminkit::forms::{FieldSpec, FormSpec};
use adminkit::model_admin::ModelAdmin;
use adminkit::request::AuthCredentials;
use adminkit::routing::IdKind;
use adminkit::site::AdminSite;
use adminkit::store::sqlite::{execute_batch, open_database};
use adminkit::store::{MemoryStore, ModelStore, SqliteStore};
use adminkit::widgets::{Widget, WidgetContext};
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Helpers ─────────────────────────────────────────────────────────

struct RecordCount;

impl Widget for RecordCount {
    fn context(&self) -> WidgetContext {
        WidgetContext::new("fa fa-list", 15, "Demo records")
    }
}

fn demo_store() -> MemoryStore {
    MemoryStore::with_rows(
        ["name", "description"],
        (1..=15)
            .map(|i| {
                json!({
                    "name": format!("Record {i:02}"),
                    "description": format!("Description {i}"),
                })
            })
            .collect(),
    )
}

fn demo_admin(store: MemoryStore) -> ModelAdmin<MemoryStore> {
    let form = FormSpec::new(vec![
        FieldSpec::text("name"),
        FieldSpec::textarea("description").optional(),
    ]);
    ModelAdmin::new(
        AdminOptions::new("Basic", "Demos")
            .list_field_names(["name", "description"])
            .paginate_by(10)
            .search_enabled(true)
            .order_enabled(true)
            .create_form(form.clone())
            .update_form(form)
            .delete_form(FormSpec::empty()),
        store,
    )
    .search_fields(["name", "description"])
}

fn build_app(store: MemoryStore) -> Router {
    let mut site = AdminSite::new("admin").url_prefix("/admin");
    site.register(demo_admin(store)).unwrap();
    site.register_widget(RecordCount);
    site.into_router().unwrap()
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl TestResponse {
    fn cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    fn message_cookie(&self) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|c| c.starts_with("adminkit_messages=") && !c.contains("Max-Age=0"))
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_form(app: &Router, uri: &str, body: &str) -> TestResponse {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

// ═════════════════════════════════════════════════════════════════════
// Dashboard and navigation
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_dashboard_renders_widgets_and_menu() {
    let app = build_app(demo_store());
    for uri in ["/admin", "/admin/"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert!(response.body.contains("Dashboard"));
        assert!(response.body.contains("Demo records"));
        assert!(response.body.contains("fa fa-list"));
        assert!(response.body.contains("/admin/basic/demos/"));
        assert!(response.body.contains("Basic"));
    }
}

#[tokio::test]
async fn test_dashboard_requires_site_scopes() {
    let mut site = AdminSite::new("admin").permission_scopes(["authenticated"]);
    site.register(demo_admin(demo_store())).unwrap();
    let app = site.into_router().unwrap();

    assert_eq!(get(&app, "/").await.status, StatusCode::FORBIDDEN);

    let mut request = Request::get("/").body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(AuthCredentials::new(["authenticated"]).with_user("John Smith"));
    assert_eq!(send(&app, request).await.status, StatusCode::OK);
}

// ═════════════════════════════════════════════════════════════════════
// List view
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_list_with_and_without_trailing_slash() {
    let app = build_app(demo_store());
    for uri in ["/admin/basic/demos", "/admin/basic/demos/"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert!(response.body.contains("Record 01"));
        assert!(response.body.contains("Record 10"));
        assert!(!response.body.contains("Record 11"));
        assert!(response.body.contains("Showing 1 to 10 of 15"));
        assert!(response.body.contains("/admin/basic/demos/create"));
        assert!(response.body.contains("/admin/basic/demos/1/edit"));
        assert!(response.body.contains("/admin/basic/demos/1/delete"));
    }
}

#[tokio::test]
async fn test_list_second_page() {
    let app = build_app(demo_store());
    let response = get(&app, "/admin/basic/demos/?page=2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Record 11"));
    assert!(response.body.contains("Record 15"));
    assert!(!response.body.contains("Record 10"));
    assert!(response.body.contains("Showing 11 to 15 of 15"));
}

#[tokio::test]
async fn test_list_invalid_pages_are_not_found() {
    let app = build_app(demo_store());
    assert_eq!(
        get(&app, "/admin/basic/demos/?page=3").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&app, "/admin/basic/demos/?page=-1").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&app, "/admin/basic/demos/?page=nope").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_list_search() {
    let app = build_app(demo_store());
    let response = get(&app, "/admin/basic/demos/?search=record+03").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Record 03"));
    assert!(!response.body.contains("Record 04"));
    assert!(response.body.contains(r#"value="record 03""#));
}

#[tokio::test]
async fn test_list_ordering() {
    let app = build_app(demo_store());
    let response = get(
        &app,
        "/admin/basic/demos/?order_by=name&order_direction=desc",
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Record 15"));
    assert!(!response.body.contains("Record 01"));
    let first = response.body.find("Record 15").unwrap();
    let second = response.body.find("Record 14").unwrap();
    assert!(first < second);
    assert!(response.body.contains("order_by=name&amp;order_direction=asc"));
}

// ═════════════════════════════════════════════════════════════════════
// Create view
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_form_renders() {
    let app = build_app(demo_store());
    let response = get(&app, "/admin/basic/demos/create").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(r#"name="name""#));
    assert!(response.body.contains(r#"name="description""#));
}

#[tokio::test]
async fn test_create_invalid_rerenders_with_errors() {
    let store = demo_store();
    let app = build_app(store.clone());
    let response = post_form(&app, "/admin/basic/demos/create", "name=&description=x").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("This field is required."));
    assert_eq!(store.len().await, 15);
}

#[tokio::test]
async fn test_create_redirects_and_flashes_once() {
    let store = demo_store();
    let app = build_app(store.clone());

    let response = post_form(
        &app,
        "/admin/basic/demos/create",
        "name=Record+16&description=Fresh",
    )
    .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.headers[LOCATION], "/admin/basic/demos/");
    assert_eq!(store.len().await, 16);
    let created = store.get("16").await.unwrap().unwrap();
    assert_eq!(created["name"], "Record 16");
    assert_eq!(created["description"], "Fresh");

    let cookie = response.message_cookie().expect("message cookie");
    let request = Request::get("/admin/basic/demos/")
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let shown = send(&app, request).await;
    assert_eq!(shown.status, StatusCode::OK);
    assert!(shown.body.contains("Created successfully"));
    assert!(shown
        .cookies()
        .iter()
        .any(|c| c.starts_with("adminkit_messages=;") && c.contains("Max-Age=0")));

    let again = get(&app, "/admin/basic/demos/").await;
    assert!(!again.body.contains("Created successfully"));
}

#[tokio::test]
async fn test_unsupported_method_is_rejected() {
    let app = build_app(demo_store());
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/admin/basic/demos/create")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::METHOD_NOT_ALLOWED);
}

// ═════════════════════════════════════════════════════════════════════
// Edit and delete views
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_edit_prefills_and_updates() {
    let store = demo_store();
    let app = build_app(store.clone());

    let response = get(&app, "/admin/basic/demos/3/edit").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Record 03"));
    assert!(response.body.contains("/admin/basic/demos/3/delete"));

    let response = post_form(
        &app,
        "/admin/basic/demos/3/edit",
        "name=Renamed&description=Changed",
    )
    .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.headers[LOCATION], "/admin/basic/demos/");
    assert!(response.message_cookie().is_some());

    let updated: Value = store.get("3").await.unwrap().unwrap();
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["description"], "Changed");
    assert_eq!(updated["id"], 3);
}

#[tokio::test]
async fn test_bad_and_missing_ids_are_not_found() {
    let app = build_app(demo_store());
    assert_eq!(
        get(&app, "/admin/basic/demos/abc/edit").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&app, "/admin/basic/demos/99/edit").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&app, "/admin/basic/demos/99/delete").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_delete_confirms_then_deletes() {
    let store = demo_store();
    let app = build_app(store.clone());

    let response = get(&app, "/admin/basic/demos/5/delete").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Are you sure"));
    assert!(response.body.contains("Record 05"));
    assert_eq!(store.len().await, 15);

    let response = post_form(&app, "/admin/basic/demos/5/delete", "").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(store.len().await, 14);
    assert!(store.get("5").await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_form_is_server_error() {
    let mut site = AdminSite::new("admin");
    site.register(ModelAdmin::new(
        AdminOptions::new("Basic", "Readonly"),
        MemoryStore::new(["name"]),
    ))
    .unwrap();
    let app = site.into_router().unwrap();

    assert_eq!(get(&app, "/basic/readonly/").await.status, StatusCode::OK);
    assert_eq!(
        get(&app, "/basic/readonly/create").await.status,
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// ═════════════════════════════════════════════════════════════════════
// Permissions
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_admin_scopes_guard_every_view() {
    let mut site = AdminSite::new("admin");
    site.register(ModelAdmin::new(
        AdminOptions::new("Private", "Notes")
            .permission_scopes(["authenticated", "admin"])
            .create_form(FormSpec::new(vec![FieldSpec::text("name")])),
        MemoryStore::with_rows(["name"], vec![json!({"name": "secret"})]),
    ))
    .unwrap();
    let app = site.into_router().unwrap();

    for uri in ["/private/notes/", "/private/notes/create", "/private/notes/1/edit"] {
        assert_eq!(get(&app, uri).await.status, StatusCode::FORBIDDEN, "{uri}");
    }

    let mut request = Request::get("/private/notes/").body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(AuthCredentials::new(["authenticated"]));
    assert_eq!(send(&app, request).await.status, StatusCode::FORBIDDEN);

    let mut request = Request::get("/private/notes/").body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(AuthCredentials::new(["authenticated", "admin"]));
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("secret"));
}

// ═════════════════════════════════════════════════════════════════════
// Statics and hosting
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_static_assets() {
    let app = build_app(demo_store());
    let css = get(&app, "/admin/statics/admin.css").await;
    assert_eq!(css.status, StatusCode::OK);
    assert!(css.headers[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/css"));

    let js = get(&app, "/admin/statics/admin.js").await;
    assert_eq!(js.status, StatusCode::OK);

    assert_eq!(
        get(&app, "/admin/statics/missing.js").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_attach_keeps_host_routes() {
    let host = Router::new().route("/health", axum::routing::get(|| async { "ok" }));
    let mut site = AdminSite::new("admin").url_prefix("/admin");
    site.register(demo_admin(demo_store())).unwrap();
    let app = site.attach(host).unwrap();

    let health = get(&app, "/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body, "ok");
    assert_eq!(get(&app, "/admin/basic/demos/").await.status, StatusCode::OK);
    assert_eq!(get(&app, "/basic/demos/").await.status, StatusCode::NOT_FOUND);
}

// ═════════════════════════════════════════════════════════════════════
// Reserved characters, uploads, failure paths
// ═════════════════════════════════════════════════════════════════════

const DRAFT_ID: &str = "reports/2026?draft #1";

fn string_id_app(store: MemoryStore) -> Router {
    let form = FormSpec::new(vec![FieldSpec::text("title")]);
    let mut site = AdminSite::new("admin").url_prefix("/admin");
    site.register(ModelAdmin::new(
        AdminOptions::new("Docs", "Files")
            .id_kind(IdKind::Str)
            .list_field_names(["title"])
            .update_form(form)
            .delete_form(FormSpec::empty()),
        store,
    ))
    .unwrap();
    site.into_router().unwrap()
}

#[tokio::test]
async fn test_string_id_with_reserved_characters_round_trips() {
    let store = MemoryStore::with_rows(["title"], vec![json!({"id": DRAFT_ID, "title": "Draft"})]);
    let app = string_id_app(store.clone());
    let edit_url = "/admin/docs/files/reports%2F2026%3Fdraft%20%231/edit";

    let list = get(&app, "/admin/docs/files/").await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(list.body.contains(edit_url), "{}", list.body);

    let edit = get(&app, edit_url).await;
    assert_eq!(edit.status, StatusCode::OK);
    assert!(edit.body.contains("Draft"));

    let response = post_form(&app, edit_url, "title=Final").await;
    assert_eq!(response.status, StatusCode::FOUND);
    let saved = store.get(DRAFT_ID).await.unwrap().unwrap();
    assert_eq!(saved["title"], "Final");
}

#[tokio::test]
async fn test_invalid_update_rerenders_without_saving() {
    let store = demo_store();
    let app = build_app(store.clone());

    let response = post_form(&app, "/admin/basic/demos/3/edit", "name=&description=Changed").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("This field is required."));
    assert!(response.message_cookie().is_none());

    let record = store.get("3").await.unwrap().unwrap();
    assert_eq!(record["name"], "Record 03");
    assert_eq!(record["description"], "Description 3");
}

#[tokio::test]
async fn test_delete_blocked_by_reference_flashes_error() {
    let conn = open_database(":memory:").unwrap();
    execute_batch(
        &conn,
        "CREATE TABLE author (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT NOT NULL,
             author_id INTEGER NOT NULL REFERENCES author(id));
         INSERT INTO author (id, name) VALUES (1, 'Le Guin');
         INSERT INTO book (title, author_id) VALUES ('The Dispossessed', 1);",
    )
    .await
    .unwrap();
    let authors = SqliteStore::new(conn, "author").await.unwrap();

    let mut site = AdminSite::new("admin").url_prefix("/admin");
    site.register(ModelAdmin::new(
        AdminOptions::new("Library", "Authors").delete_form(FormSpec::empty()),
        authors.clone(),
    ))
    .unwrap();
    let app = site.into_router().unwrap();

    let response = post_form(&app, "/admin/library/authors/1/delete", "").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.headers[LOCATION], "/admin/library/authors/");
    let cookie = response.message_cookie().expect("flash cookie");

    let request = Request::get("/admin/library/authors/")
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let list = send(&app, request).await;
    assert!(list
        .body
        .contains("Could not be deleted due to being referenced by a related object"));
    assert!(authors.get("1").await.unwrap().is_some());
}

fn upload_app(store: MemoryStore) -> Router {
    let form = FormSpec::new(vec![
        FieldSpec::text("name"),
        FieldSpec::file("attachment").optional(),
    ]);
    let mut site = AdminSite::new("admin").url_prefix("/admin");
    site.register(ModelAdmin::new(
        AdminOptions::new("Basic", "Uploads").create_form(form),
        store,
    ))
    .unwrap();
    site.into_router().unwrap()
}

#[tokio::test]
async fn test_multipart_create_stores_upload_metadata() {
    let store = MemoryStore::new(["name", "attachment"]);
    let app = upload_app(store.clone());

    let page = get(&app, "/admin/basic/uploads/create").await;
    assert!(page.body.contains(r#"enctype="multipart/form-data""#));
    assert!(page.body.contains(r#"type="file""#));

    let body = "--XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"name\"\r\n\r\n\
        Quarterly\r\n\
        --XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"attachment\"; filename=\"q1.txt\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        revenue up\r\n\
        --XBOUNDARY--\r\n";
    let request = Request::post("/admin/basic/uploads/create")
        .header(CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from(body))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::FOUND);

    let created = store.get("1").await.unwrap().unwrap();
    assert_eq!(created["name"], "Quarterly");
    assert_eq!(created["attachment"]["filename"], "q1.txt");
    assert_eq!(created["attachment"]["content_type"], "text/plain");
    assert_eq!(created["attachment"]["size"], 10);
}

#[tokio::test]
async fn test_json_post_is_unsupported_media_type() {
    let store = MemoryStore::new(["name", "attachment"]);
    let app = upload_app(store.clone());

    let request = Request::post("/admin/basic/uploads/create")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "Quarterly"}"#))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_create_link_only_shown_with_create_form() {
    let app = build_app(demo_store());
    let list = get(&app, "/admin/basic/demos/").await;
    assert!(list.body.contains("/admin/basic/demos/create"));

    let mut site = AdminSite::new("admin");
    site.register(ModelAdmin::new(
        AdminOptions::new("Basic", "Readonly").list_field_names(["name"]),
        MemoryStore::with_rows(["name"], vec![json!({"name": "fixed"})]),
    ))
    .unwrap();
    let app = site.into_router().unwrap();
    let list = get(&app, "/basic/readonly/").await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(list.body.contains("fixed"));
    assert!(!list.body.contains("/basic/readonly/create"));
}

#[tokio::test]
async fn test_overflowing_page_number_is_not_found() {
    let app = build_app(demo_store());
    for page in ["99999999999999999999999", "18446744073709551616", "3"] {
        let response = get(&app, &format!("/admin/basic/demos/?page={page}")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "page={page}");
    }
}

#[tokio::test]
async fn test_message_cookie_from_another_site_is_ignored() {
    let app = build_app(demo_store());
    let response = post_form(&app, "/admin/basic/demos/create", "name=Signed").await;
    let cookie = response.message_cookie().expect("flash cookie");

    let request = Request::get("/admin/basic/demos/")
        .header(COOKIE, cookie.clone())
        .body(Body::empty())
        .unwrap();
    assert!(send(&app, request).await.body.contains("Created successfully"));

    let other = build_app(demo_store());
    let request = Request::get("/admin/basic/demos/")
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    assert!(!send(&other, request).await.body.contains("Created successfully"));
}
