//! Stock implementations of the four admin views.
//!
//! These are free functions so that an [`Admin`] overriding a view can still
//! fall back to the default flow.

use std::collections::HashMap;

use axum::response::Response;
use serde::Serialize;
use serde_json::Value;
use tera::Context;

use crate::admin::{display_label, missing_form, record_id, Admin, AdminOptions};
use crate::error::{AdminError, AdminResult};
use crate::forms::FormSpec;
use crate::messages::{self, Message};
use crate::pagination::{Page, PageRangeItem, PaginationError, Paginator};
use crate::request::{AdminRequest, OrderDirection};
use crate::routing::UrlNames;
use crate::site::SiteState;

/// Pages shown on each side of the current one in the pagination bar.
const PAGES_ON_EACH_SIDE: usize = 2;
/// Pages shown at each end of the pagination bar.
const PAGES_ON_ENDS: usize = 2;

/// A sortable list column.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    /// Record key.
    pub name: String,
    /// Header text.
    pub label: String,
    /// Link toggling the ordering, when ordering is enabled.
    pub url: Option<String>,
    /// Whether the list is currently ordered by this column.
    pub active: bool,
    /// Current direction when active.
    pub direction: OrderDirection,
}

/// One record as displayed in the list table.
#[derive(Debug, Clone, Serialize)]
pub struct Row {
    /// The record id, if any.
    pub id: Option<String>,
    /// The record's display label.
    pub label: String,
    /// Cell text for each list column.
    pub cells: Vec<String>,
    /// Edit link.
    pub edit_url: Option<String>,
    /// Delete link.
    pub delete_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct PageLink {
    number: Option<usize>,
    url: Option<String>,
    current: bool,
}

#[derive(Debug, Clone, Serialize)]
struct PaginationLinks {
    previous_url: Option<String>,
    next_url: Option<String>,
    links: Vec<PageLink>,
}

#[derive(Debug, Clone, Serialize)]
struct PaginatorSummary {
    count: usize,
    num_pages: usize,
    per_page: usize,
}

/// Builds the context shared by every view of an admin.
pub fn admin_context(
    options: &AdminOptions,
    site: &SiteState,
    request: &AdminRequest,
) -> AdminResult<Context> {
    let url_names = UrlNames::new(site.name(), &options.mount_name());
    let mut context = site.get_context(request);
    context.insert("collection_name", &options.collection_name);
    context.insert("section_name", &options.section_name);
    context.insert("list_url", &site.urls().reverse_plain(&url_names.list)?);
    context.insert("create_url", &site.urls().reverse_plain(&url_names.create)?);
    context.insert("can_create", &options.create_form.is_some());
    context.insert("url_names", &url_names);
    context.insert("extra_css_urls", &options.extra_css_urls);
    context.insert("extra_js_urls", &options.extra_js_urls);
    Ok(context)
}

/// Returns the requested page of `objects`.
///
/// The page number comes from the `page` query parameter; anything that is
/// not a number means page 1. Numbers below 1 or past the last page,
/// including ones too large to represent, are a 404.
pub fn paginate(
    options: &AdminOptions,
    request: &AdminRequest,
    objects: Vec<Value>,
) -> AdminResult<(Paginator<Value>, Page<Value>)> {
    let per_page = options.paginate_by.unwrap_or_else(|| objects.len().max(1));
    let paginator = Paginator::new(objects, per_page);

    let requested = request.query("page").map_or("1", str::trim);
    let digits = requested.strip_prefix(['-', '+']).unwrap_or(requested);
    let page = if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        paginator.page(1)
    } else if requested.starts_with('-') {
        Err(PaginationError::InvalidPage(
            "That page number is less than 1".to_string(),
        ))
    } else {
        digits
            .parse::<usize>()
            .map_or(Err(PaginationError::EmptyPage), |n| paginator.page(n))
    }
    .map_err(|err| AdminError::InvalidPage {
        page: requested.to_string(),
        reason: err.to_string(),
    })?;
    Ok((paginator, page))
}

/// The stock list view.
pub async fn list_view<A: Admin + ?Sized>(
    admin: &A,
    site: &SiteState,
    request: &AdminRequest,
) -> AdminResult<Response> {
    let options = admin.options();
    require_scope(admin, request).await?;

    let mut context = admin.get_context(site, request)?;
    context.insert("list_field_names", &options.list_field_names);
    context.insert("search_enabled", &options.search_enabled);
    context.insert("search", &request.query("search"));
    context.insert("order_enabled", &options.order_enabled);
    context.insert("order_by", &request.query("order_by"));
    context.insert("order_direction", &request.query("order_direction"));
    context.insert("columns", &columns(options, request));

    let objects = admin.get_list_objects(request).await?;

    let list_objects = if options.paginate_by.is_some() {
        let (paginator, page) = admin.paginate(request, objects)?;
        let range =
            paginator.elided_page_range(page.number(), PAGES_ON_EACH_SIDE, PAGES_ON_ENDS);
        context.insert("pagination", &pagination_links(request, &range, &page));
        context.insert("page_obj", &page.summary(range));
        context.insert(
            "paginator",
            &PaginatorSummary {
                count: paginator.count(),
                num_pages: paginator.num_pages(),
                per_page: paginator.per_page(),
            },
        );
        context.insert("is_paginated", &page.has_other_pages());
        page.into_object_list()
    } else {
        context.insert("paginator", &Value::Null);
        context.insert("page_obj", &Value::Null);
        context.insert("is_paginated", &false);
        objects
    };

    context.insert("rows", &rows(options, site, &list_objects)?);
    context.insert("list_objects", &list_objects);
    site.render(&options.list_template, &context, request)
}

/// The stock create view.
pub async fn create_view<A: Admin + ?Sized>(
    admin: &A,
    site: &SiteState,
    request: &AdminRequest,
) -> AdminResult<Response> {
    let options = admin.options();
    require_scope(admin, request).await?;
    let spec = options.create_form.as_ref().ok_or_else(|| missing_form("create"))?;
    let mut context = admin.get_context(site, request)?;

    if !request.is_post() {
        let form = admin.get_form(spec, None, None);
        context.insert("form", &form.context());
        return site.render(&options.create_template, &context, request);
    }

    let mut form = admin
        .get_form(spec, None, Some(request.form_data()))
        .with_files(request.files());
    if !form.validate() {
        context.insert("form", &form.context());
        return site.render(&options.create_template, &context, request);
    }

    admin.do_create(&form, request).await?;
    tracing::info!(collection = %options.collection_name, "record created");
    redirect_to_list(options, site, Message::success(messages::CREATED))
}

/// The stock update view.
pub async fn update_view<A: Admin + ?Sized>(
    admin: &A,
    site: &SiteState,
    request: &AdminRequest,
) -> AdminResult<Response> {
    let options = admin.options();
    require_scope(admin, request).await?;
    let spec = options.update_form.as_ref().ok_or_else(|| missing_form("update"))?;
    let instance = admin.get_object(request).await?;
    let mut context = object_context(admin, site, request, &instance)?;

    if !request.is_post() {
        let form = admin.get_form(spec, Some(&instance), None);
        context.insert("form", &form.context());
        return site.render(&options.update_template, &context, request);
    }

    let mut form = admin
        .get_form(spec, Some(&instance), Some(request.form_data()))
        .with_files(request.files());
    if !form.validate() {
        context.insert("form", &form.context());
        return site.render(&options.update_template, &context, request);
    }

    admin.do_update(&instance, &form, request).await?;
    tracing::info!(
        collection = %options.collection_name,
        id = request.path_param("id").unwrap_or_default(),
        "record updated"
    );
    redirect_to_list(options, site, Message::success(messages::UPDATED))
}

/// The stock delete view.
pub async fn delete_view<A: Admin + ?Sized>(
    admin: &A,
    site: &SiteState,
    request: &AdminRequest,
) -> AdminResult<Response> {
    let options = admin.options();
    require_scope(admin, request).await?;
    let spec: &FormSpec = options.delete_form.as_ref().ok_or_else(|| missing_form("delete"))?;
    let instance = admin.get_object(request).await?;
    let mut context = object_context(admin, site, request, &instance)?;

    if !request.is_post() {
        let form = admin.get_form(spec, Some(&instance), None);
        context.insert("form", &form.context());
        return site.render(&options.delete_template, &context, request);
    }

    let mut form = admin
        .get_form(spec, Some(&instance), Some(request.form_data()))
        .with_files(request.files());
    if !form.validate() {
        context.insert("form", &form.context());
        return site.render(&options.delete_template, &context, request);
    }

    let message = match admin.do_delete(&instance, &form, request).await {
        Ok(()) => {
            tracing::info!(
                collection = %options.collection_name,
                id = request.path_param("id").unwrap_or_default(),
                "record deleted"
            );
            Message::success(messages::DELETED)
        }
        Err(AdminError::Integrity(reason)) => {
            tracing::warn!(collection = %options.collection_name, %reason, "delete rejected");
            Message::error(messages::DELETE_REFERENCED)
        }
        Err(err) => return Err(err),
    };
    redirect_to_list(options, site, message)
}

async fn require_scope<A: Admin + ?Sized>(admin: &A, request: &AdminRequest) -> AdminResult<()> {
    if admin.has_required_scope(request).await {
        return Ok(());
    }
    let options = admin.options();
    tracing::warn!(
        collection = %options.collection_name,
        path = request.path(),
        "permission denied"
    );
    Err(AdminError::forbidden(&options.permission_scopes))
}

fn object_context<A: Admin + ?Sized>(
    admin: &A,
    site: &SiteState,
    request: &AdminRequest,
    instance: &Value,
) -> AdminResult<Context> {
    let options = admin.options();
    let mut context = admin.get_context(site, request)?;
    context.insert("object", instance);
    context.insert("object_label", &display_label(instance));

    let id = request
        .path_param("id")
        .map(str::to_string)
        .or_else(|| record_id(instance));
    if let Some(id) = id {
        let names = UrlNames::new(site.name(), &options.mount_name());
        let params = HashMap::from([("id", id.as_str())]);
        context.insert("edit_url", &site.urls().reverse(&names.edit, &params)?);
        context.insert("delete_url", &site.urls().reverse(&names.delete, &params)?);
    }
    Ok(context)
}

fn redirect_to_list(
    options: &AdminOptions,
    site: &SiteState,
    message: Message,
) -> AdminResult<Response> {
    let names = UrlNames::new(site.name(), &options.mount_name());
    let url = site.urls().reverse_plain(&names.list)?;
    Ok(site.redirect(&url, &[message]))
}

fn columns(options: &AdminOptions, request: &AdminRequest) -> Vec<Column> {
    let current = request.query("order_by");
    let direction = request
        .query("order_direction")
        .map(OrderDirection::parse)
        .unwrap_or_default();

    options
        .list_field_names
        .iter()
        .map(|name| {
            let active = options.order_enabled && current == Some(name.as_str());
            let url = options.order_enabled.then(|| {
                let next = if active {
                    direction.toggled()
                } else {
                    OrderDirection::Asc
                };
                format!(
                    "?{}",
                    request.query_string_replacing(&[
                        ("page", None),
                        ("order_by", Some(name)),
                        ("order_direction", Some(next.as_str())),
                    ])
                )
            });
            Column {
                name: name.clone(),
                label: column_label(name),
                url,
                active,
                direction,
            }
        })
        .collect()
}

fn column_label(name: &str) -> String {
    let text = name.replace('_', " ");
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn rows(options: &AdminOptions, site: &SiteState, objects: &[Value]) -> AdminResult<Vec<Row>> {
    let names = UrlNames::new(site.name(), &options.mount_name());
    objects
        .iter()
        .map(|record| {
            let id = record_id(record);
            let (edit_url, delete_url) = match &id {
                Some(id) => {
                    let params = HashMap::from([("id", id.as_str())]);
                    (
                        Some(site.urls().reverse(&names.edit, &params)?),
                        Some(site.urls().reverse(&names.delete, &params)?),
                    )
                }
                None => (None, None),
            };
            Ok(Row {
                label: display_label(record),
                cells: options
                    .list_field_names
                    .iter()
                    .map(|field| cell_text(record.get(field)))
                    .collect(),
                id,
                edit_url,
                delete_url,
            })
        })
        .collect()
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell_text(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

fn pagination_links(
    request: &AdminRequest,
    range: &[PageRangeItem],
    page: &Page<Value>,
) -> PaginationLinks {
    let link = |number: usize| {
        format!("?{}", request.query_string_with("page", Some(&number.to_string())))
    };
    PaginationLinks {
        previous_url: page.previous_page_number().map(link),
        next_url: page.next_page_number().map(link),
        links: range
            .iter()
            .map(|item| match item {
                PageRangeItem::Page(number) => PageLink {
                    number: Some(*number),
                    url: Some(link(*number)),
                    current: *number == page.number(),
                },
                PageRangeItem::Ellipsis => PageLink {
                    number: None,
                    url: None,
                    current: false,
                },
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn demo_records(count: usize) -> Vec<Value> {
        (1..=count)
            .map(|i| json!({"id": i, "name": format!("Record {i:02}")}))
            .collect()
    }

    #[test]
    fn test_paginate_defaults_to_first_page() {
        let options = AdminOptions::new("Basic", "Demos").paginate_by(10);
        let request = AdminRequest::get("/basic/demos/").with_query("page", "abc");
        let (paginator, page) = paginate(&options, &request, demo_records(15)).unwrap();
        assert_eq!(paginator.num_pages(), 2);
        assert_eq!(page.number(), 1);
        assert_eq!(page.object_list().len(), 10);
    }

    #[test]
    fn test_paginate_out_of_range() {
        let options = AdminOptions::new("Basic", "Demos").paginate_by(10);
        let request = AdminRequest::get("/basic/demos/").with_query("page", "3");
        let err = paginate(&options, &request, demo_records(15)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid page 3: That page contains no results");
    }

    #[test]
    fn test_paginate_negative_page() {
        let options = AdminOptions::new("Basic", "Demos").paginate_by(10);
        let request = AdminRequest::get("/basic/demos/").with_query("page", "-1");
        let err = paginate(&options, &request, demo_records(15)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid page -1: That page number is less than 1"
        );
    }

    #[test]
    fn test_paginate_overflowing_page_is_not_found() {
        let options = AdminOptions::new("Basic", "Demos").paginate_by(10);
        let request = AdminRequest::get("/basic/demos/")
            .with_query("page", "99999999999999999999999999");
        let err = paginate(&options, &request, demo_records(15)).unwrap_err();
        assert!(matches!(err, AdminError::InvalidPage { .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_paginate_explicit_plus_sign() {
        let options = AdminOptions::new("Basic", "Demos").paginate_by(10);
        let request = AdminRequest::get("/basic/demos/").with_query("page", "+2");
        let (_, page) = paginate(&options, &request, demo_records(15)).unwrap();
        assert_eq!(page.number(), 2);
    }

    #[test]
    fn test_columns_toggle_direction() {
        let options = AdminOptions::new("Basic", "Demos")
            .list_field_names(["name", "created_at"])
            .order_enabled(true);
        let request = AdminRequest::get("/basic/demos/")
            .with_query_string("order_by=name&order_direction=asc&page=2&search=rec");
        let cols = columns(&options, &request);

        assert!(cols[0].active);
        assert_eq!(
            cols[0].url.as_deref(),
            Some("?search=rec&order_by=name&order_direction=desc")
        );
        assert!(!cols[1].active);
        assert_eq!(cols[1].label, "Created at");
        assert_eq!(
            cols[1].url.as_deref(),
            Some("?search=rec&order_by=created_at&order_direction=asc")
        );
    }

    #[test]
    fn test_columns_without_ordering_have_no_links() {
        let options = AdminOptions::new("Basic", "Demos").list_field_names(["name"]);
        let cols = columns(&options, &AdminRequest::get("/"));
        assert!(cols[0].url.is_none());
        assert!(!cols[0].active);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!("x"))), "x");
        assert_eq!(cell_text(Some(&json!(["a", "b"]))), "a, b");
        assert_eq!(cell_text(Some(&json!(true))), "true");
        assert_eq!(cell_text(Some(&json!(12))), "12");
    }
}
