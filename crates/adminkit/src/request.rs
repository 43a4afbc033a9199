//! The request view handed to admin views.
//!
//! [`AdminRequest`] is a small, owned snapshot of an incoming request: the
//! method, path, query string, path parameters, decoded form body (urlencoded
//! or multipart, with any [`UploadedFile`]s), the caller's [`AuthCredentials`]
//! and any flash messages carried over from the previous response. Views and
//! `Admin` hooks only ever see this type, which keeps them independent of
//! axum's extractor machinery and easy to test.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use axum::body::to_bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use serde::Serialize;

use crate::error::{AdminError, AdminResult};
use crate::messages::{Message, MessageSigner};

/// Largest form body accepted by the create/edit/delete views.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// Who is making the request and what they may do.
///
/// Host applications insert this into the request extensions from their
/// authentication middleware. Requests without it carry no scopes.
///
/// # Examples
///
/// ```
/// use adminkit::request::AuthCredentials;
///
/// let creds = AuthCredentials::new(["authenticated"]).with_user("John Smith");
/// assert!(creds.has_scope("authenticated"));
/// assert!(creds.has_required_scope(&["authenticated".to_string()]));
/// assert!(!creds.has_required_scope(&["staff".to_string()]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthCredentials {
    scopes: BTreeSet<String>,
    user: Option<String>,
}

impl AuthCredentials {
    /// Creates credentials carrying the given scopes.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
            user: None,
        }
    }

    /// Attaches the display name of the authenticated user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Returns the authenticated user's display name, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns whether the credentials carry `scope`.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Returns whether every scope in `required` is present.
    pub fn has_required_scope(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }
}

/// A file submitted through a `multipart/form-data` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The filename as sent by the browser.
    pub filename: String,
    /// The declared MIME type.
    pub content_type: String,
    /// The file contents.
    pub content: Vec<u8>,
}

impl UploadedFile {
    /// Creates an upload.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Returns the size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Sort direction requested by the list view's column headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending order (the default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Parses a query-string value; anything but `desc` is ascending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Returns the query-string spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// An owned snapshot of one request to the admin.
#[derive(Debug, Clone)]
pub struct AdminRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    path_params: HashMap<String, String>,
    form: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
    credentials: AuthCredentials,
    messages: Vec<Message>,
}

impl AdminRequest {
    /// Creates a request with no query, body, credentials or messages.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            path_params: HashMap::new(),
            form: Vec::new(),
            files: Vec::new(),
            credentials: AuthCredentials::default(),
            messages: Vec::new(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Converts an axum request.
    ///
    /// Urlencoded and multipart bodies are decoded into form data; flash
    /// messages are read from the cookie `signer` verifies.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::UnsupportedMediaType`] for a `POST` whose body
    /// is some other content type, and [`AdminError::BadRequest`] when the
    /// body cannot be read.
    pub async fn from_axum(
        request: Request,
        path_params: HashMap<String, String>,
        signer: &MessageSigner,
    ) -> AdminResult<Self> {
        let credentials = request
            .extensions()
            .get::<AuthCredentials>()
            .cloned()
            .unwrap_or_default();
        let messages = signer.from_headers(request.headers());
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut admin_request = Self::new(request.method().clone(), request.uri().path())
            .with_query_string(request.uri().query().unwrap_or_default())
            .with_credentials(credentials)
            .with_messages(messages);
        admin_request.path_params = path_params;

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let bytes = to_bytes(request.into_body(), MAX_FORM_BYTES)
                .await
                .map_err(|e| AdminError::BadRequest(format!("unreadable form body: {e}")))?;
            admin_request.form = parse_pairs(&bytes);
        } else if content_type.starts_with("multipart/form-data") {
            admin_request.read_multipart(request).await?;
        } else if admin_request.is_post() && !content_type.is_empty() {
            return Err(AdminError::UnsupportedMediaType(content_type));
        }

        Ok(admin_request)
    }

    async fn read_multipart(&mut self, request: Request) -> AdminResult<()> {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(bad_multipart)?;

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let content = field.bytes().await.map_err(bad_multipart)?;
                    // An untouched file input still submits an empty part.
                    if filename.is_empty() && content.is_empty() {
                        continue;
                    }
                    self.files
                        .push((name, UploadedFile::new(filename, content_type, content.to_vec())));
                }
                None => {
                    let value = field.text().await.map_err(bad_multipart)?;
                    self.form.push((name, value));
                }
            }
        }
        Ok(())
    }

    /// Replaces the query parameters with those parsed from `query`.
    #[must_use]
    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query = parse_pairs(query.as_bytes());
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a path parameter (e.g. the `id` of edit/delete routes).
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Replaces the submitted form data with a urlencoded body.
    #[must_use]
    pub fn with_form_body(mut self, body: &str) -> Self {
        self.form = parse_pairs(body.as_bytes());
        self
    }

    /// Adds a single submitted form value.
    #[must_use]
    pub fn with_form_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Adds an uploaded file under the form field `name`.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.push((name.into(), file));
        self
    }

    /// Sets the caller's credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: AuthCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the flash messages carried by the request.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns whether this is a form submission.
    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the first value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns all query parameters in order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns a path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Parses the `id` path parameter.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] when the parameter is missing or does
    /// not parse, mirroring a route that did not match.
    pub fn id<T: FromStr>(&self) -> AdminResult<T> {
        let raw = self
            .path_param("id")
            .ok_or_else(|| AdminError::NotFound("missing object id".to_string()))?;
        raw.parse()
            .map_err(|_| AdminError::NotFound(format!("invalid object id '{raw}'")))
    }

    /// Returns the submitted form data in order, repeated keys included.
    pub fn form_data(&self) -> &[(String, String)] {
        &self.form
    }

    /// Returns the uploaded files in order, keyed by form field.
    pub fn files(&self) -> &[(String, UploadedFile)] {
        &self.files
    }

    /// Returns the caller's credentials.
    pub const fn credentials(&self) -> &AuthCredentials {
        &self.credentials
    }

    /// Returns the flash messages carried by the request.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the `search` query parameter, trimmed and lowercased.
    pub fn search_term(&self) -> Option<String> {
        self.query("search")
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
    }

    /// Returns the requested `order_by` and `order_direction`.
    pub fn ordering(&self, default_field: &str) -> (String, OrderDirection) {
        let field = self
            .query("order_by")
            .filter(|field| !field.is_empty())
            .unwrap_or(default_field)
            .to_string();
        let direction = self
            .query("order_direction")
            .map(OrderDirection::parse)
            .unwrap_or_default();
        (field, direction)
    }

    /// Rebuilds the query string, replacing or dropping `name`.
    pub fn query_string_with(&self, name: &str, value: Option<&str>) -> String {
        self.query_string_replacing(&[(name, value)])
    }

    /// Rebuilds the query string with several parameters replaced or dropped.
    ///
    /// Parameters named in `changes` are removed from the current query and
    /// re-appended, in order, when their value is `Some`.
    pub fn query_string_replacing(&self, changes: &[(&str, Option<&str>)]) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, existing) in self
            .query
            .iter()
            .filter(|(key, _)| !changes.iter().any(|(name, _)| key == name))
        {
            serializer.append_pair(key, existing);
        }
        for (name, value) in changes {
            if let Some(value) = value {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }
}

fn bad_multipart(err: impl std::fmt::Display) -> AdminError {
    AdminError::BadRequest(format!("unreadable multipart body: {err}"))
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
