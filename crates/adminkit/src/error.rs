//! Error types for adminkit.
//!
//! Every fallible operation in the crate returns [`AdminError`]. Each variant
//! maps to an HTTP status code via [`AdminError::status_code`], and the type
//! implements [`IntoResponse`] so view handlers can propagate errors with `?`
//! and still produce a request-scoped error page.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::forms::escape_html;

/// The primary error type for adminkit.
#[derive(Error, Debug)]
pub enum AdminError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 403, raised when the request lacks a required scope.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 404 for a page number the paginator rejected.
    #[error("Invalid page {page}: {reason}")]
    InvalidPage {
        /// The requested page, as written in the query string.
        page: String,
        /// Why the paginator rejected it.
        reason: String,
    },

    /// HTTP 415, raised for a form body that is neither urlencoded nor
    /// multipart.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A create/update/delete view was reached without a form configured.
    #[error("No form configured for the {view} view")]
    MissingForm {
        /// The view name (`create`, `update` or `delete`).
        view: &'static str,
    },

    /// The admin site or one of its admins is misconfigured.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// The configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // ── Storage ──────────────────────────────────────────────────────

    /// A constraint (foreign key, unique, not null) rejected a write.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// A generic storage error.
    #[error("Database error: {0}")]
    Database(String),

    // ── Rendering ────────────────────────────────────────────────────

    /// A template failed to parse or render.
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdminError {
    /// Returns the HTTP status code that corresponds to this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::InvalidPage { .. } => StatusCode::NOT_FOUND,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Integrity(_) => StatusCode::CONFLICT,
            Self::MissingForm { .. }
            | Self::ImproperlyConfigured(_)
            | Self::Config(_)
            | Self::Database(_)
            | Self::Template(_)
            | Self::Serialization(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a permission failure on the given scopes.
    pub fn forbidden(scopes: &[String]) -> Self {
        Self::PermissionDenied(format!("missing required scopes [{}]", scopes.join(", ")))
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "admin request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "admin request rejected");
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        let body = format!(
            "<!DOCTYPE html>\n<html><head><title>{code} {reason}</title></head>\
             <body><h1>{code} {reason}</h1><p>{detail}</p></body></html>",
            code = status.as_u16(),
            detail = escape_html(&self.to_string()),
        );
        (status, Html(body)).into_response()
    }
}

/// Convenience alias used throughout the crate.
pub type AdminResult<T> = Result<T, AdminError>;
