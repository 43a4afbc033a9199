//! # adminkit
//!
//! A pluggable admin panel for axum applications. Register one [`Admin`] per
//! collection on an [`AdminSite`], and the site generates list, create, edit
//! and delete pages for each, grouped into sections with a shared navigation
//! menu and a widget dashboard.
//!
//! ## Modules
//!
//! - [`site`] - Admin registry and router generation
//! - [`admin`] - The `Admin` trait and its options
//! - [`model_admin`] - A generic `Admin` over a [`store::ModelStore`]
//! - [`views`] - Stock list/create/update/delete flows
//! - [`store`] - In-memory and `SQLite` record stores
//! - [`forms`] - Declarative forms, validation and widgets
//! - [`pagination`] - Page slicing and elided page ranges
//! - [`templates`] - Bundled Tera templates and static assets
//! - [`routing`] - Mount points, route names and URL reversal
//! - [`request`] - Request snapshots and auth credentials
//! - [`messages`] - Cookie-backed flash messages
//! - [`widgets`] - Dashboard widgets
//! - [`config`] - Site configuration
//! - [`logging`] - Tracing setup and spans
//! - [`error`] - Error types and result alias

pub mod admin;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod messages;
pub mod model_admin;
pub mod pagination;
pub mod request;
pub mod routing;
pub mod site;
pub mod store;
pub mod templates;
pub mod views;
pub mod widgets;

// Re-export the most commonly used types at the crate root.
pub use admin::{Admin, AdminOptions};
pub use config::AdminConfig;
pub use error::{AdminError, AdminResult};
pub use forms::{FieldSpec, Form, FormSpec};
pub use model_admin::ModelAdmin;
pub use messages::MessageSigner;
pub use request::{AdminRequest, AuthCredentials, UploadedFile};
pub use site::{AdminSite, SiteState};
pub use widgets::{Widget, WidgetContext};
