//! # adminkit demo
//!
//! Serves an admin site with three collections and a small dashboard:
//!
//! - **Basic / Demos**: 15 in-memory records showing every form widget
//! - **SQLite / Demos**: rows of an in-memory `SQLite` table
//! - **Settings / System Settings**: a single editable settings row
//!
//! Every request is treated as signed in as "John Smith" with the
//! `authenticated` scope, which the site requires.
//!
//! ## Running
//!
//! ```bash
//! cargo run --package admin-demo -- --config demos/admin-demo/demo.toml
//! ```

mod admin;
mod widgets;

use std::path::PathBuf;

use adminkit::config::AdminConfig;
use adminkit::logging::setup_logging;
use adminkit::request::AuthCredentials;
use adminkit::site::AdminSite;
use anyhow::Context as _;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;

use crate::admin::{open_demo_database, sqlite_demos, DemoAdmin, SystemSettingsAdmin};
use crate::widgets::{DayOfYear, Time, Today};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "admin-demo", about = "Run the adminkit demo site")]
struct Args {
    /// TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Enable debug mode (pretty logs).
    #[arg(long)]
    debug: bool,
}

/// Signs every request in with the `authenticated` scope.
async fn dummy_auth(mut request: Request, next: Next) -> Response {
    request
        .extensions_mut()
        .insert(AuthCredentials::new(["authenticated"]).with_user("John Smith"));
    next.run(request).await
}

async fn build_site(config: AdminConfig) -> anyhow::Result<AdminSite> {
    let conn = open_demo_database().await?;

    let mut site = AdminSite::new("admin")
        .permission_scopes(["authenticated"])
        .config(config);
    site.register(DemoAdmin::new())?;
    site.register(sqlite_demos(conn.clone()).await?)?;
    site.register(SystemSettingsAdmin::new(conn).await?)?;
    site.register_widget(Today);
    site.register_widget(Time);
    site.register_widget(DayOfYear);
    Ok(site)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AdminConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AdminConfig::default(),
    }
    .with_env_overrides();
    config.debug |= args.debug;
    setup_logging(&config);

    let site = build_site(config).await?;
    tracing::info!(?site, "admin site configured");

    let app = site
        .attach(Router::new().route("/health", get(|| async { "ok" })))?
        .layer(middleware::from_fn(dummy_auth))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind to {}", args.bind))?;
    tracing::info!("Starting admin demo at http://{}/", args.bind);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::LOCATION;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;

    async fn app() -> Router {
        build_site(AdminConfig::default())
            .await
            .unwrap()
            .into_router()
            .unwrap()
            .layer(middleware::from_fn(dummy_auth))
    }

    #[tokio::test]
    async fn test_dashboard_is_reachable_when_signed_in() {
        let response = app()
            .await
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_settings_list_redirects_to_edit() {
        let response = app()
            .await
            .oneshot(
                Request::get("/settings/systemsettings/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/settings/systemsettings/1/edit");
    }
}
