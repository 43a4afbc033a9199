//! Template loading and rendering.
//!
//! The admin ships a complete set of Tera templates compiled into the
//! binary. A `template_dir` in [`AdminConfig`] may override any of them by
//! file name (e.g. a custom `list.html`); templates missing from that
//! directory fall back to the bundled ones.
//!
//! Templates can reverse named routes with the `url_for` function:
//!
//! ```text
//! <a href="{{ url_for(name=url_names.edit, id=object.id) }}">Edit</a>
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tera::{Context, Tera, Value};

use crate::config::AdminConfig;
use crate::error::{AdminError, AdminResult};
use crate::forms::escape_html;
use crate::routing::UrlRegistry;

const BUNDLED: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("root.html", include_str!("../templates/root.html")),
    ("list.html", include_str!("../templates/list.html")),
    ("create.html", include_str!("../templates/create.html")),
    ("update.html", include_str!("../templates/update.html")),
    ("delete.html", include_str!("../templates/delete.html")),
    ("partials/form.html", include_str!("../templates/partials/form.html")),
    ("partials/messages.html", include_str!("../templates/partials/messages.html")),
    ("partials/pagination.html", include_str!("../templates/partials/pagination.html")),
    ("partials/widget.html", include_str!("../templates/partials/widget.html")),
];

const STATICS: &[(&str, &str, &str)] = &[
    ("admin.css", "text/css; charset=utf-8", include_str!("../static/admin.css")),
    ("admin.js", "text/javascript; charset=utf-8", include_str!("../static/admin.js")),
];

/// Looks up a bundled static asset, returning its content type and body.
pub fn static_asset(file: &str) -> Option<(&'static str, &'static str)> {
    STATICS
        .iter()
        .find(|(name, _, _)| *name == file)
        .map(|(_, content_type, body)| (*content_type, *body))
}

/// The template engine used by every admin view.
#[derive(Clone)]
pub struct Templates {
    tera: Arc<Tera>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("templates", &self.tera.get_template_names().count())
            .finish()
    }
}

impl Templates {
    /// Loads the bundled templates and any overrides from `config.template_dir`.
    pub fn new(config: &AdminConfig) -> AdminResult<Self> {
        Ok(Self {
            tera: Arc::new(Self::load(config, None)?),
        })
    }

    /// Loads templates and registers `url_for` backed by `urls`.
    pub fn with_urls(config: &AdminConfig, urls: Arc<UrlRegistry>) -> AdminResult<Self> {
        Ok(Self {
            tera: Arc::new(Self::load(config, Some(urls))?),
        })
    }

    fn load(config: &AdminConfig, urls: Option<Arc<UrlRegistry>>) -> AdminResult<Tera> {
        let mut bundled = Tera::default();
        bundled.add_raw_templates(BUNDLED.iter().copied())?;

        let mut tera = match &config.template_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(AdminError::ImproperlyConfigured(format!(
                        "template directory '{}' does not exist",
                        dir.display()
                    )));
                }
                let pattern = format!("{}/**/*.html", dir.display());
                let mut custom = Tera::parse(&pattern)?;
                tracing::debug!(
                    dir = %dir.display(),
                    count = custom.get_template_names().count(),
                    "loaded template overrides"
                );
                custom.extend(&bundled)?;
                custom
            }
            None => bundled,
        };
        tera.autoescape_on(vec![".html"]);
        // Keep `/` readable in rendered URLs.
        tera.set_escape_fn(escape_html);

        if let Some(urls) = urls {
            tera.register_function("url_for", move |args: &HashMap<String, Value>| {
                url_for(&urls, args)
            });
        }
        Ok(tera)
    }

    /// Renders `name` with `context`.
    pub fn render(&self, name: &str, context: &Context) -> AdminResult<String> {
        self.tera.render(name, context).map_err(|err| {
            tracing::error!(template = name, error = ?err, "template rendering failed");
            AdminError::from(err)
        })
    }

    /// Returns whether a template with this name is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|loaded| loaded == name)
    }
}

fn url_for(urls: &UrlRegistry, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let name = args
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("url_for requires a `name` argument"))?;

    let values: Vec<(&str, String)> = args
        .iter()
        .filter(|(key, _)| key.as_str() != "name")
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.as_str(), text)
        })
        .collect();
    let params: HashMap<&str, &str> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();

    urls.reverse(name, &params)
        .map(Value::String)
        .map_err(|err| tera::Error::msg(err.to_string()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_bundled_templates_load() {
        let templates = Templates::new(&AdminConfig::default()).unwrap();
        for (name, _) in BUNDLED {
            assert!(templates.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_widget_partial_renders() {
        let templates = Templates::new(&AdminConfig::default()).unwrap();
        let mut ctx = Context::new();
        ctx.insert("icon", "fa fa-cog");
        ctx.insert("value", "<42>");
        ctx.insert("text", "Answer");
        let html = templates.render("partials/widget.html", &ctx).unwrap();
        assert!(html.contains("&lt;42&gt;"));
        assert!(html.contains("Answer"));
    }

    #[test]
    fn test_url_for_function() {
        let mut urls = UrlRegistry::new("/admin");
        urls.add("admin:basic_demos_edit", "/basic/demos/{id}/edit");
        let templates =
            Templates::with_urls(&AdminConfig::default(), Arc::new(urls)).unwrap();

        let mut tera = (*templates.tera).clone();
        tera.add_raw_template("link.html", r#"{{ url_for(name="admin:basic_demos_edit", id=7) }}"#)
            .unwrap();
        let html = tera.render("link.html", &Context::new()).unwrap();
        assert_eq!(html, "/admin/basic/demos/7/edit");
    }

    #[test]
    fn test_missing_template_dir_is_rejected() {
        let config = AdminConfig {
            template_dir: Some(PathBuf::from("/definitely/not/here")),
            ..AdminConfig::default()
        };
        assert!(matches!(
            Templates::new(&config),
            Err(AdminError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_template_dir_overrides_bundled() {
        let dir = std::env::temp_dir().join(format!("adminkit-templates-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("root.html"), "custom dashboard").unwrap();

        let config = AdminConfig {
            template_dir: Some(dir.clone()),
            ..AdminConfig::default()
        };
        let templates = Templates::new(&config).unwrap();
        let html = templates.render("root.html", &Context::new()).unwrap();
        assert_eq!(html, "custom dashboard");
        assert!(templates.contains("list.html"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_static_assets() {
        let (content_type, body) = static_asset("admin.css").unwrap();
        assert!(content_type.starts_with("text/css"));
        assert!(!body.is_empty());
        assert!(static_asset("admin.js").is_some());
        assert!(static_asset("../Cargo.toml").is_none());
    }
}
