//! Dashboard widgets.
//!
//! A widget is a small tile on the admin dashboard showing an icon, a value
//! and a caption. Implementors usually only override [`Widget::context`].

use serde::Serialize;

use crate::error::AdminResult;
use crate::templates::Templates;

/// The values a widget template displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetContext {
    /// Font Awesome icon classes.
    pub icon: String,
    /// The headline value.
    pub value: String,
    /// Caption below the value.
    pub text: String,
}

impl WidgetContext {
    /// Creates a widget context.
    pub fn new(icon: impl Into<String>, value: impl ToString, text: impl Into<String>) -> Self {
        Self {
            icon: icon.into(),
            value: value.to_string(),
            text: text.into(),
        }
    }
}

impl Default for WidgetContext {
    fn default() -> Self {
        Self::new("fa fa-cog", 0, "Some text")
    }
}

/// A dashboard tile.
pub trait Widget: Send + Sync {
    /// Template used to render the tile.
    fn template(&self) -> &str {
        "partials/widget.html"
    }

    /// Values shown on the tile, computed at render time.
    fn context(&self) -> WidgetContext {
        WidgetContext::default()
    }

    /// Renders the tile to HTML.
    fn render(&self, templates: &Templates) -> AdminResult<String> {
        let context = tera::Context::from_serialize(self.context())?;
        templates.render(self.template(), &context)
    }
}
