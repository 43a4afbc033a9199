//! Route naming and URL reversal.
//!
//! Every admin is mounted at `/{section}/{collection}` below the site prefix,
//! and each of its four views gets a name of the form
//! `"{site}:{section}_{collection}_{view}"`. The [`UrlRegistry`] maps those
//! names to path templates so views and templates can reverse them.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

use crate::error::{AdminError, AdminResult};

/// Bytes escaped when a value is substituted into one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Turns a display name into a path segment: spaces removed, lowercased.
///
/// ```
/// use adminkit::routing::path_segment;
///
/// assert_eq!(path_segment("System Settings"), "systemsettings");
/// ```
pub fn path_segment(name: &str) -> String {
    name.replace(' ', "").to_lowercase()
}

/// Returns the path segment for `name` if it can be routed as a literal.
///
/// Segments are limited to ASCII letters, digits and `-_.~`, and must hold at
/// least one letter or digit.
///
/// # Errors
///
/// Returns [`AdminError::ImproperlyConfigured`] naming the offending
/// character.
///
/// ```
/// use adminkit::routing::checked_segment;
///
/// assert_eq!(checked_segment("Audit Log").unwrap(), "auditlog");
/// assert!(checked_segment("*Archive").is_err());
/// ```
pub fn checked_segment(name: &str) -> AdminResult<String> {
    let segment = path_segment(name);
    if let Some(bad) = segment
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | '~'))
    {
        return Err(AdminError::ImproperlyConfigured(format!(
            "'{name}' cannot be used in a URL: '{bad}' is not allowed in a path segment"
        )));
    }
    if !segment.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(AdminError::ImproperlyConfigured(format!(
            "'{name}' needs at least one letter or digit to be used in a URL"
        )));
    }
    Ok(segment)
}

/// Returns the mount point for a section/collection pair.
pub fn mount_point(section_name: &str, collection_name: &str) -> String {
    format!(
        "/{}/{}",
        path_segment(section_name),
        path_segment(collection_name)
    )
}

/// Returns the route-name stem for a section/collection pair.
pub fn mount_name(section_name: &str, collection_name: &str) -> String {
    format!(
        "{}_{}",
        path_segment(section_name),
        path_segment(collection_name)
    )
}

/// How the `{id}` path segment of edit/delete routes is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    /// Only non-negative integers match; anything else is a 404.
    #[default]
    Int,
    /// Any non-empty segment matches.
    Str,
}

impl IdKind {
    /// Returns whether `segment` is an acceptable id for this kind.
    pub fn accepts(self, segment: &str) -> bool {
        match self {
            Self::Int => !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()),
            Self::Str => !segment.is_empty(),
        }
    }
}

/// The four route names of one admin, as exposed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlNames {
    /// `"{site}:{mount}_list"`.
    pub list: String,
    /// `"{site}:{mount}_create"`.
    pub create: String,
    /// `"{site}:{mount}_edit"`.
    pub edit: String,
    /// `"{site}:{mount}_delete"`.
    pub delete: String,
}

impl UrlNames {
    /// Derives the route names for an admin mounted as `mount` on `site`.
    pub fn new(site: &str, mount: &str) -> Self {
        Self {
            list: format!("{site}:{mount}_list"),
            create: format!("{site}:{mount}_create"),
            edit: format!("{site}:{mount}_edit"),
            delete: format!("{site}:{mount}_delete"),
        }
    }
}

/// Maps route names to path templates with `{param}` placeholders.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use adminkit::routing::UrlRegistry;
///
/// let mut urls = UrlRegistry::new("/admin");
/// urls.add("admin:basic_demos_edit", "/basic/demos/{id}/edit");
///
/// let params = HashMap::from([("id", "3")]);
/// assert_eq!(
///     urls.reverse("admin:basic_demos_edit", &params).unwrap(),
///     "/admin/basic/demos/3/edit"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct UrlRegistry {
    prefix: String,
    routes: BTreeMap<String, String>,
}

impl UrlRegistry {
    /// Creates an empty registry whose reversed paths start with `prefix`.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            routes: BTreeMap::new(),
        }
    }

    /// Returns the normalised prefix (no trailing slash, empty for root).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers a named path template, relative to the prefix.
    pub fn add(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.routes.insert(name.into(), template.into());
    }

    /// Returns whether a route name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Returns every registered route name, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Builds the path for `name`, substituting every `{param}` placeholder.
    ///
    /// Values are percent-encoded as single path segments, so an id holding
    /// `/` or `?` still routes back to the same view.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::NotFound`] if the name is unknown or a
    /// placeholder has no value in `params`.
    pub fn reverse<S: BuildHasher>(
        &self,
        name: &str,
        params: &HashMap<&str, &str, S>,
    ) -> AdminResult<String> {
        let template = self
            .routes
            .get(name)
            .ok_or_else(|| AdminError::NotFound(format!("no route named '{name}'")))?;

        let mut path = self.prefix.clone();
        let mut rest = template.as_str();
        while let Some(open) = rest.find('{') {
            path.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                AdminError::ImproperlyConfigured(format!("unclosed placeholder in '{template}'"))
            })?;
            let param = &after[..close];
            let value = params.get(param).ok_or_else(|| {
                AdminError::NotFound(format!("route '{name}' needs parameter '{param}'"))
            })?;
            path.extend(utf8_percent_encode(value, PATH_SEGMENT));
            rest = &after[close + 1..];
        }
        path.push_str(rest);

        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }

    /// Reverses a route that takes no parameters.
    pub fn reverse_plain(&self, name: &str) -> AdminResult<String> {
        self.reverse(name, &HashMap::<&str, &str>::new())
    }
}

/// Normalises a mount prefix: leading slash, no trailing slash, `""` for root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
