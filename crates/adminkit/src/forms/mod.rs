//! Declarative forms for the create, update and delete views.
//!
//! A [`FormSpec`] describes the fields of a form once; the views build a
//! fresh [`Form`] from it for every request, seeded with the record being
//! edited and, on `POST`, the submitted data. [`Form::validate`] cleans every
//! field into a JSON value and collects per-field errors, and
//! [`Form::context`] produces the rendered widgets for the templates.
//!
//! # Examples
//!
//! ```
//! use adminkit::forms::{FieldSpec, Form, FormSpec};
//!
//! let spec = FormSpec::new(vec![
//!     FieldSpec::text("name"),
//!     FieldSpec::integer("quantity").optional(),
//! ]);
//!
//! let submitted = vec![("name".to_string(), "Bolt".to_string())];
//! let mut form = Form::new(&spec, None, Some(&submitted));
//! assert!(form.validate());
//! assert_eq!(form.data()["name"], "Bolt");
//! assert!(form.data()["quantity"].is_null());
//! ```

pub mod widgets;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::request::UploadedFile;

/// Error shown for a missing required value.
pub const REQUIRED: &str = "This field is required.";
/// Error shown for a JSON field that does not parse.
pub const INVALID_JSON: &str = "This field contains invalid JSON";

/// A `(value, label)` option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Submitted value.
    pub value: String,
    /// Displayed label.
    pub label: String,
}

impl Choice {
    /// Creates a choice.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Builds choices whose value and label are the same text.
    pub fn same<I, S>(values: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .map(|v| Self::new(v.as_ref(), v.as_ref()))
            .collect()
    }
}

/// The type of a form field and its type-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Multi-line text.
    TextArea,
    /// Password input with a show/hide toggle; never echoes its value.
    Password,
    /// Whole number.
    Integer,
    /// Checkbox.
    Boolean,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// Drop-down with one selectable value.
    Select {
        /// Available options.
        choices: Vec<Choice>,
    },
    /// Dual-list picker selecting several values.
    SelectMultiple {
        /// Available options.
        choices: Vec<Choice>,
    },
    /// List of checkboxes selecting several values.
    CheckboxMultiple {
        /// Available options.
        choices: Vec<Choice>,
    },
    /// List of radio buttons selecting one value.
    Radio {
        /// Available options.
        choices: Vec<Choice>,
    },
    /// Free-form list of strings, submitted as a JSON array.
    Tags,
    /// Arbitrary JSON document.
    Json,
    /// File upload. Cleans to the upload's metadata; the bytes stay
    /// available from [`Form::files`].
    File {
        /// Whether several files may be chosen at once.
        multiple: bool,
    },
}

/// Definition of a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// The field name (HTML name attribute and record key).
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Parsing and rendering behaviour.
    pub kind: FieldKind,
    /// Whether an empty value is rejected.
    pub required: bool,
    /// Initial value for new records.
    pub default: Option<Value>,
    /// Help text displayed under the field.
    pub help_text: String,
    /// Extra HTML attributes for the widget.
    pub attrs: Vec<(String, String)>,
}

impl FieldSpec {
    /// Creates a required field. The label is derived from the name.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let label = default_label(&name);
        Self {
            name,
            label,
            kind,
            required: true,
            default: None,
            help_text: String::new(),
            attrs: Vec::new(),
        }
    }

    /// A single-line text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// A multi-line text field.
    pub fn textarea(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::TextArea)
    }

    /// A password field.
    pub fn password(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Password)
    }

    /// An integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// A checkbox field. Optional unless marked required.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean).optional()
    }

    /// A date field.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    /// A drop-down field.
    pub fn select(name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::new(name, FieldKind::Select { choices })
    }

    /// A dual-list multi-select field.
    pub fn select_multiple(name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::new(name, FieldKind::SelectMultiple { choices })
    }

    /// A checkbox-list field.
    pub fn checkbox_multiple(name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::new(name, FieldKind::CheckboxMultiple { choices })
    }

    /// A radio-list field.
    pub fn radio(name: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self::new(name, FieldKind::Radio { choices })
    }

    /// A tags field. Optional, defaulting to an empty list.
    pub fn tags(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Tags)
            .optional()
            .default(Value::Array(Vec::new()))
    }

    /// A single-file upload field.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::File { multiple: false })
    }

    /// A multi-file upload field.
    pub fn files(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::File { multiple: true })
    }

    /// A raw JSON field.
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the initial value for new records.
    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Adds an HTML attribute to the rendered widget.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Cleans the raw submitted values into a JSON value.
    fn clean(&self, raw: &[String]) -> Result<Value, String> {
        let first = raw.first().map_or("", String::as_str);
        match &self.kind {
            FieldKind::Text | FieldKind::TextArea | FieldKind::Password => {
                if self.required && first.trim().is_empty() {
                    return Err(REQUIRED.to_string());
                }
                Ok(Value::String(first.to_string()))
            }
            FieldKind::Integer => {
                if first.trim().is_empty() {
                    return if self.required {
                        Err(REQUIRED.to_string())
                    } else {
                        Ok(Value::Null)
                    };
                }
                first
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| "Not a valid integer value.".to_string())
            }
            FieldKind::Boolean => {
                let checked = !matches!(first, "" | "false");
                if self.required && !checked {
                    return Err(REQUIRED.to_string());
                }
                Ok(Value::Bool(checked))
            }
            FieldKind::Date => {
                if first.trim().is_empty() {
                    return if self.required {
                        Err(REQUIRED.to_string())
                    } else {
                        Ok(Value::Null)
                    };
                }
                chrono::NaiveDate::parse_from_str(first.trim(), "%Y-%m-%d")
                    .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                    .map_err(|_| "Not a valid date value.".to_string())
            }
            FieldKind::Select { choices } | FieldKind::Radio { choices } => {
                if self.required && first.is_empty() {
                    return Err(REQUIRED.to_string());
                }
                if !first.is_empty() && !choices.iter().any(|c| c.value == first) {
                    return Err("Not a valid choice".to_string());
                }
                Ok(Value::String(first.to_string()))
            }
            FieldKind::SelectMultiple { choices } | FieldKind::CheckboxMultiple { choices } => {
                if self.required && raw.is_empty() {
                    return Err(REQUIRED.to_string());
                }
                if let Some(bad) = raw.iter().find(|v| !choices.iter().any(|c| &c.value == *v)) {
                    return Err(format!("'{bad}' is not a valid choice for this field."));
                }
                Ok(Value::Array(raw.iter().cloned().map(Value::String).collect()))
            }
            FieldKind::Tags => {
                let tags = parse_json_or_empty(first)?;
                match &tags {
                    Value::Array(items) if items.iter().all(Value::is_string) => {
                        if self.required && items.is_empty() {
                            return Err(REQUIRED.to_string());
                        }
                        Ok(tags)
                    }
                    _ => Err(INVALID_JSON.to_string()),
                }
            }
            FieldKind::Json => {
                let value = parse_json_or_empty(first)?;
                if self.required && is_empty_json(&value) {
                    return Err(REQUIRED.to_string());
                }
                Ok(value)
            }
            FieldKind::File { .. } => self
                .clean_upload(&[], raw)
                .map(|value| value.unwrap_or(Value::Null)),
        }
    }

    /// Cleans an upload field. `current` holds the filenames already stored.
    ///
    /// Returns `None` when nothing was uploaded over an existing file, which
    /// leaves the stored value untouched.
    fn clean_upload(
        &self,
        uploads: &[UploadedFile],
        current: &[String],
    ) -> Result<Option<Value>, String> {
        let multiple = matches!(self.kind, FieldKind::File { multiple: true });
        if uploads.is_empty() {
            return if !current.is_empty() {
                Ok(None)
            } else if self.required {
                Err(REQUIRED.to_string())
            } else {
                Ok(Some(Value::Null))
            };
        }

        let meta = |file: &UploadedFile| {
            json!({
                "filename": file.filename,
                "content_type": file.content_type,
                "size": file.size(),
            })
        };
        if multiple {
            Ok(Some(Value::Array(uploads.iter().map(meta).collect())))
        } else if uploads.len() > 1 {
            Err("Only one file may be uploaded.".to_string())
        } else {
            Ok(uploads.first().map(meta))
        }
    }

    /// Converts a stored value into the raw strings a widget displays.
    fn raw_from_value(&self, value: &Value) -> Vec<String> {
        match (&self.kind, value) {
            (_, Value::Null) => Vec::new(),
            (FieldKind::Tags | FieldKind::Json, value) => {
                if is_empty_json(value) {
                    Vec::new()
                } else {
                    vec![value.to_string()]
                }
            }
            (FieldKind::File { .. }, Value::Object(meta)) => {
                meta.get("filename").map(scalar_to_string).into_iter().collect()
            }
            (FieldKind::File { .. }, Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.get("filename"))
                .map(scalar_to_string)
                .collect(),
            (FieldKind::Boolean, Value::Bool(checked)) => {
                if *checked {
                    vec!["y".to_string()]
                } else {
                    Vec::new()
                }
            }
            (_, Value::Array(items)) => items.iter().map(scalar_to_string).collect(),
            (_, value) => vec![scalar_to_string(value)],
        }
    }
}

/// An ordered set of field definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSpec {
    fields: Vec<FieldSpec>,
}

impl FormSpec {
    /// Creates a spec from field definitions.
    pub const fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// A form without fields, used to confirm deletes.
    pub const fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the field definitions.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the field names.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns whether the form must be submitted as `multipart/form-data`.
    pub fn is_multipart(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f.kind, FieldKind::File { .. }))
    }
}

/// A form instance bound to one request.
#[derive(Debug, Clone)]
pub struct Form {
    spec: FormSpec,
    bound: bool,
    raw: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
    errors: BTreeMap<String, Vec<String>>,
    data: Map<String, Value>,
}

impl Form {
    /// Builds a form from `spec`.
    ///
    /// `initial` is the record being edited (a JSON object); fields absent
    /// from it fall back to their defaults. When `submitted` is given the form
    /// is bound and the submitted values replace the initial ones entirely,
    /// except for file fields, which keep showing the stored file.
    pub fn new(
        spec: &FormSpec,
        initial: Option<&Value>,
        submitted: Option<&[(String, String)]>,
    ) -> Self {
        let mut raw: HashMap<String, Vec<String>> = HashMap::new();
        for field in spec.fields() {
            let is_file = matches!(field.kind, FieldKind::File { .. });
            let values = match submitted.filter(|_| !is_file) {
                Some(pairs) => pairs
                    .iter()
                    .filter(|(key, _)| *key == field.name)
                    .map(|(_, value)| value.clone())
                    .collect(),
                None => initial
                    .and_then(|record| record.get(&field.name))
                    .or(field.default.as_ref())
                    .map(|value| field.raw_from_value(value))
                    .unwrap_or_default(),
            };
            raw.insert(field.name.clone(), values);
        }

        Self {
            spec: spec.clone(),
            bound: submitted.is_some(),
            raw,
            files: HashMap::new(),
            errors: BTreeMap::new(),
            data: Map::new(),
        }
    }

    /// Attaches uploaded files, keyed by form field.
    #[must_use]
    pub fn with_files(mut self, files: &[(String, UploadedFile)]) -> Self {
        for (name, file) in files {
            self.files
                .entry(name.clone())
                .or_default()
                .push(file.clone());
        }
        self
    }

    /// Returns the files uploaded to field `name`.
    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// Returns whether the form was built from submitted data.
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    /// Cleans every field. Returns `true` when no field has errors.
    ///
    /// Unbound forms never validate.
    pub fn validate(&mut self) -> bool {
        self.errors.clear();
        self.data.clear();
        if !self.bound {
            return false;
        }

        for field in self.spec.fields() {
            let raw = self.raw.get(&field.name).map_or(&[][..], Vec::as_slice);
            let cleaned = if matches!(field.kind, FieldKind::File { .. }) {
                field.clean_upload(self.files(&field.name), raw)
            } else {
                field.clean(raw).map(Some)
            };
            match cleaned {
                Ok(Some(value)) => {
                    self.data.insert(field.name.clone(), value);
                }
                Ok(None) => {}
                Err(message) => {
                    self.errors
                        .entry(field.name.clone())
                        .or_default()
                        .push(message);
                }
            }
        }
        self.errors.is_empty()
    }

    /// Records an error against a field (or `"__all__"` for the whole form).
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns per-field errors from the last validation.
    pub const fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Returns the cleaned data from the last validation.
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns the [`FormSpec`] the form was built from.
    pub const fn spec(&self) -> &FormSpec {
        &self.spec
    }

    /// Renders every field for the templates.
    pub fn context(&self) -> FormContext {
        let fields = self
            .spec
            .fields()
            .iter()
            .map(|field| {
                let raw = self.raw.get(&field.name).map_or(&[][..], Vec::as_slice);
                RenderedField {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    required: field.required,
                    help_text: field.help_text.clone(),
                    html: widgets::render(field, raw),
                    errors: self.errors.get(&field.name).cloned().unwrap_or_default(),
                }
            })
            .collect();

        FormContext {
            fields,
            multipart: self.spec.is_multipart(),
            non_field_errors: self.errors.get("__all__").cloned().unwrap_or_default(),
            has_errors: !self.errors.is_empty(),
        }
    }
}

/// A form as seen by the templates.
#[derive(Debug, Clone, Serialize)]
pub struct FormContext {
    /// Rendered fields in declaration order.
    pub fields: Vec<RenderedField>,
    /// Whether the form needs `enctype="multipart/form-data"`.
    pub multipart: bool,
    /// Errors not tied to a field.
    pub non_field_errors: Vec<String>,
    /// Whether any error was recorded.
    pub has_errors: bool,
}

/// One rendered field.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedField {
    /// The field name.
    pub name: String,
    /// The label text.
    pub label: String,
    /// Whether the field is required.
    pub required: bool,
    /// Help text, possibly empty.
    pub help_text: String,
    /// The widget's HTML.
    pub html: String,
    /// Validation errors for this field.
    pub errors: Vec<String>,
}

/// Escapes text for inclusion in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn default_label(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_json_or_empty(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    serde_json::from_str(raw).map_err(|_| INVALID_JSON.to_string())
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
