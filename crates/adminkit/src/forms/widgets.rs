//! HTML rendering for form fields.
//!
//! Every [`FieldKind`] has one widget. Widgets receive the field definition
//! and the raw string values to display, and return an HTML fragment with all
//! user-provided text escaped. The interactive widgets (password toggle,
//! dual-list select, tags) rely on Alpine.js attributes loaded by the base
//! template.

use std::fmt::Write as _;

use super::{escape_html, Choice, FieldKind, FieldSpec};

/// Renders the widget for `field` showing `raw` values.
pub fn render(field: &FieldSpec, raw: &[String]) -> String {
    let first = raw.first().map_or("", String::as_str);
    match &field.kind {
        FieldKind::Text => input(field, "text", first, &[]),
        FieldKind::Integer => input(field, "number", first, &[]),
        FieldKind::Date => input(field, "date", first, &[]),
        FieldKind::Password => password(field),
        FieldKind::TextArea | FieldKind::Json => textarea(field, first),
        FieldKind::Boolean => checkbox(field, !first.is_empty()),
        FieldKind::Select { choices } => select(field, choices, raw),
        FieldKind::SelectMultiple { choices } => horizontal_select(field, choices, raw),
        FieldKind::CheckboxMultiple { choices } => choice_list(field, "checkbox", choices, raw),
        FieldKind::Radio { choices } => choice_list(field, "radio", choices, raw),
        FieldKind::Tags => tags(field, first),
        FieldKind::File { multiple } => file(field, *multiple, raw),
    }
}

/// Formats extra attributes as ` key="value"` pairs, preserving order.
fn render_attrs(field: &FieldSpec, extra: &[(&str, &str)]) -> String {
    let mut out = String::new();
    if field.required && !matches!(field.kind, FieldKind::CheckboxMultiple { .. }) {
        out.push_str(" required");
    }
    let declared = field.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()));
    for (key, value) in extra.iter().copied().chain(declared) {
        let _ = write!(out, r#" {}="{}""#, escape_html(key), escape_html(value));
    }
    out
}

fn input(field: &FieldSpec, kind: &str, value: &str, extra: &[(&str, &str)]) -> String {
    let name = escape_html(&field.name);
    format!(
        r#"<input type="{kind}" id="{name}" name="{name}" value="{}"{}>"#,
        escape_html(value),
        render_attrs(field, extra)
    )
}

fn textarea(field: &FieldSpec, value: &str) -> String {
    let name = escape_html(&field.name);
    format!(
        r#"<textarea id="{name}" name="{name}" rows="4"{}>{}</textarea>"#,
        render_attrs(field, &[]),
        escape_html(value)
    )
}

fn password(field: &FieldSpec) -> String {
    let rendered = input(
        field,
        "password",
        "",
        &[(":type", "show ? 'text' : 'password'")],
    );
    format!(
        r#"<div class="password-field icon-input" x-data="{{ show: false }}">{rendered}<span class="fa" :class="{{'fa-eye': !show, 'fa-eye-slash': show}}" @click="show = !show"></span></div>"#
    )
}

fn checkbox(field: &FieldSpec, checked: bool) -> String {
    let name = escape_html(&field.name);
    let checked = if checked { " checked" } else { "" };
    format!(
        r#"<input type="checkbox" id="{name}" name="{name}" value="y"{checked}{}><label class="state" for="{name}">&nbsp;</label>"#,
        render_attrs(field, &[])
    )
}

/// Hidden native input behind a "Browse" button; `current` lists the files
/// already stored, which makes a new upload optional.
fn file(field: &FieldSpec, multiple: bool, current: &[String]) -> String {
    let name = escape_html(&field.name);
    let mut shown = field.clone();
    shown.required &= current.is_empty();
    let native = format!(
        r#"<input type="file" id="{name}" name="{name}"{}{}>"#,
        if multiple { " multiple" } else { "" },
        render_attrs(
            &shown,
            &[
                ("@change", "count = $event.target.files.length"),
                ("class", "d-hidden"),
            ]
        )
    );
    let mut out = format!(
        r#"<label x-data="{{count: 0}}" class="file-field input-group"><div class="info" x-text="count ? count + ' files(s) selected' : 'Choose file(s)'"></div>{native}<span class="button button-secondary input-group-addon">Browse</span></label>"#
    );
    if !current.is_empty() {
        let names: Vec<String> = current.iter().map(|f| escape_html(f)).collect();
        let _ = write!(out, r#"<div class="current-file">{}</div>"#, names.join(", "));
    }
    out
}

fn options(choices: &[Choice], raw: &[String]) -> String {
    let mut out = String::new();
    for choice in choices {
        let selected = if raw.iter().any(|v| *v == choice.value) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            out,
            r#"<option value="{}"{selected}>{}</option>"#,
            escape_html(&choice.value),
            escape_html(&choice.label)
        );
    }
    out
}

fn select(field: &FieldSpec, choices: &[Choice], raw: &[String]) -> String {
    let name = escape_html(&field.name);
    format!(
        r#"<div class="select-field icon-input"><select id="{name}" name="{name}"{}>{}</select><span class="fa fa-caret-down"></span></div>"#,
        render_attrs(field, &[]),
        options(choices, raw)
    )
}

fn horizontal_select(field: &FieldSpec, choices: &[Choice], raw: &[String]) -> String {
    let name = escape_html(&field.name);
    let native = format!(
        r#"<select multiple id="{name}" name="{name}"{}>{}</select>"#,
        render_attrs(
            field,
            &[
                ("x-ref", "field"),
                ("class", "d-hidden"),
                ("@change", "ev = $event.timeStamp"),
            ]
        ),
        options(choices, raw)
    );
    let column = |title: &str, toggle: &str, all: bool, shown: &str| {
        format!(
            r##"<div class="col-12 col-sm-6 col-md-5 col-lg-4"><div class="title"><a href="#" class="pull-right" @click.prevent="$dispatch('set-all', {all})">{toggle}</a>{title}</div><ul><template x-for="key in Object.keys($refs.field.options)" :key="key"><li x-show="{shown}$refs.field.options[key].selected"><a href="#" @click.prevent="$dispatch('set-one', {{key, selected: {all}}})" x-text="$refs.field.options[key].label"></a></li></template></ul></div>"##
        )
    };
    format!(
        r#"<div class="select-multi-field" x-data="{{ ev: null }}" @set-one="$refs.field.options[$event.detail.key].selected = $event.detail.selected; $dispatch('propagate');" @set-all="Object.keys($refs.field.options).forEach(key => $refs.field.options[key].selected = $event.detail); $dispatch('propagate');" @propagate="$refs.field.dispatchEvent(new Event('change'))">{native}<div class="row">{}{}</div></div>"#,
        column("Available", "Choose all", true, "!"),
        column("Selected", "Remove all", false, ""),
    )
}

fn choice_list(field: &FieldSpec, kind: &str, choices: &[Choice], raw: &[String]) -> String {
    let name = escape_html(&field.name);
    let mut out = format!(r#"<ul id="{name}" class="choice-field">"#);
    for (index, choice) in choices.iter().enumerate() {
        let id = format!("{name}-{index}");
        let checked = if raw.iter().any(|v| *v == choice.value) {
            " checked"
        } else {
            ""
        };
        let _ = write!(
            out,
            r#"<li><input type="{kind}" id="{id}" name="{name}" value="{}"{checked}{}><label class="state" for="{id}">&nbsp;</label><label for="{id}">{}</label></li>"#,
            escape_html(&choice.value),
            render_attrs(field, &[]),
            escape_html(&choice.label)
        );
    }
    out.push_str("</ul>");
    out
}

fn tags(field: &FieldSpec, value: &str) -> String {
    let current = if value.trim().is_empty() { "[]" } else { value };
    let hidden = input(
        field,
        "text",
        current,
        &[(":value", "JSON.stringify(tags)"), ("class", "d-hidden")],
    );
    format!(
        r#"<div x-data='{{ tags: {}, newTag: "" }}'>{hidden}<div class="tags-field"><template x-for="tag in tags" :key="tag"><span class="tag"><span x-text="tag"></span><a href="" @click.prevent="tags = tags.filter(i => i !== tag)"><i class="fa fa-times"></i></a></span></template><input placeholder="add a new tag ..." x-model="newTag" @keydown.enter.prevent="if (newTag.trim() !== '' &amp;&amp; tags.indexOf(newTag.trim()) == -1) tags.push(newTag.trim()); newTag = ''" @keydown.backspace="if (newTag === '') tags.pop()"></div></div>"#,
        escape_html(current)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_text_input_escapes_value() {
        let html = render(&FieldSpec::text("name"), &raw(&[r#"<b>"x"</b>"#]));
        assert!(html.starts_with(r#"<input type="text" id="name" name="name""#));
        assert!(html.contains("value=\"&lt;b&gt;&quot;x&quot;&lt;/b&gt;\""));
        assert!(html.contains(" required"));
    }

    #[test]
    fn test_optional_field_has_no_required_attr() {
        let html = render(&FieldSpec::integer("count").optional(), &raw(&["3"]));
        assert!(html.contains(r#"type="number""#));
        assert!(!html.contains("required"));
    }

    #[test]
    fn test_declared_attrs_rendered() {
        let field = FieldSpec::date("when").attr("data-flatpickr", "true");
        let html = render(&field, &[]);
        assert!(html.contains(r#"data-flatpickr="true""#));
    }

    #[test]
    fn test_password_never_echoes_value() {
        let html = render(&FieldSpec::password("password"), &raw(&["secret"]));
        assert!(!html.contains("secret"));
        assert!(html.contains("password-field"));
    }

    #[test]
    fn test_select_marks_selected_option() {
        let field = FieldSpec::select("sex", Choice::same(["Male", "Female"]));
        let html = render(&field, &raw(&["Female"]));
        assert!(html.contains(r#"<option value="Female" selected>Female</option>"#));
        assert!(html.contains(r#"<option value="Male">Male</option>"#));
    }

    #[test]
    fn test_select_multiple_is_hidden_native_select() {
        let field = FieldSpec::select_multiple("options", Choice::same(["One", "Two"]));
        let html = render(&field, &raw(&["Two"]));
        assert!(html.contains("<select multiple"));
        assert!(html.contains(r#"class="d-hidden""#));
        assert!(html.contains(r#"<option value="Two" selected>"#));
        assert!(html.contains("Choose all"));
    }

    #[test]
    fn test_radio_and_checkbox_lists() {
        let field = FieldSpec::radio("choice", Choice::same(["a", "b"]));
        let html = render(&field, &raw(&["b"]));
        assert!(html.contains(r#"id="choice-1" name="choice" value="b" checked"#));

        let field = FieldSpec::checkbox_multiple("choices", Choice::same(["a", "b"]));
        let html = render(&field, &raw(&["a", "b"]));
        assert_eq!(html.matches(" checked").count(), 2);
        assert!(!html.contains(" required"));
    }

    #[test]
    fn test_checkbox() {
        let html = render(&FieldSpec::boolean("agree"), &raw(&["y"]));
        assert!(html.contains(r#"value="y" checked"#));
        let html = render(&FieldSpec::boolean("agree"), &[]);
        assert!(!html.contains("checked"));
    }

    #[test]
    fn test_tags_embed_json() {
        let html = render(&FieldSpec::tags("tags"), &raw(&[r#"["it's"]"#]));
        assert!(html.contains("tags: [&quot;it&#x27;s&quot;]"));
        let empty = render(&FieldSpec::tags("tags"), &[]);
        assert!(empty.contains("tags: []"));
    }

    #[test]
    fn test_file_input() {
        let html = render(&FieldSpec::file("attachment"), &[]);
        assert!(html.contains(r#"<input type="file" id="attachment" name="attachment" required"#));
        assert!(html.contains(r#"class="d-hidden""#));
        assert!(html.contains("Browse"));
        assert!(!html.contains(" multiple"));

        let html = render(&FieldSpec::files("scans"), &raw(&["a.pdf", "<b>.pdf"]));
        assert!(html.contains(r#"name="scans" multiple"#));
        assert!(!html.contains(" required"));
        assert!(html.contains("a.pdf, &lt;b&gt;.pdf"));
    }
}
