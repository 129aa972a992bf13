//! Template synthesis for brand-new sections.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::error::Result;
use crate::model::SettingDefinition;
use crate::namespace::{presets_name_path, section_name_path};

static TAG_PADDING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*(<[^>]+>)\s*").expect("static regex"));

const INDENT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaffoldOptions {
    /// Heading and content richtext settings.
    pub base_settings: bool,
    /// Top/bottom padding range settings and their style block.
    pub padding_settings: bool,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self { base_settings: true, padding_settings: true }
    }
}

pub fn heading_setting() -> SettingDefinition {
    SettingDefinition::new("richtext", "heading", "t:sections.all.heading.label")
        .with_default("t:sections.all.heading.label")
}

pub fn content_setting() -> SettingDefinition {
    SettingDefinition::new("richtext", "content", "t:sections.all.content.label")
        .with_default("t:sections.all.content.label")
}

pub fn padding_top_setting() -> SettingDefinition {
    padding_setting("padding_top")
}

pub fn padding_bottom_setting() -> SettingDefinition {
    padding_setting("padding_bottom")
}

fn padding_setting(id: &str) -> SettingDefinition {
    SettingDefinition::new("range", id, format!("t:sections.all.padding.{id}"))
        .with_range(0, 100, Some(4.into()))
        .with_unit("px")
        .with_default(40)
}

/// Full template text for a new section named `scoped_id`.
pub fn section_template(scoped_id: &str, opts: ScaffoldOptions) -> Result<String> {
    let mut out = String::new();
    if opts.padding_settings {
        out.push_str(PADDING_STYLE);
        out.push_str("\n\n");
    }
    out.push_str(&section_markup(opts));
    out.push_str("\n\n");
    out.push_str("{% schema %}\n");
    out.push_str(&serde_json::to_string_pretty(&section_schema(scoped_id, opts))?);
    out.push_str("\n{% endschema %}\n");
    Ok(out)
}

/// Schema object; the already-namespaced default settings are emitted as authored.
pub fn section_schema(scoped_id: &str, opts: ScaffoldOptions) -> Value {
    let mut settings = Vec::new();
    if opts.padding_settings {
        settings.push(padding_top_setting());
        settings.push(padding_bottom_setting());
    }
    if opts.base_settings {
        settings.push(heading_setting());
        settings.push(content_setting());
    }
    json!({
        "name": section_name_path(scoped_id),
        "tag": "section",
        "class": format!("section {scoped_id}"),
        "settings": settings,
        "presets": [{ "name": presets_name_path(scoped_id) }],
    })
}

fn section_markup(opts: ScaffoldOptions) -> String {
    let mut html = String::from("<div");
    if opts.padding_settings {
        html.push_str(" class=\"section-{{ section.id }}-padding\"");
    }
    html.push('>');
    if opts.base_settings {
        html.push_str("<p>{{ section.settings.heading }}</p>");
        html.push_str("<p>{{ section.settings.content }}</p>");
    }
    html.push_str("</div>");
    indent_html(&html)
}

/// Put every tag on its own line, indenting children by two spaces.
pub fn indent_html(html: &str) -> String {
    let compact = TAG_PADDING.replace_all(html, "$1");
    let mut lines = Vec::new();
    let mut level = 0usize;
    for token in split_tags(&compact) {
        if token.starts_with("</") {
            level = level.saturating_sub(1);
        }
        lines.push(format!("{}{}", " ".repeat(level * INDENT), token));
        let opens = token.starts_with('<')
            && token[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            && !token.ends_with("/>");
        if opens {
            level += 1;
        }
    }
    lines.join("\n").trim().to_string()
}

/// Split before every `<` and after every `>`.
fn split_tags(html: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in html.char_indices() {
        match c {
            '<' if i > start => {
                out.push(&html[start..i]);
                start = i;
            }
            '>' => {
                out.push(&html[start..=i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < html.len() {
        out.push(&html[start..]);
    }
    out
}

const PADDING_STYLE: &str = "{%- style -%}
  .section-{{ section.id }}-padding {
    padding-top: {{ section.settings.padding_top | times: 0.75 | round: 0 }}px;
    padding-bottom: {{ section.settings.padding_bottom | times: 0.75 | round: 0 }}px;
  }

  @media screen and (min-width: 750px) {
    .section-{{ section.id }}-padding {
      padding-top: {{ section.settings.padding_top }}px;
      padding-bottom: {{ section.settings.padding_bottom }}px;
    }
  }
{%- endstyle -%}";
