//! Key namespace rules shared by templates, schema blocks and locale files.
//! - Kebab form (`collection-list`) is used by `t:` keys, schema `class`/`name`, schema locales.
//! - Snake form (`collection_list`) is used by markup `| t` filters and base locales.
//! - Translation paths always embed the kebab scoped id.

/// Setting types whose default is a literal value (number, flag or option code)
/// rather than display text.
const INLINE_DEFAULT_TYPES: &[&str] = &["checkbox", "number", "range", "select", "radio"];

/// Every setting type the theme editor understands.
pub const SETTING_TYPES: &[&str] = &[
    "checkbox",
    "number",
    "radio",
    "range",
    "select",
    "text",
    "textarea",
    "article",
    "blog",
    "collection",
    "collection_list",
    "color",
    "color_background",
    "color_scheme",
    "color_scheme_group",
    "font_picker",
    "html",
    "image_picker",
    "inline_richtext",
    "link_list",
    "liquid",
    "metaobject",
    "metaobject_list",
    "page",
    "product",
    "product_list",
    "richtext",
    "text_alignment",
    "url",
    "video",
    "video_url",
];

pub fn scoped_id(prefix: &str, id: &str) -> String {
    if prefix.is_empty() {
        id.to_string()
    } else {
        format!("{prefix}-{id}")
    }
}

pub fn snake_form(id: &str) -> String {
    id.replace('-', "_")
}

pub fn kebab_form(id: &str) -> String {
    id.replace('_', "-")
}

/// Flip a key to the other naming convention: underscores become hyphens when
/// any are present, otherwise hyphens become underscores.
pub fn swap_convention(key: &str) -> String {
    if key.contains('_') {
        kebab_form(key)
    } else {
        snake_form(key)
    }
}

/// Setting ids may be typed with spaces; the stored id never has any.
pub fn normalize_id(id: &str) -> String {
    id.trim().replace(' ', "_")
}

pub fn translation_path(scoped_id: &str, setting_id: &str, field: &str) -> String {
    format!("t:sections.{scoped_id}.settings.{setting_id}.{field}")
}

pub fn block_translation_path(scoped_id: &str, block_type: &str, setting_id: &str, field: &str) -> String {
    format!("t:sections.{scoped_id}.blocks.{block_type}.settings.{setting_id}.{field}")
}

pub fn block_name_path(scoped_id: &str, block_type: &str) -> String {
    format!("t:sections.{scoped_id}.blocks.{block_type}.name")
}

pub fn section_name_path(scoped_id: &str) -> String {
    format!("t:sections.{scoped_id}.name")
}

pub fn presets_name_path(scoped_id: &str) -> String {
    format!("t:sections.{scoped_id}.presets.name")
}

/// Locale key for the n-th option (1-based) of a choice setting.
pub fn option_key(ordinal: usize) -> String {
    format!("options__{ordinal}")
}

pub fn default_is_translatable(setting_type: &str) -> bool {
    !INLINE_DEFAULT_TYPES.contains(&setting_type)
}

pub fn is_known_setting_type(setting_type: &str) -> bool {
    SETTING_TYPES.contains(&setting_type)
}

/// A section identifier bound to an optional prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionKey {
    pub prefix: String,
    pub id: String,
}

impl SectionKey {
    pub fn new(prefix: impl Into<String>, id: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), id: id.into() }
    }

    /// Key for editing an existing section in place.
    pub fn unprefixed(id: impl Into<String>) -> Self {
        Self::new("", id)
    }

    pub fn scoped(&self) -> String {
        scoped_id(&self.prefix, &self.id)
    }

    pub fn scoped_snake(&self) -> String {
        snake_form(&self.scoped())
    }

    pub fn snake(&self) -> String {
        snake_form(&self.id)
    }

    /// Human-readable stub name for freshly scaffolded locale entries.
    pub fn display_name(&self) -> String {
        self.id.replace('-', " ")
    }
}
