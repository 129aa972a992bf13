//! The `{% schema %}` configuration block embedded in a section template.
//!
//! Only the span between the two markers is ever rewritten; markup before and
//! after the block is carried over untouched.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, SectionError};
use crate::model::{BlockDefinition, MergeReport, SettingDefinition};
use crate::namespace::{self, block_name_path, block_translation_path, default_is_translatable, translation_path};
use crate::scan;

static OPEN_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%-?\s*schema\s*-?%\}").expect("static regex"));
static CLOSE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%-?\s*endschema\s*-?%\}").expect("static regex"));
static CLASS_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""class"\s*:\s*"([^"]*)""#).expect("static regex"));

/// Byte ranges of the configuration block inside a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSpan {
    /// From the start of the opening marker to the end of the closing marker.
    pub outer: Range<usize>,
    /// Text strictly between the markers.
    pub inner: Range<usize>,
}

/// Locate the single configuration block.
pub fn locate(text: &str) -> Result<SchemaSpan> {
    let opens: Vec<_> = OPEN_MARKER.find_iter(text).collect();
    let closes: Vec<_> = CLOSE_MARKER.find_iter(text).collect();
    match (opens.as_slice(), closes.as_slice()) {
        ([], []) => Err(SectionError::malformed("no {% schema %} block found")),
        ([open], [close]) if open.end() <= close.start() => Ok(SchemaSpan {
            outer: open.start()..close.end(),
            inner: open.end()..close.start(),
        }),
        ([_], [_]) => Err(SectionError::malformed("{% endschema %} precedes {% schema %}")),
        (o, c) if o.len() == c.len() => {
            Err(SectionError::malformed(format!("expected one schema block, found {}", o.len())))
        }
        (o, c) => Err(SectionError::malformed(format!(
            "unbalanced schema markers: {} opening, {} closing",
            o.len(),
            c.len()
        ))),
    }
}

pub fn has_schema(text: &str) -> bool {
    locate(text).is_ok()
}

/// Parse the configuration block (comments allowed) into a JSON object.
pub fn read(text: &str) -> Result<Value> {
    let span = locate(text)?;
    let stripped = scan::strip_comments(&text[span.inner])?;
    let value: Value = serde_json::from_str(&stripped)
        .map_err(|e| SectionError::malformed(format!("schema JSON: {e}")))?;
    if !value.is_object() {
        return Err(SectionError::malformed("schema is not a JSON object"));
    }
    Ok(value)
}

/// Rewrite the block interior with `config` pretty-printed at 2-space indentation.
pub fn replace(text: &str, config: &Value) -> Result<String> {
    let span = locate(text)?;
    let body = serde_json::to_string_pretty(config)?;
    let mut out = String::with_capacity(text.len() + body.len());
    out.push_str(&text[..span.inner.start]);
    out.push('\n');
    out.push_str(&body);
    out.push('\n');
    out.push_str(&text[span.inner.end..]);
    Ok(out)
}

pub fn has_setting(text: &str, id: &str) -> Result<bool> {
    let config = read(text)?;
    let id = namespace::normalize_id(id);
    Ok(array_at(&config, "settings").iter().any(|s| s.get("id").and_then(Value::as_str) == Some(id.as_str())))
}

pub fn has_block_type(text: &str, block_type: &str) -> Result<bool> {
    let config = read(text)?;
    Ok(array_at(&config, "blocks")
        .iter()
        .any(|b| b.get("type").and_then(Value::as_str) == Some(block_type)))
}

/// Append settings to the block. A setting whose id already exists is skipped
/// with a warning; the others are still added.
pub fn merge_settings(text: &str, scoped_id: &str, settings: &[SettingDefinition]) -> Result<(String, MergeReport)> {
    let mut config = read(text)?;
    let mut report = MergeReport::default();
    let list = settings_array(&mut config, "settings")?;
    for setting in settings {
        let id = namespace::normalize_id(&setting.id);
        if contains_id(list, "id", &id) {
            warn!(id = %id, section = scoped_id, "setting already exists, skipping");
            report.skipped.push(id);
            continue;
        }
        list.push(schema_setting(setting, &id, |field| translation_path(scoped_id, &id, field)));
        report.added.push(id);
    }
    if report.added.is_empty() {
        return Ok((text.to_string(), report));
    }
    Ok((replace(text, &config)?, report))
}

/// Append block definitions, guarding on duplicate `type`.
pub fn merge_blocks(text: &str, scoped_id: &str, blocks: &[BlockDefinition]) -> Result<(String, MergeReport)> {
    let mut config = read(text)?;
    let mut report = MergeReport::default();
    let list = settings_array(&mut config, "blocks")?;
    for block in blocks {
        if contains_id(list, "type", &block.kind) {
            warn!(block_type = %block.kind, section = scoped_id, "block type already exists, skipping");
            report.skipped.push(block.kind.clone());
            continue;
        }
        list.push(schema_block(block, scoped_id));
        report.added.push(block.kind.clone());
    }
    if report.added.is_empty() {
        return Ok((text.to_string(), report));
    }
    Ok((replace(text, &config)?, report))
}

/// Append the scoped id to the schema `class` field in place, keeping the
/// surrounding bytes. Returns `None` when the block has no `class` field.
pub fn append_class(text: &str, class: &str) -> Result<Option<String>> {
    let span = locate(text)?;
    let inner = &text[span.inner.clone()];
    let Some(caps) = CLASS_FIELD.captures(inner) else {
        return Ok(None);
    };
    let Some(value) = caps.get(1) else {
        return Ok(None);
    };
    let at = span.inner.start + value.end();
    let mut out = String::with_capacity(text.len() + class.len() + 1);
    out.push_str(&text[..at]);
    if !value.as_str().is_empty() {
        out.push(' ');
    }
    out.push_str(class);
    out.push_str(&text[at..]);
    Ok(Some(out))
}

fn array_at<'a>(config: &'a Value, key: &str) -> &'a [Value] {
    config.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn settings_array<'a>(config: &'a mut Value, key: &str) -> Result<&'a mut Vec<Value>> {
    let obj = config
        .as_object_mut()
        .ok_or_else(|| SectionError::malformed("schema is not a JSON object"))?;
    obj.entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| SectionError::malformed(format!("schema `{key}` is not an array")))
}

fn contains_id(list: &[Value], field: &str, id: &str) -> bool {
    list.iter().any(|v| v.get(field).and_then(Value::as_str) == Some(id))
}

/// Setting entry with translatable text replaced by `t:` paths built by `path`.
fn schema_setting(setting: &SettingDefinition, id: &str, path: impl Fn(&str) -> String) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::String(setting.kind.clone()));
    obj.insert("id".into(), Value::String(id.to_string()));
    obj.insert("label".into(), Value::String(path("label")));
    if let Some(default) = &setting.default {
        let default = if default_is_translatable(&setting.kind) {
            Value::String(path("default"))
        } else {
            default.clone()
        };
        obj.insert("default".into(), default);
    }
    if setting.info.is_some() {
        obj.insert("info".into(), Value::String(path("info")));
    }
    if let Some(min) = &setting.min {
        obj.insert("min".into(), Value::Number(min.clone()));
    }
    if let Some(max) = &setting.max {
        obj.insert("max".into(), Value::Number(max.clone()));
    }
    if let Some(step) = &setting.step {
        obj.insert("step".into(), Value::Number(step.clone()));
    }
    if let Some(unit) = &setting.unit {
        obj.insert("unit".into(), Value::String(unit.clone()));
    }
    if setting.placeholder.is_some() {
        obj.insert("placeholder".into(), Value::String(path("placeholder")));
    }
    if !setting.options.is_empty() {
        let options = setting
            .options
            .iter()
            .enumerate()
            .map(|(i, opt)| {
                let mut o = Map::new();
                o.insert("label".into(), Value::String(path(&format!("{}.label", namespace::option_key(i + 1)))));
                o.insert("value".into(), opt.value.clone());
                Value::Object(o)
            })
            .collect();
        obj.insert("options".into(), Value::Array(options));
    }
    Value::Object(obj)
}

fn schema_block(block: &BlockDefinition, scoped_id: &str) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::String(block.kind.clone()));
    obj.insert("name".into(), Value::String(block_name_path(scoped_id, &block.kind)));
    if let Some(limit) = block.limit {
        obj.insert("limit".into(), Value::from(limit));
    }
    let mut settings: Vec<Value> = Vec::new();
    for setting in &block.settings {
        let id = namespace::normalize_id(&setting.id);
        if contains_id(&settings, "id", &id) {
            warn!(id = %id, block_type = %block.kind, "duplicate block setting, skipping");
            continue;
        }
        settings.push(schema_setting(setting, &id, |field| {
            block_translation_path(scoped_id, &block.kind, &id, field)
        }));
    }
    if !settings.is_empty() {
        obj.insert("settings".into(), Value::Array(settings));
    }
    Value::Object(obj)
}
