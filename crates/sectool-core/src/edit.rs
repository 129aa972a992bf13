//! Pointer-addressed editing utilities over parsed locale trees (serde_json::Value).
//! Highlights:
//! - RFC 6901 JSON Pointer addressing (`/sections/nova-hero/settings`).
//! - Inspect: `get_by_pointer`, `has_pointer`.
//! - Modify: `ensure_object`, `add_key_if_absent`.
//! - Load/store: `parse_locale_text` strips comments; `render_locale` prepends the provenance banner.
//! Used by the whole-document merge paths; the splice path never goes through here.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SectionError};
use crate::scan;

/// Comment written at the top of every locale file this tool rewrites.
pub const PROVENANCE_BANNER: &str = "/*
 * ------------------------------------------------------------
 * IMPORTANT: The contents of this file are auto-generated.
 *
 * This file may be updated by the Shopify admin language editor
 * or related systems. Please exercise caution as any changes
 * made to this file may be overwritten.
 * ------------------------------------------------------------
 */";

fn escape_token(tok: &str) -> String {
    tok.replace('~', "~0").replace('/', "~1")
}

/// Build a pointer from raw path segments.
pub fn pointer(segments: &[&str]) -> String {
    let mut out = String::new();
    for seg in segments {
        out.push('/');
        out.push_str(&escape_token(seg));
    }
    out
}

pub fn get_by_pointer<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    value.pointer(pointer)
}

pub fn has_pointer(value: &Value, pointer: &str) -> bool {
    value.pointer(pointer).is_some()
}

/// Object at `pointer`, creating empty objects for missing trailing segments.
/// Fails when an existing node along the way is not an object.
pub fn ensure_object<'a>(root: &'a mut Value, segments: &[&str]) -> Result<&'a mut Map<String, Value>> {
    let mut node = root;
    let mut walked = String::new();
    for seg in segments {
        walked.push('/');
        walked.push_str(&escape_token(seg));
        let obj = node
            .as_object_mut()
            .ok_or_else(|| SectionError::malformed(format!("{walked}: parent is not an object")))?;
        node = obj.entry(seg.to_string()).or_insert_with(|| Value::Object(Map::new()));
    }
    node.as_object_mut()
        .ok_or_else(|| SectionError::malformed(format!("{walked}: target is not an object")))
}

/// Insert `key` into the object at `obj_pointer` unless it is already there.
/// Returns whether anything was inserted.
pub fn add_key_if_absent(root: &mut Value, obj_pointer: &str, key: &str, value: Value) -> Result<bool> {
    let node = root
        .pointer_mut(obj_pointer)
        .ok_or_else(|| SectionError::SourceNotFound(format!("json pointer {obj_pointer}")))?;
    let obj = node
        .as_object_mut()
        .ok_or_else(|| SectionError::malformed(format!("{obj_pointer}: target is not an object")))?;
    if obj.contains_key(key) {
        return Ok(false);
    }
    obj.insert(key.to_string(), value);
    Ok(true)
}

/// Parse locale text after stripping `//` and `/* */` comments.
pub fn parse_locale_text(text: &str) -> Result<Value> {
    let stripped = scan::strip_comments(text)?;
    serde_json::from_str(&stripped).map_err(|e| SectionError::malformed(format!("locale JSON: {e}")))
}

pub fn parse_locale_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| SectionError::io(path, e))?;
    parse_locale_text(&text)
}

/// Pretty 2-space serialization with the provenance banner on top.
pub fn render_locale(value: &Value) -> Result<String> {
    let body = serde_json::to_string_pretty(value)?;
    Ok(format!("{PROVENANCE_BANNER}\n{body}\n"))
}

/// Put the banner in front of spliced text unless it already starts with it.
pub fn with_banner(text: &str) -> String {
    if text.trim_start().starts_with(PROVENANCE_BANNER) {
        text.to_string()
    } else {
        format!("{PROVENANCE_BANNER}\n{text}")
    }
}

pub fn write_text_to_file(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|e| SectionError::io(path, e))
}
