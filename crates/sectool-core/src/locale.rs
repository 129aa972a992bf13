//! Locale file orchestration: section duplication and translation merges.
//!
//! Every operation plans the new content of all affected files first and only
//! writes once every file has been processed, so a structural error in one file
//! leaves all of them untouched.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::edit::{self, pointer};
use crate::error::{Result, SectionError};
use crate::model::{BlockDefinition, MergeReport, SettingDefinition};
use crate::namespace::{self, default_is_translatable, kebab_form, snake_form, swap_convention};
use crate::project::{LocaleFile, LocaleKind, ThemeLayout};
use crate::splice::{self, PENDING_MARKER};
use crate::translate::Translator;

/// How `duplicate_section` rewrites a locale file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateStrategy {
    /// Splice a copy into the raw text; unrelated bytes are preserved.
    #[default]
    Splice,
    /// Parse, copy the subtree, and re-serialize the whole document.
    Reparse,
}

#[derive(Debug, Clone, Default)]
pub struct LocaleReport {
    pub written: Vec<PathBuf>,
    /// Files left alone, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    /// Per-file outcome of settings/blocks merges.
    pub merges: Vec<(PathBuf, MergeReport)>,
}

impl LocaleReport {
    fn skip(&mut self, path: &std::path::Path, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(path = %path.display(), reason = %reason, "locale file skipped");
        self.skipped.push((path.to_path_buf(), reason));
    }
}

struct PendingWrite {
    path: PathBuf,
    text: String,
}

pub struct LocaleMerger {
    files: Vec<LocaleFile>,
    default_locale: String,
    translator: Arc<dyn Translator>,
    strategy: DuplicateStrategy,
}

impl LocaleMerger {
    pub fn new(files: Vec<LocaleFile>, default_locale: impl Into<String>, translator: Arc<dyn Translator>) -> Self {
        Self { files, default_locale: default_locale.into(), translator, strategy: DuplicateStrategy::default() }
    }

    /// Resolve the locale files of `locales` under the theme's `locales/` directory.
    pub fn open(
        layout: &ThemeLayout,
        locales: &[String],
        default_locale: impl Into<String>,
        translator: Arc<dyn Translator>,
    ) -> Result<Self> {
        Ok(Self::new(layout.locale_files(locales)?, default_locale, translator))
    }

    pub fn with_strategy(mut self, strategy: DuplicateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn files(&self) -> &[LocaleFile] {
        &self.files
    }

    /// Copy `sections[source_id]` to `sections[dest_scoped_id]` in every base and
    /// schema file. Base files are keyed in snake form, schema files in kebab
    /// form; either falls back to the other convention.
    pub fn duplicate_section(&self, source_id: &str, dest_scoped_id: &str) -> Result<LocaleReport> {
        let mut report = LocaleReport::default();
        let mut pending = Vec::new();

        for file in &self.files {
            let (key, prefixed) = match file.kind {
                LocaleKind::Base => (snake_form(source_id), snake_form(dest_scoped_id)),
                LocaleKind::Schema => (kebab_form(source_id), kebab_form(dest_scoped_id)),
            };
            let text = std::fs::read_to_string(&file.path).map_err(|e| SectionError::io(&file.path, e))?;
            let result = match self.strategy {
                DuplicateStrategy::Splice => splice_duplicate(&text, &key, &prefixed),
                DuplicateStrategy::Reparse => reparse_duplicate(&text, &key, &prefixed),
            };
            match result {
                Ok(Some(new_text)) => pending.push(PendingWrite { path: file.path.clone(), text: new_text }),
                Ok(None) => report.skip(&file.path, format!("`{prefixed}` already present")),
                Err(SectionError::SourceNotFound(what)) => report.skip(&file.path, format!("{what} not found")),
                Err(e) => return Err(e),
            }
        }

        commit(pending, &mut report)?;
        Ok(report)
    }

    /// Make sure every schema file has a stub entry for a freshly created section
    /// plus the shared `all.heading`/`all.content` labels. Existing entries are kept.
    pub fn ensure_default_scaffold(&self, dest_scoped_id: &str, key: &str) -> Result<LocaleReport> {
        let mut report = LocaleReport::default();
        let mut pending = Vec::new();
        let name = format!("{PENDING_MARKER}{}", key.replace('-', " "));

        for file in self.files.iter().filter(|f| f.kind == LocaleKind::Schema) {
            let mut tree = edit::parse_locale_file(&file.path)?;
            let sections_ptr = pointer(&["sections"]);
            if !tree.get("sections").is_some_and(Value::is_object) {
                report.skip(&file.path, "no `sections` object");
                continue;
            }
            let mut changed = edit::add_key_if_absent(
                &mut tree,
                &sections_ptr,
                dest_scoped_id,
                json!({ "name": name, "presets": { "name": name } }),
            )?;
            let all_ptr = pointer(&["sections", "all"]);
            if edit::has_pointer(&tree, &all_ptr) {
                changed |= edit::add_key_if_absent(&mut tree, &all_ptr, "heading", json!({ "label": "Heading" }))?;
                changed |= edit::add_key_if_absent(&mut tree, &all_ptr, "content", json!({ "label": "Content" }))?;
            }
            if changed {
                pending.push(PendingWrite { path: file.path.clone(), text: edit::render_locale(&tree)? });
            } else {
                report.skip(&file.path, format!("`{dest_scoped_id}` already scaffolded"));
            }
        }

        commit(pending, &mut report)?;
        Ok(report)
    }

    /// Add label/default/info/placeholder/option entries for `settings` under
    /// `sections[dest].settings` of every schema file.
    pub async fn merge_settings(&self, dest_scoped_id: &str, settings: &[SettingDefinition]) -> Result<LocaleReport> {
        let mut report = LocaleReport::default();
        let mut pending = Vec::new();

        for file in self.schema_files_with(dest_scoped_id, &mut report)? {
            let (file, mut tree) = file;
            let mut merge = MergeReport::default();
            let target = edit::ensure_object(&mut tree, &["sections", dest_scoped_id, "settings"])?;
            for setting in settings {
                let id = namespace::normalize_id(&setting.id);
                if target.contains_key(&id) {
                    warn!(id = %id, path = %file.path.display(), "setting already translated, skipping");
                    merge.skipped.push(id);
                    continue;
                }
                let entry = self.setting_entry(setting, file).await?;
                target.insert(id.clone(), entry);
                merge.added.push(id);
            }
            if !merge.added.is_empty() {
                pending.push(PendingWrite { path: file.path.clone(), text: edit::render_locale(&tree)? });
            }
            report.merges.push((file.path.clone(), merge));
        }

        commit(pending, &mut report)?;
        Ok(report)
    }

    /// Add `blocks.<type>` entries (name plus block settings) under
    /// `sections[dest]` of every schema file.
    pub async fn merge_blocks(&self, dest_scoped_id: &str, blocks: &[BlockDefinition]) -> Result<LocaleReport> {
        let mut report = LocaleReport::default();
        let mut pending = Vec::new();

        for file in self.schema_files_with(dest_scoped_id, &mut report)? {
            let (file, mut tree) = file;
            let mut merge = MergeReport::default();
            let target = edit::ensure_object(&mut tree, &["sections", dest_scoped_id, "blocks"])?;
            for block in blocks {
                if target.contains_key(&block.kind) {
                    warn!(block_type = %block.kind, path = %file.path.display(), "block already translated, skipping");
                    merge.skipped.push(block.kind.clone());
                    continue;
                }
                let mut entry = Map::new();
                entry.insert("name".into(), Value::String(self.localize(&block.name, file).await?));
                let mut block_settings = Map::new();
                for setting in &block.settings {
                    let id = namespace::normalize_id(&setting.id);
                    if block_settings.contains_key(&id) {
                        warn!(id = %id, block_type = %block.kind, path = %file.path.display(), "duplicate block setting, skipping");
                        merge.skipped.push(format!("{}.{id}", block.kind));
                        continue;
                    }
                    let value = self.setting_entry(setting, file).await?;
                    block_settings.insert(id, value);
                }
                if !block_settings.is_empty() {
                    entry.insert("settings".into(), Value::Object(block_settings));
                }
                target.insert(block.kind.clone(), Value::Object(entry));
                merge.added.push(block.kind.clone());
            }
            if !merge.added.is_empty() {
                pending.push(PendingWrite { path: file.path.clone(), text: edit::render_locale(&tree)? });
            }
            report.merges.push((file.path.clone(), merge));
        }

        commit(pending, &mut report)?;
        Ok(report)
    }

    /// Parsed schema files that already hold `sections[dest]`. Files without it
    /// are skipped; when none has it the merge is a `Conflict`.
    fn schema_files_with(&self, dest: &str, report: &mut LocaleReport) -> Result<Vec<(&LocaleFile, Value)>> {
        let mut out = Vec::new();
        let dest_ptr = pointer(&["sections", dest]);
        for file in self.files.iter().filter(|f| f.kind == LocaleKind::Schema) {
            let tree = edit::parse_locale_file(&file.path)?;
            if edit::get_by_pointer(&tree, &dest_ptr).is_some_and(Value::is_object) {
                out.push((file, tree));
            } else {
                report.skip(&file.path, format!("no `sections.{dest}` subtree"));
            }
        }
        if out.is_empty() {
            return Err(SectionError::Conflict(dest.to_string()));
        }
        Ok(out)
    }

    async fn setting_entry(&self, setting: &SettingDefinition, file: &LocaleFile) -> Result<Value> {
        let mut entry = Map::new();
        entry.insert("label".into(), Value::String(self.localize(&setting.label, file).await?));
        if let Some(default) = setting.default.as_ref().filter(|_| default_is_translatable(&setting.kind)) {
            let text = match default {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            entry.insert("default".into(), Value::String(self.localize(&text, file).await?));
        }
        if let Some(info) = &setting.info {
            entry.insert("info".into(), Value::String(self.localize(info, file).await?));
        }
        if let Some(placeholder) = &setting.placeholder {
            entry.insert("placeholder".into(), Value::String(self.localize(placeholder, file).await?));
        }
        for (i, option) in setting.options.iter().enumerate() {
            let label = self.localize(&option.label, file).await?;
            entry.insert(namespace::option_key(i + 1), json!({ "label": label }));
        }
        Ok(Value::Object(entry))
    }

    /// Authored text for the designated default file (`<default>.default.*`),
    /// translated text everywhere else.
    async fn localize(&self, text: &str, file: &LocaleFile) -> Result<String> {
        if file.is_default && file.locale == self.default_locale {
            return Ok(text.to_string());
        }
        self.translator.translate(text, &file.locale).await
    }
}

fn splice_duplicate(text: &str, key: &str, prefixed: &str) -> Result<Option<String>> {
    let (spliced, outcome) = splice::duplicate_entry(text, key, prefixed)?;
    if !outcome.changed() {
        return Ok(None);
    }
    Ok(Some(edit::with_banner(&spliced)))
}

fn reparse_duplicate(text: &str, key: &str, prefixed: &str) -> Result<Option<String>> {
    let mut tree = edit::parse_locale_text(text)?;
    let sections = tree
        .get_mut("sections")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| SectionError::SourceNotFound("`sections` object".into()))?;

    let alt_key = swap_convention(key);
    let (key, prefixed) = match (sections.contains_key(key), alt_key != key && sections.contains_key(&alt_key)) {
        (true, true) => {
            return Err(SectionError::AmbiguousConvention { key: key.to_string(), alternate: alt_key });
        }
        (true, false) => (key.to_string(), prefixed.to_string()),
        (false, true) => (alt_key, swap_convention(prefixed)),
        (false, false) => return Err(SectionError::SourceNotFound(format!("key `{key}`"))),
    };
    if sections.contains_key(&prefixed) {
        return Ok(None);
    }
    let mut copy = sections.get(&key).cloned().unwrap_or(Value::Null);
    mark_pending(&mut copy, &["name"]);
    mark_pending(&mut copy, &["presets", "name"]);
    sections.insert(prefixed, copy);
    Ok(Some(edit::render_locale(&tree)?))
}

fn mark_pending(value: &mut Value, path: &[&str]) {
    if let Some(Value::String(s)) = value.pointer_mut(&pointer(path)) {
        s.insert_str(0, PENDING_MARKER);
    }
}

fn commit(pending: Vec<PendingWrite>, report: &mut LocaleReport) -> Result<()> {
    for write in pending {
        edit::write_text_to_file(&write.path, &write.text)?;
        info!(path = %write.path.display(), "updated locale file");
        report.written.push(write.path);
    }
    Ok(())
}
