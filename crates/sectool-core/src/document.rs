//! Section template aggregate.
//!
//! A `SectionDocument` is loaded once, accumulates pending edits, and writes its
//! destination exactly once. Edits are replayed in insertion order every time
//! the document is rendered, so the same chain always yields the same text.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Result, SectionError};
use crate::model::{BlockDefinition, MergeReport, SettingDefinition};
use crate::namespace::SectionKey;
use crate::project::ThemeLayout;
use crate::scaffold::{self, ScaffoldOptions};
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Unbound,
    Loaded,
    Transformed,
    Persisted,
}

/// How `save` treats an existing destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Duplication and creation: never overwrite.
    CreateNew,
    /// In-place extension of an existing section.
    Overwrite,
}

/// One queued transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Scaffold(ScaffoldOptions),
    ScopeStyle,
    PrefixTranslationNamespace,
    AddStyleImport,
    AddScriptImport,
    MergeSettings(Vec<SettingDefinition>),
    MergeBlocks(Vec<BlockDefinition>),
}

/// Text produced by replaying every pending edit.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub report: MergeReport,
}

#[derive(Debug)]
pub struct SectionDocument {
    key: SectionKey,
    destination: PathBuf,
    mode: WriteMode,
    state: DocumentState,
    source: String,
    edits: Vec<Edit>,
}

impl SectionDocument {
    /// Bind a key to a destination without loading anything yet.
    pub fn bind(key: SectionKey, destination: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            key,
            destination: destination.into(),
            mode,
            state: DocumentState::Unbound,
            source: String::new(),
            edits: Vec::new(),
        }
    }

    /// Copy `sections/<id>.liquid` to `sections/<prefix>-<id>.liquid`.
    pub fn duplicate(layout: &ThemeLayout, key: SectionKey) -> Result<Self> {
        let destination = layout.section_path(&key.scoped());
        let source = layout.section_path(&key.id);
        let mut doc = Self::bind(key, destination, WriteMode::CreateNew);
        doc.ensure_destination_free()?;
        doc.load_from(&source)?;
        Ok(doc)
    }

    /// Start a brand-new section at `sections/<prefix>-<id>.liquid`.
    pub fn create(layout: &ThemeLayout, key: SectionKey, opts: ScaffoldOptions) -> Result<Self> {
        let destination = layout.section_path(&key.scoped());
        let mut doc = Self::bind(key, destination, WriteMode::CreateNew);
        doc.ensure_destination_free()?;
        doc.load_text(String::new())?;
        doc.push(Edit::Scaffold(opts))?;
        Ok(doc)
    }

    /// Open an existing section for in-place extension.
    pub fn open(layout: &ThemeLayout, id: &str) -> Result<Self> {
        let path = layout.section_path(id);
        let mut doc = Self::bind(SectionKey::unprefixed(id), path.clone(), WriteMode::Overwrite);
        doc.load_from(&path)?;
        Ok(doc)
    }

    /// Build a loaded document from template text already in memory.
    pub fn from_template(
        key: SectionKey,
        text: impl Into<String>,
        destination: impl Into<PathBuf>,
        mode: WriteMode,
    ) -> Result<Self> {
        let mut doc = Self::bind(key, destination, mode);
        doc.load_text(text.into())?;
        Ok(doc)
    }

    pub fn ensure_destination_free(&self) -> Result<()> {
        if self.destination.exists() {
            return Err(SectionError::DestinationExists(self.destination.clone()));
        }
        Ok(())
    }

    pub fn load_from(&mut self, path: &Path) -> Result<&mut Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SectionError::SourceNotFound(format!("section template {}", path.display())));
            }
            Err(e) => return Err(SectionError::io(path, e)),
        };
        self.load_text(text)
    }

    pub fn load_text(&mut self, text: String) -> Result<&mut Self> {
        if self.state != DocumentState::Unbound {
            return Err(SectionError::InvalidState(format!("cannot load a {:?} document", self.state)));
        }
        self.source = text;
        self.state = DocumentState::Loaded;
        Ok(self)
    }

    pub fn key(&self) -> &SectionKey {
        &self.key
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Queued edits, in the order they will be applied.
    pub fn pending_edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn scope_style(&mut self) -> Result<&mut Self> {
        self.push(Edit::ScopeStyle)
    }

    /// Rename `t:sections.<id>` and `sections.<snake id>` to their scoped forms.
    /// Must go together with the matching locale duplication.
    pub fn prefix_translation_namespace(&mut self) -> Result<&mut Self> {
        self.push(Edit::PrefixTranslationNamespace)
    }

    pub fn add_style_import(&mut self) -> Result<&mut Self> {
        self.push(Edit::AddStyleImport)
    }

    pub fn add_script_import(&mut self) -> Result<&mut Self> {
        self.push(Edit::AddScriptImport)
    }

    pub fn merge_settings(&mut self, settings: Vec<SettingDefinition>) -> Result<&mut Self> {
        self.push(Edit::MergeSettings(settings))
    }

    pub fn merge_blocks(&mut self, blocks: Vec<BlockDefinition>) -> Result<&mut Self> {
        self.push(Edit::MergeBlocks(blocks))
    }

    fn push(&mut self, edit: Edit) -> Result<&mut Self> {
        match self.state {
            DocumentState::Loaded | DocumentState::Transformed => {
                self.edits.push(edit);
                self.state = DocumentState::Transformed;
                Ok(self)
            }
            state => Err(SectionError::InvalidState(format!("cannot transform a {state:?} document"))),
        }
    }

    /// Replay every pending edit over the loaded text.
    pub fn render(&self) -> Result<Rendered> {
        if self.state == DocumentState::Unbound {
            return Err(SectionError::InvalidState("document has not been loaded".into()));
        }
        let mut text = self.source.clone();
        let mut report = MergeReport::default();
        for edit in &self.edits {
            text = self.apply(edit, text, &mut report)?;
        }
        Ok(Rendered { text, report })
    }

    /// Configuration block of the rendered text.
    pub fn read_config(&self) -> Result<Value> {
        schema::read(&self.render()?.text)
    }

    pub fn has_setting(&self, id: &str) -> Result<bool> {
        schema::has_setting(&self.render()?.text, id)
    }

    pub fn has_block_type(&self, block_type: &str) -> Result<bool> {
        schema::has_block_type(&self.render()?.text, block_type)
    }

    /// Render and write the destination. The document is finished afterwards.
    pub fn save(&mut self) -> Result<Rendered> {
        if self.state == DocumentState::Persisted {
            return Err(SectionError::InvalidState("document already saved".into()));
        }
        let rendered = self.render()?;
        self.write(&rendered.text)?;
        self.state = DocumentState::Persisted;
        info!(path = %self.destination.display(), "wrote section template");
        Ok(rendered)
    }

    fn write(&self, text: &str) -> Result<()> {
        let path = &self.destination;
        let mut file = match self.mode {
            WriteMode::CreateNew => match fs::OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(SectionError::DestinationExists(path.clone()));
                }
                Err(e) => return Err(SectionError::io(path, e)),
            },
            WriteMode::Overwrite => fs::File::create(path).map_err(|e| SectionError::io(path, e))?,
        };
        file.write_all(text.as_bytes()).map_err(|e| SectionError::io(path, e))
    }

    fn apply(&self, edit: &Edit, text: String, report: &mut MergeReport) -> Result<String> {
        let scoped = self.key.scoped();
        match edit {
            Edit::Scaffold(opts) => {
                let mut out = text;
                out.push_str(&scaffold::section_template(&scoped, *opts)?);
                Ok(out)
            }
            Edit::ScopeStyle => scope_style(text, &scoped),
            Edit::PrefixTranslationNamespace => Ok(prefix_namespace(&text, &self.key)),
            Edit::AddStyleImport => Ok(add_style_import(text, &self.key)),
            Edit::AddScriptImport => Ok(format!(
                "<script src=\"{{{{ '{scoped}.js' | asset_url }}}}\" defer=\"defer\"></script>\n{text}"
            )),
            Edit::MergeSettings(settings) => {
                let (out, r) = schema::merge_settings(&text, &scoped, settings)?;
                report.absorb(r);
                Ok(out)
            }
            Edit::MergeBlocks(blocks) => {
                let (out, r) = schema::merge_blocks(&text, &scoped, blocks)?;
                report.absorb(r);
                Ok(out)
            }
        }
    }
}

fn scope_style(text: String, scoped: &str) -> Result<String> {
    if schema::has_schema(&text)
        && let Some(out) = schema::append_class(&text, scoped)?
    {
        return Ok(out);
    }
    const ATTR: &str = "class=\"";
    match text.find(ATTR) {
        Some(pos) => {
            let at = pos + ATTR.len();
            Ok(format!("{}{scoped} {}", &text[..at], &text[at..]))
        }
        None => {
            warn!(section = scoped, "no class field or attribute to scope");
            Ok(text)
        }
    }
}

fn prefix_namespace(text: &str, key: &SectionKey) -> String {
    let text = text.replace(&format!("t:sections.{}", key.id), &format!("t:sections.{}", key.scoped()));
    text.replace(&format!("sections.{}", key.snake()), &format!("sections.{}", key.scoped_snake()))
}

fn add_style_import(text: String, key: &SectionKey) -> String {
    let existing = format!("{}.css' | asset_url | stylesheet_tag }}}}", key.id);
    let import = format!("{{{{ '{}.css' | asset_url | stylesheet_tag }}}}", key.scoped());
    match text.find(&existing) {
        Some(pos) => {
            let at = pos + existing.len();
            format!("{}\n{import}{}", &text[..at], &text[at..])
        }
        None => format!("{import}\n{text}"),
    }
}
