use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use crate::error::{Result, SectionError};

pub const TEMPLATE_EXT: &str = "liquid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleKind {
    /// Storefront strings (`en.json`, `en.default.json`).
    Base,
    /// Theme editor strings (`en.schema.json`, `en.default.schema.json`).
    Schema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFile {
    pub path: PathBuf,
    pub locale: String,
    pub kind: LocaleKind,
    /// File carries the `.default` infix.
    pub is_default: bool,
}

impl LocaleFile {
    /// Classify a locale file by name; `None` for anything that is not `*.json`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".json")?;
        let mut parts = stem.split('.');
        let locale = parts.next().filter(|l| !l.is_empty())?.to_string();
        let rest: Vec<&str> = parts.collect();
        let kind = if rest.contains(&"schema") { LocaleKind::Schema } else { LocaleKind::Base };
        Some(Self { path: path.to_path_buf(), locale, kind, is_default: rest.contains(&"default") })
    }
}

/// Directory conventions of a theme checkout.
#[derive(Debug, Clone)]
pub struct ThemeLayout {
    root: PathBuf,
}

impl ThemeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sections_dir(&self) -> PathBuf {
        self.root.join("sections")
    }

    pub fn locales_dir(&self) -> PathBuf {
        self.root.join("locales")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn section_path(&self, id: &str) -> PathBuf {
        self.sections_dir().join(format!("{id}.{TEMPLATE_EXT}"))
    }

    pub fn is_theme_root(&self) -> bool {
        self.sections_dir().is_dir()
    }

    /// Locale files whose locale code is in `locales`, sorted by path.
    pub fn locale_files(&self, locales: &[String]) -> Result<Vec<LocaleFile>> {
        let dir = self.locales_dir();
        if !dir.is_dir() {
            return Err(SectionError::SourceNotFound(format!("locales directory {}", dir.display())));
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| SectionError::io(&dir, io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(file) = LocaleFile::from_path(entry.path())
                && locales.iter().any(|l| *l == file.locale)
            {
                out.push(file);
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    /// Write an asset under `assets/` unless it already exists.
    /// Returns the path when a file was created.
    pub fn create_asset(&self, file_name: &str, contents: &str) -> Result<Option<PathBuf>> {
        let dir = self.assets_dir();
        if !dir.is_dir() {
            return Err(SectionError::SourceNotFound(format!("assets directory {}", dir.display())));
        }
        let dest = dir.join(file_name);
        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&dest) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(SectionError::io(&dest, e)),
        };
        file.write_all(contents.as_bytes()).map_err(|e| SectionError::io(&dest, e))?;
        info!(path = %dest.display(), "created asset");
        Ok(Some(dest))
    }

    pub fn create_stylesheet(&self, scoped_id: &str) -> Result<Option<PathBuf>> {
        self.create_asset(&format!("{scoped_id}.css"), &format!(".{scoped_id} {{\n  /* Your style here */\n}}\n"))
    }

    pub fn create_script(&self, scoped_id: &str) -> Result<Option<PathBuf>> {
        self.create_asset(&format!("{scoped_id}.js"), "")
    }
}
