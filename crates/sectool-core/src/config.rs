use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SectionError};

pub const CONFIG_FILE_NAME: &str = "sectool.config.json";

/// Project settings read from `sectool.config.json` at the theme root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolConfig {
    pub translation_service_url: String,
    pub translation_service_api_key: String,
    pub supported_languages: Vec<String>,
    pub default_language: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            translation_service_url: "http://localhost:5000".to_string(),
            translation_service_api_key: String::new(),
            supported_languages: vec!["en".to_string(), "fr".to_string()],
            default_language: "en".to_string(),
        }
    }
}

impl ToolConfig {
    /// Load the config file under `root`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SectionError::io(&path, e)),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| SectionError::Config(format!("{CONFIG_FILE_NAME}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.default_language.is_empty() {
            return Err(SectionError::Config("defaultLanguage must not be empty".into()));
        }
        if !self.supported_languages.contains(&self.default_language) {
            return Err(SectionError::Config(format!(
                "defaultLanguage `{}` is missing from supportedLanguages",
                self.default_language
            )));
        }
        Ok(())
    }
}
