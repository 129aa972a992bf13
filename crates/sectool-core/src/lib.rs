//! sectool-core: section template and locale editing engine
//!
//! This crate focuses on a small, well-factored surface:
//! - Key namespace rules shared by templates and locale files
//! - `{% schema %}` block extraction and merging without reparsing the template
//! - Byte-preserving duplication of locale subtrees by brace matching
//! - Locale orchestration (duplicate, scaffold, translate-and-merge)
//! - `SectionDocument`, the pending-edit builder that writes a template once
//!
pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod locale;
pub mod model;
pub mod namespace;
pub mod project;
pub mod scaffold;
pub mod scan;
pub mod schema;
pub mod splice;
pub mod translate;

pub use config::ToolConfig;
pub use document::{DocumentState, Edit, Rendered, SectionDocument, WriteMode};
pub use error::{Result, SectionError};
pub use locale::{DuplicateStrategy, LocaleMerger, LocaleReport};
pub use model::{BlockDefinition, MergeReport, SettingDefinition, SettingOption};
pub use namespace::SectionKey;
pub use project::{LocaleFile, LocaleKind, ThemeLayout};
pub use scaffold::ScaffoldOptions;
pub use translate::{BreakerState, CircuitBreaker, IdentityTranslator, LibreTranslateClient, Translator};
