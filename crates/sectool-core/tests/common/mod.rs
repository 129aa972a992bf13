#![allow(dead_code)]

use std::fs;
use std::path::Path;

use sectool_core::ThemeLayout;
use tempfile::TempDir;

pub const COLLECTION_LIST: &str = r#"{{ 'collection-list.css' | asset_url | stylesheet_tag }}
<div class="collection-list">
  <h2>{{ 'sections.collection_list.title' | t }}</h2>
</div>

{% schema %}
{
  "name": "t:sections.collection-list.name",
  "class": "section",
  "settings": [
    {
      "type": "text",
      "id": "title",
      "label": "t:sections.collection-list.settings.title.label"
    }
  ],
  "presets": [
    {
      "name": "t:sections.collection-list.presets.name"
    }
  ]
}
{% endschema %}
"#;

pub const EN_BASE: &str = r#"{
  "general": { "title": "Shop" },
  "sections": {
    "collection_list": {
      "title": "Collections"
    }
  }
}
"#;

pub const FR_BASE: &str = r#"{
  "general": { "title": "Boutique" },
  "sections": {
    "collection_list": {
      "title": "Collections"
    }
  }
}
"#;

pub const EN_SCHEMA: &str = r#"{
  "sections": {
    "all": {
      "padding": { "padding_top": "Top padding" }
    },
    "collection-list": {
      "name": "Collection list",
      "settings": {
        "title": { "label": "Heading" }
      },
      "presets": { "name": "Collection list" }
    }
  }
}
"#;

pub const FR_SCHEMA: &str = r#"{
  "sections": {
    "all": {
      "padding": { "padding_top": "Marge haute" }
    },
    "collection-list": {
      "name": "Liste des collections",
      "settings": {
        "title": { "label": "Titre" }
      },
      "presets": { "name": "Liste des collections" }
    }
  }
}
"#;

/// A theme checkout with one section and en/fr locale files.
pub fn theme() -> (TempDir, ThemeLayout) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for sub in ["sections", "locales", "assets"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    fs::write(root.join("sections/collection-list.liquid"), COLLECTION_LIST).unwrap();
    fs::write(root.join("locales/en.default.json"), EN_BASE).unwrap();
    fs::write(root.join("locales/fr.json"), FR_BASE).unwrap();
    fs::write(root.join("locales/en.default.schema.json"), EN_SCHEMA).unwrap();
    fs::write(root.join("locales/fr.schema.json"), FR_SCHEMA).unwrap();
    let layout = ThemeLayout::new(root);
    (dir, layout)
}

pub fn locales() -> Vec<String> {
    vec!["en".to_string(), "fr".to_string()]
}

pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}
