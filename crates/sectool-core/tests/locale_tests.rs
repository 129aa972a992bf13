mod common;

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use sectool_core::edit::{self, PROVENANCE_BANNER};
use sectool_core::{
    BlockDefinition, BreakerState, CircuitBreaker, DuplicateStrategy, IdentityTranslator, LibreTranslateClient,
    LocaleMerger, ScaffoldOptions, SectionDocument, SectionError, SectionKey, SettingDefinition, ThemeLayout,
    ToolConfig, Translator, schema,
};

/// Prefixes every string with its target locale.
struct TaggingTranslator;

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate(&self, text: &str, target_locale: &str) -> sectool_core::Result<String> {
        Ok(format!("[{target_locale}] {text}"))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

fn merger(layout: &ThemeLayout, translator: Arc<dyn Translator>) -> LocaleMerger {
    LocaleMerger::open(layout, &common::locales(), "en", translator).unwrap()
}

fn scaffolded(layout: &ThemeLayout, translator: Arc<dyn Translator>) -> LocaleMerger {
    let m = merger(layout, translator);
    m.ensure_default_scaffold("nova-hero", "hero").unwrap();
    m
}

fn schema_tree(layout: &ThemeLayout, file: &str) -> serde_json::Value {
    edit::parse_locale_file(&layout.locales_dir().join(file)).unwrap()
}

#[test]
fn files_are_classified_by_name() {
    let (_dir, layout) = common::theme();
    std::fs::write(layout.locales_dir().join("de.json"), "{}").unwrap();
    std::fs::write(layout.locales_dir().join("notes.txt"), "").unwrap();
    let m = merger(&layout, Arc::new(IdentityTranslator));
    let names: Vec<String> = m
        .files()
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["en.default.json", "en.default.schema.json", "fr.json", "fr.schema.json"]);
    assert!(m.files()[1].is_default);
    assert!(!m.files()[3].is_default);
}

#[test]
fn duplicate_uses_each_file_convention() {
    let (_dir, layout) = common::theme();
    let report = merger(&layout, Arc::new(IdentityTranslator))
        .duplicate_section("collection-list", "nova-collection-list")
        .unwrap();
    assert_eq!(report.written.len(), 4);
    assert!(report.skipped.is_empty());

    let base = common::read(layout.locales_dir().join("fr.json"));
    assert!(base.starts_with(PROVENANCE_BANNER));
    assert!(base.contains("\"general\": { \"title\": \"Boutique\" },"));
    assert!(base.ends_with("\"title\": \"Collections\"\n    }\n  }\n}\n"));
    let base = edit::parse_locale_text(&base).unwrap();
    assert_eq!(base["sections"]["nova_collection_list"], json!({ "title": "Collections" }));

    let schema = schema_tree(&layout, "fr.schema.json");
    assert_eq!(
        schema["sections"]["nova-collection-list"],
        json!({
            "name": "# Liste des collections",
            "settings": { "title": { "label": "Titre" } },
            "presets": { "name": "# Liste des collections" }
        })
    );
    assert_eq!(schema["sections"]["collection-list"]["name"], "Liste des collections");
}

#[test]
fn repeated_duplicate_leaves_files_alone() {
    let (_dir, layout) = common::theme();
    let m = merger(&layout, Arc::new(IdentityTranslator));
    m.duplicate_section("collection-list", "nova-collection-list").unwrap();
    let snapshot: Vec<String> = m.files().iter().map(|f| common::read(&f.path)).collect();

    let report = m.duplicate_section("collection-list", "nova-collection-list").unwrap();
    assert!(report.written.is_empty());
    assert_eq!(report.skipped.len(), 4);
    let after: Vec<String> = m.files().iter().map(|f| common::read(&f.path)).collect();
    assert_eq!(after, snapshot);
}

#[test]
fn reparse_strategy_rewrites_whole_document() {
    let (_dir, layout) = common::theme();
    let m = merger(&layout, Arc::new(IdentityTranslator)).with_strategy(DuplicateStrategy::Reparse);
    m.duplicate_section("collection-list", "nova-collection-list").unwrap();

    let text = common::read(layout.locales_dir().join("en.default.schema.json"));
    let tree = edit::parse_locale_text(&text).unwrap();
    assert_eq!(text, edit::render_locale(&tree).unwrap());
    assert_eq!(tree["sections"]["nova-collection-list"]["name"], "# Collection list");
    assert_eq!(tree["sections"]["nova-collection-list"]["presets"]["name"], "# Collection list");

    let again = m.duplicate_section("collection-list", "nova-collection-list").unwrap();
    assert!(again.written.is_empty());
}

#[test]
fn file_without_source_is_skipped() {
    let (_dir, layout) = common::theme();
    std::fs::write(layout.locales_dir().join("fr.json"), "{ \"sections\": {} }").unwrap();
    let report = merger(&layout, Arc::new(IdentityTranslator))
        .duplicate_section("collection-list", "nova-collection-list")
        .unwrap();
    assert_eq!(report.written.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].0.ends_with("fr.json"));
    assert_eq!(common::read(layout.locales_dir().join("fr.json")), "{ \"sections\": {} }");
}

#[test]
fn setting_named_like_the_section_does_not_block_duplication() {
    let (_dir, layout) = common::theme();
    let schema = common::EN_SCHEMA.replace(
        "    \"collection-list\": {",
        "    \"featured\": {\n      \"settings\": { \"collection_list\": { \"label\": \"Collections\" } }\n    },\n    \"collection-list\": {",
    );
    std::fs::write(layout.locales_dir().join("en.default.schema.json"), &schema).unwrap();

    let report = merger(&layout, Arc::new(IdentityTranslator))
        .duplicate_section("collection-list", "nova-collection-list")
        .unwrap();
    assert_eq!(report.written.len(), 4);
    let tree = schema_tree(&layout, "en.default.schema.json");
    assert_eq!(tree["sections"]["nova-collection-list"]["name"], "# Collection list");
    assert_eq!(tree["sections"]["featured"]["settings"], json!({ "collection_list": { "label": "Collections" } }));
}

#[test]
fn structural_error_aborts_before_any_write() {
    let (_dir, layout) = common::theme();
    std::fs::write(layout.locales_dir().join("fr.schema.json"), "{ \"sections\": { \"collection-list\": {} }")
        .unwrap();
    let result = merger(&layout, Arc::new(IdentityTranslator)).duplicate_section("collection-list", "nova-collection-list");
    assert!(matches!(result, Err(SectionError::MalformedDocument(_))));
    assert_eq!(common::read(layout.locales_dir().join("en.default.json")), common::EN_BASE);
    assert_eq!(common::read(layout.locales_dir().join("en.default.schema.json")), common::EN_SCHEMA);
}

#[test]
fn ambiguous_file_aborts_duplication() {
    let (_dir, layout) = common::theme();
    std::fs::write(
        layout.locales_dir().join("en.default.json"),
        "{ \"sections\": { \"collection_list\": {}, \"collection-list\": {} } }",
    )
    .unwrap();
    let result = merger(&layout, Arc::new(IdentityTranslator)).duplicate_section("collection-list", "nova-collection-list");
    assert!(matches!(result, Err(SectionError::AmbiguousConvention { .. })));
    assert_eq!(common::read(layout.locales_dir().join("fr.json")), common::FR_BASE);
}

#[tokio::test]
async fn settings_are_localized_per_file() {
    let (_dir, layout) = common::theme();
    let m = scaffolded(&layout, Arc::new(TaggingTranslator));
    let settings = vec![
        SettingDefinition::new("richtext", "intro", "Intro").with_default("<p>Welcome</p>").with_info("Shown on top"),
        SettingDefinition::new("range", "gap", "Gap").with_range(0, 40, None).with_default(8),
        SettingDefinition::new("select", "layout", "Layout").with_option("Grid", "grid").with_option("List", "list"),
        SettingDefinition::new("text", "cta label", "Button").with_placeholder("Shop now"),
    ];
    let report = m.merge_settings("nova-hero", &settings).await.unwrap();
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.merges[0].1.added, vec!["intro", "gap", "layout", "cta_label"]);

    let en = schema_tree(&layout, "en.default.schema.json");
    assert_eq!(
        en["sections"]["nova-hero"]["settings"],
        json!({
            "intro": { "label": "Intro", "default": "<p>Welcome</p>", "info": "Shown on top" },
            "gap": { "label": "Gap" },
            "layout": {
                "label": "Layout",
                "options__1": { "label": "Grid" },
                "options__2": { "label": "List" }
            },
            "cta_label": { "label": "Button", "placeholder": "Shop now" }
        })
    );

    let fr = schema_tree(&layout, "fr.schema.json");
    assert_eq!(fr["sections"]["nova-hero"]["settings"]["intro"]["default"], "[fr] <p>Welcome</p>");
    assert_eq!(fr["sections"]["nova-hero"]["settings"]["layout"]["options__2"]["label"], "[fr] List");
    assert_eq!(fr["sections"]["nova-hero"]["name"], "# hero");
    assert_eq!(common::read(layout.locales_dir().join("fr.json")), common::FR_BASE);
}

#[tokio::test]
async fn translated_setting_is_not_replaced() {
    let (_dir, layout) = common::theme();
    let m = scaffolded(&layout, Arc::new(TaggingTranslator));
    m.merge_settings("nova-hero", &[SettingDefinition::new("text", "title", "Title")]).await.unwrap();
    let before = common::read(layout.locales_dir().join("fr.schema.json"));

    let report = m
        .merge_settings("nova-hero", &[SettingDefinition::new("text", "title", "Another title")])
        .await
        .unwrap();
    assert!(report.written.is_empty());
    assert_eq!(report.merges[0].1.skipped, vec!["title"]);
    assert_eq!(common::read(layout.locales_dir().join("fr.schema.json")), before);
}

#[tokio::test]
async fn merge_without_destination_subtree_conflicts() {
    let (_dir, layout) = common::theme();
    let m = merger(&layout, Arc::new(TaggingTranslator));
    let result = m.merge_settings("nova-missing", &[SettingDefinition::new("text", "title", "Title")]).await;
    assert!(matches!(result, Err(SectionError::Conflict(id)) if id == "nova-missing"));
    assert_eq!(common::read(layout.locales_dir().join("en.default.schema.json")), common::EN_SCHEMA);
}

#[tokio::test]
async fn blocks_carry_name_and_settings() {
    let (_dir, layout) = common::theme();
    let m = scaffolded(&layout, Arc::new(TaggingTranslator));
    let slide = BlockDefinition::new("slide", "Slide")
        .with_setting(SettingDefinition::new("image_picker", "image", "Image"))
        .with_setting(SettingDefinition::new("text", "caption", "Caption").with_default("Hello"));
    m.merge_blocks("nova-hero", &[slide.clone()]).await.unwrap();

    let fr = schema_tree(&layout, "fr.schema.json");
    assert_eq!(
        fr["sections"]["nova-hero"]["blocks"],
        json!({
            "slide": {
                "name": "[fr] Slide",
                "settings": {
                    "image": { "label": "[fr] Image" },
                    "caption": { "label": "[fr] Caption", "default": "[fr] Hello" }
                }
            }
        })
    );

    let again = m.merge_blocks("nova-hero", &[slide]).await.unwrap();
    assert!(again.written.is_empty());
    assert_eq!(again.merges[1].1.skipped, vec!["slide"]);
}

#[tokio::test]
async fn unavailable_service_keeps_source_text() {
    let (_dir, layout) = common::theme();
    let key = SectionKey::new("nova", "hero");
    SectionDocument::create(&layout, key.clone(), ScaffoldOptions::default()).unwrap().save().unwrap();

    let breaker = CircuitBreaker::new();
    breaker.trip();
    let client = LibreTranslateClient::new(&ToolConfig::default(), breaker.clone()).unwrap();
    let m = scaffolded(&layout, Arc::new(client));

    let intro = SettingDefinition::new("richtext", "intro", "Intro").with_default("<p>Welcome</p>");
    let mut doc = SectionDocument::open(&layout, &key.scoped()).unwrap();
    doc.merge_settings(vec![intro.clone()]).unwrap();
    doc.render().unwrap();
    let report = m.merge_settings(&key.scoped(), &[intro]).await.unwrap();
    assert_eq!(report.written.len(), 2);
    doc.save().unwrap();

    let fr = schema_tree(&layout, "fr.schema.json");
    assert_eq!(fr["sections"]["nova-hero"]["settings"]["intro"], json!({ "label": "Intro", "default": "<p>Welcome</p>" }));
    assert_eq!(breaker.state(), BreakerState::Unavailable);

    let saved = common::read(layout.section_path("nova-hero"));
    let intro = &schema::read(&saved).unwrap()["settings"][4];
    assert_eq!(intro["id"], "intro");
    assert_eq!(intro["default"], "t:sections.nova-hero.settings.intro.default");
}

#[tokio::test]
async fn only_the_designated_default_file_keeps_authored_text() {
    let (_dir, layout) = common::theme();
    let locales = layout.locales_dir();
    std::fs::rename(locales.join("en.default.schema.json"), locales.join("en.schema.json")).unwrap();
    let m = scaffolded(&layout, Arc::new(TaggingTranslator));

    m.merge_settings("nova-hero", &[SettingDefinition::new("text", "title", "Title")]).await.unwrap();
    let en = schema_tree(&layout, "en.schema.json");
    assert_eq!(en["sections"]["nova-hero"]["settings"]["title"]["label"], "[en] Title");
}

#[tokio::test]
async fn repeated_block_setting_is_reported() {
    let (_dir, layout) = common::theme();
    let m = scaffolded(&layout, Arc::new(TaggingTranslator));
    let slide = BlockDefinition::new("slide", "Slide")
        .with_setting(SettingDefinition::new("text", "caption", "Caption"))
        .with_setting(SettingDefinition::new("text", "caption", "Second caption"));
    let report = m.merge_blocks("nova-hero", &[slide]).await.unwrap();

    assert_eq!(report.merges[0].1.added, vec!["slide"]);
    assert_eq!(report.merges[0].1.skipped, vec!["slide.caption"]);
    let en = schema_tree(&layout, "en.default.schema.json");
    assert_eq!(en["sections"]["nova-hero"]["blocks"]["slide"]["settings"], json!({ "caption": { "label": "Caption" } }));
}

#[tokio::test]
async fn failed_request_trips_the_breaker() {
    let config = ToolConfig { translation_service_url: "http://127.0.0.1:9/".into(), ..ToolConfig::default() };
    let breaker = CircuitBreaker::new();
    let client = LibreTranslateClient::new(&config, breaker.clone()).unwrap();

    assert_eq!(client.translate("Title", "fr").await.unwrap(), "Title");
    assert_eq!(breaker.state(), BreakerState::Unavailable);
    assert_eq!(client.translate("Other", "fr").await.unwrap(), "Other");
}

#[tokio::test]
async fn unsupported_locale_is_an_error() {
    let client = LibreTranslateClient::new(&ToolConfig::default(), CircuitBreaker::new()).unwrap();
    assert!(matches!(client.translate("Title", "de").await, Err(SectionError::UnsupportedLocale(l)) if l == "de"));
}

#[test]
fn breaker_latches_until_reset() {
    let breaker = CircuitBreaker::new();
    assert!(breaker.is_available());
    breaker.trip();
    breaker.trip();
    assert_eq!(breaker.state(), BreakerState::Unavailable);
    breaker.reset();
    assert_eq!(breaker.state(), BreakerState::Available);
}
