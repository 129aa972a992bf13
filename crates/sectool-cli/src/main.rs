use clap::{Args as ClapArgs, Parser, Subcommand};
use sectool_core::{
    BlockDefinition, CircuitBreaker, DuplicateStrategy, IdentityTranslator, LibreTranslateClient, LocaleMerger,
    LocaleReport, MergeReport, ScaffoldOptions, SectionDocument, SectionError, SectionKey, SettingDefinition,
    ThemeLayout, ToolConfig, Translator,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "sectool",
    about = "Create, duplicate and extend theme sections and their locale files",
    version
)]
struct Cli {
    /// Theme root (contains sections/, locales/, assets/)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a new prefixed section from scratch
    SectionCreate(CreateArgs),
    /// Duplicate an existing section under a prefix
    SectionDuplicate(DuplicateArgs),
    /// Add settings (JSON array file) to a section
    SettingAdd(MergeArgs),
    /// Add blocks (JSON array file) to a section
    BlockAdd(MergeArgs),
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
    /// Prefix, e.g. nova
    #[arg(long)]
    prefix: String,
    /// Section name, e.g. your-section-name
    #[arg(long)]
    name: String,
    /// Generate and import a stylesheet
    #[arg(long, default_value_t = false)]
    css: bool,
    /// Generate and import a script
    #[arg(long, default_value_t = false)]
    js: bool,
    /// Skip heading/content settings
    #[arg(long, default_value_t = false)]
    no_base_settings: bool,
    /// Skip padding settings
    #[arg(long, default_value_t = false)]
    no_padding: bool,
}

#[derive(ClapArgs, Debug)]
struct DuplicateArgs {
    /// Prefix, e.g. nova
    #[arg(long)]
    prefix: String,
    /// Section to duplicate, e.g. collection-list
    #[arg(long)]
    name: String,
    /// Comma separated locales (defaults to supportedLanguages from the config)
    #[arg(long, value_delimiter = ',')]
    locales: Vec<String>,
    /// Generate and import a stylesheet
    #[arg(long, default_value_t = false)]
    css: bool,
    /// Generate and import a script
    #[arg(long, default_value_t = false)]
    js: bool,
    /// Reserialize locale files instead of splicing (drops custom formatting)
    #[arg(long, default_value_t = false)]
    reparse: bool,
}

#[derive(ClapArgs, Debug)]
struct MergeArgs {
    /// Section file name without extension, e.g. nova-collection-list
    #[arg(long)]
    section: String,
    /// JSON file holding an array of definitions
    #[arg(long, value_name = "JSON")]
    file: PathBuf,
    /// Store authored text in every locale instead of calling the translation service
    #[arg(long, default_value_t = false)]
    no_translate: bool,
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "sectool=info,sectool_core=info",
        1 => "sectool=debug,sectool_core=debug",
        _ => "sectool=trace,sectool_core=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let layout = ThemeLayout::new(cli.root);
    if !layout.is_theme_root() {
        fail(&SectionError::SourceNotFound(format!("sections directory under {}", layout.root().display())));
    }
    let config = ToolConfig::load(layout.root()).unwrap_or_else(|e| fail(&e));

    let res = match cli.cmd {
        Cmd::SectionCreate(a) => cmd_create(&layout, &config, a),
        Cmd::SectionDuplicate(a) => cmd_duplicate(&layout, &config, a),
        Cmd::SettingAdd(a) => cmd_setting_add(&layout, &config, a).await,
        Cmd::BlockAdd(a) => cmd_block_add(&layout, &config, a).await,
    };
    if let Err(e) = res {
        fail(&e);
    }
}

fn fail(e: &SectionError) -> ! {
    eprintln!("error: {}", e);
    std::process::exit(exit_code(e));
}

fn exit_code(e: &SectionError) -> i32 {
    match e {
        SectionError::SourceNotFound(_) => 2,
        SectionError::DestinationExists(_) => 3,
        SectionError::MalformedDocument(_) | SectionError::AmbiguousConvention { .. } => 4,
        SectionError::Conflict(_) | SectionError::DuplicateIdentifier { .. } => 5,
        SectionError::UnsupportedLocale(_) | SectionError::Config(_) => 6,
        _ => 1,
    }
}

fn cmd_create(layout: &ThemeLayout, config: &ToolConfig, args: CreateArgs) -> Result<(), SectionError> {
    let key = SectionKey::new(args.prefix, args.name);
    let opts = ScaffoldOptions { base_settings: !args.no_base_settings, padding_settings: !args.no_padding };
    let mut doc = SectionDocument::create(layout, key.clone(), opts)?;
    if args.js {
        doc.add_script_import()?;
    }
    if args.css {
        doc.add_style_import()?;
    }
    doc.render()?;

    let merger = LocaleMerger::open(
        layout,
        std::slice::from_ref(&config.default_language),
        config.default_language.clone(),
        Arc::new(IdentityTranslator),
    )?;
    let report = merger.ensure_default_scaffold(&key.scoped(), &key.id)?;
    create_assets(layout, &key, args.css, args.js)?;
    doc.save()?;
    print_locale_report(&report);
    println!("created {}", doc.destination().display());
    Ok(())
}

fn cmd_duplicate(layout: &ThemeLayout, config: &ToolConfig, args: DuplicateArgs) -> Result<(), SectionError> {
    let key = SectionKey::new(args.prefix, args.name);
    let mut doc = SectionDocument::duplicate(layout, key.clone())?;
    doc.scope_style()?.prefix_translation_namespace()?;
    if args.css {
        doc.add_style_import()?;
    }
    if args.js {
        doc.add_script_import()?;
    }
    doc.render()?;

    let locales = if args.locales.is_empty() { config.supported_languages.clone() } else { args.locales };
    let strategy = if args.reparse { DuplicateStrategy::Reparse } else { DuplicateStrategy::Splice };
    let merger = LocaleMerger::open(layout, &locales, config.default_language.clone(), Arc::new(IdentityTranslator))?
        .with_strategy(strategy);
    let report = merger.duplicate_section(&key.id, &key.scoped())?;
    create_assets(layout, &key, args.css, args.js)?;
    doc.save()?;
    print_locale_report(&report);
    println!("created {}", doc.destination().display());
    Ok(())
}

async fn cmd_setting_add(layout: &ThemeLayout, config: &ToolConfig, args: MergeArgs) -> Result<(), SectionError> {
    let settings: Vec<SettingDefinition> = read_definitions(&args.file)?;
    for s in &settings {
        if !sectool_core::namespace::is_known_setting_type(&s.kind) {
            tracing::warn!(id = %s.id, kind = %s.kind, "unknown setting type");
        }
    }
    let mut doc = SectionDocument::open(layout, &args.section)?;
    let mut fresh = Vec::new();
    for s in settings {
        if doc.has_setting(&s.id)? {
            warn_duplicate(args.section.as_str(), &sectool_core::namespace::normalize_id(&s.id));
        } else {
            fresh.push(s);
        }
    }
    doc.merge_settings(fresh.clone())?;
    let rendered = doc.render()?;
    let added = only_added(&fresh, &rendered.report, |s| sectool_core::namespace::normalize_id(&s.id));

    if !added.is_empty() {
        let merger = locale_merger(layout, config, args.no_translate).await?;
        let report = merger.merge_settings(&args.section, &added).await?;
        print_locale_report(&report);
    }
    doc.save()?;
    print_merge_report("settings", &rendered.report);
    Ok(())
}

async fn cmd_block_add(layout: &ThemeLayout, config: &ToolConfig, args: MergeArgs) -> Result<(), SectionError> {
    let blocks: Vec<BlockDefinition> = read_definitions(&args.file)?;
    let mut doc = SectionDocument::open(layout, &args.section)?;
    let mut fresh = Vec::new();
    for b in blocks {
        if doc.has_block_type(&b.kind)? {
            warn_duplicate(args.section.as_str(), &b.kind);
        } else {
            fresh.push(b);
        }
    }
    doc.merge_blocks(fresh.clone())?;
    let rendered = doc.render()?;
    let added = only_added(&fresh, &rendered.report, |b| b.kind.clone());

    if !added.is_empty() {
        let merger = locale_merger(layout, config, args.no_translate).await?;
        let report = merger.merge_blocks(&args.section, &added).await?;
        print_locale_report(&report);
    }
    doc.save()?;
    print_merge_report("blocks", &rendered.report);
    Ok(())
}

async fn locale_merger(layout: &ThemeLayout, config: &ToolConfig, offline: bool) -> Result<LocaleMerger, SectionError> {
    let translator: Arc<dyn Translator> = if offline {
        Arc::new(IdentityTranslator)
    } else {
        let client = LibreTranslateClient::new(config, CircuitBreaker::new())?;
        if !client.is_available().await {
            tracing::warn!(url = %config.translation_service_url, "translation service unavailable, keeping source text");
        }
        Arc::new(client)
    };
    LocaleMerger::open(layout, &config.supported_languages, config.default_language.clone(), translator)
}

fn read_definitions<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, SectionError> {
    let data = std::fs::read_to_string(path).map_err(|e| SectionError::io(path, e))?;
    Ok(serde_json::from_str(&data)?)
}

/// Items whose id made it into the template; duplicates stay out of the locale merge.
fn only_added<T: Clone>(items: &[T], report: &MergeReport, id: impl Fn(&T) -> String) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        let item_id = id(item);
        if report.added.contains(&item_id) && !seen.contains(&item_id) {
            seen.push(item_id);
            out.push(item.clone());
        }
    }
    out
}

fn create_assets(layout: &ThemeLayout, key: &SectionKey, css: bool, js: bool) -> Result<(), SectionError> {
    if css {
        layout.create_stylesheet(&key.scoped())?;
    }
    if js {
        layout.create_script(&key.scoped())?;
    }
    Ok(())
}

fn print_merge_report(what: &str, report: &MergeReport) {
    if !report.added.is_empty() {
        println!("added {}: {}", what, report.added.join(", "));
    }
    if !report.is_clean() {
        for id in &report.skipped {
            warn_duplicate(what, id);
        }
    }
}

fn warn_duplicate(scope: impl Into<String>, id: &str) {
    let e = SectionError::DuplicateIdentifier { scope: scope.into(), id: id.to_string() };
    eprintln!("warning: {}, skipped", e);
}

fn print_locale_report(report: &LocaleReport) {
    for path in &report.written {
        println!("updated {}", path.display());
    }
    for (path, reason) in &report.skipped {
        eprintln!("warning: {}: {}", path.display(), reason);
    }
    for (path, merge) in &report.merges {
        for id in &merge.skipped {
            warn_duplicate(path.display().to_string(), id);
        }
    }
}
