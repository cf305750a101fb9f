use blt::config::{self, BltConfig, Credentials};
use blt::db::Database;
use blt::describe::bibliographic::GoogleBooks;
use blt::describe::vision::OpenAiVision;
use blt::describe::{MetadataComposer, PlaceholderComposer, VisionComposer};
use blt::group::{self, LastSetOutcome};
use blt::imaging::{Quality, RustBackend, heic};
use blt::output;
use blt::publish::{ListingPublisher, VintedPublisher};
use blt::select::{Order, list_images};
use blt::storage::{LazyStore, ObjectStore, SupabaseStore};
use blt::upload::UploadOptions;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Marketplace name stored with every listing.
const PLATFORM: &str = "vinted";

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "blt")]
#[command(about = "Book listing automation: group photos, describe, publish")]
#[command(long_about = "\
Book listing automation: group photos, describe, publish

Photos land in a flat pool and are moved, a fixed number at a time, into
numbered book folders:

  photos_raw/                  # Pool (oldest → newest by mtime)
  photos_grouped/
  ├── .last_book_index         # Highest index ever allocated
  ├── book_001/
  │   ├── 01.jpg
  │   └── 02.heic
  └── book_002/

A book folder is then described (vision model + bibliographic lookup, or
the folder name when no credentials are set), published on Vinted through
Chrome, and recorded in SQLite.

Credentials come from the environment only:
  SUPABASE_SERVICE_ROLE_KEY, OPENAI_API_KEY, VINTED_EMAIL, VINTED_PASSWORD

Run 'blt gen-config' to generate a documented blt.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "blt.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct BrowserArgs {
    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database tables
    InitDb,
    /// Move the newest photos of the pool into a new book folder
    Group {
        /// Group the whole pool, oldest first, one folder per batch
        #[arg(long)]
        all: bool,
        /// With --all, stop after this many folders
        #[arg(long, requires = "all")]
        max_groups: Option<usize>,
    },
    /// Print the listing metadata for a book folder
    Describe { folder: PathBuf },
    /// Describe a book folder, publish it on Vinted and record it
    Vinted {
        folder: PathBuf,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Group the newest photos, then describe, publish and record the book
    Full(BrowserArgs),
    /// Convert HEIC/HEIF photos to JPEG next to the originals
    ConvertHeic {
        folder: PathBuf,
        /// Keep the HEIC files after converting
        #[arg(long)]
        keep_originals: bool,
        /// Only convert files directly inside the folder
        #[arg(long)]
        no_recursive: bool,
    },
    /// Print a stock blt.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    match cli.command {
        Command::InitDb => {
            let (config, _) = settings(&cli.config)?;
            let db = Database::open(Path::new(&config.database.path))?;
            db.init()?;
            println!("Database ready: {}", config.database.path);
        }
        Command::Group { all, max_groups } => {
            let (config, _) = settings(&cli.config)?;
            let raw = Path::new(&config.photos.raw_dir);
            let grouped = Path::new(&config.photos.grouped_dir);
            let per_book = config.photos.per_book;
            if all {
                let report = group::group_all(raw, grouped, per_book, max_groups)?;
                output::print_group_report(&report);
            } else {
                let outcome = group::group_last_set(raw, grouped, per_book)?;
                output::print_last_set(&outcome, per_book);
            }
        }
        Command::Describe { folder } => {
            let (config, credentials) = settings(&cli.config)?;
            let store = lazy_store(&config, &credentials);
            let composer = build_composer(&config, &credentials, &store)?;
            let metadata = composer.describe(&folder)?;
            output::print_metadata(&metadata);
        }
        Command::Vinted { folder, browser } => {
            let (config, credentials) = settings(&cli.config)?;
            let store = lazy_store(&config, &credentials);
            let composer = build_composer(&config, &credentials, &store)?;
            list_and_record(&config, &credentials, composer.as_ref(), &folder, browser.headless)?;
        }
        Command::Full(browser) => {
            let (config, credentials) = settings(&cli.config)?;
            let raw = Path::new(&config.photos.raw_dir);
            let grouped = Path::new(&config.photos.grouped_dir);
            let per_book = config.photos.per_book;
            let outcome = group::group_last_set(raw, grouped, per_book)?;
            output::print_last_set(&outcome, per_book);
            let LastSetOutcome::Created(folder) = outcome else {
                return Ok(());
            };
            let store = lazy_store(&config, &credentials);
            let composer = build_composer(&config, &credentials, &store)?;
            list_and_record(&config, &credentials, composer.as_ref(), &folder, browser.headless)?;
        }
        Command::ConvertHeic {
            folder,
            keep_originals,
            no_recursive,
        } => {
            let (config, _) = settings(&cli.config)?;
            let created = heic::convert_folder(
                &folder,
                !no_recursive,
                !keep_originals,
                Quality::new(config.vision.jpeg_quality),
            )?;
            output::print_heic_output(&created, &folder);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Config file layered over stock defaults and the environment, plus
/// credentials from the environment.
fn settings(path: &Path) -> Result<(BltConfig, Credentials), config::ConfigError> {
    let config = config::load_config(path)?;
    let credentials = Credentials::from_env();
    info!(config = %path.display(), ?credentials, "configuration loaded");
    Ok((config, credentials))
}

/// Storage handle that connects on first upload.
fn lazy_store(config: &BltConfig, credentials: &Credentials) -> LazyStore {
    let storage = config.storage.clone();
    let key = credentials.supabase_service_key.clone().unwrap_or_default();
    LazyStore::new(move || {
        let store = SupabaseStore::new(
            &storage.url,
            &storage.bucket,
            &key,
            Duration::from_secs(storage.timeout_secs),
        )?;
        Ok(Arc::new(store) as Arc<dyn ObjectStore>)
    })
}

/// The vision composer when storage and the model are configured, the
/// folder-name placeholder otherwise.
fn build_composer<'s>(
    config: &BltConfig,
    credentials: &Credentials,
    store: &'s LazyStore,
) -> Result<Box<dyn MetadataComposer + 's>, Box<dyn std::error::Error>> {
    let vision_ready = !config.storage.url.trim().is_empty()
        && credentials.supabase_service_key.is_some()
        && credentials.openai_api_key.is_some();
    if !vision_ready {
        warn!("storage or OpenAI credentials missing, describing from folder names");
        return Ok(Box::new(PlaceholderComposer {
            listing: config.listing.clone(),
        }));
    }

    let vision = OpenAiVision::new(
        &config.vision.api_base,
        &config.vision.model,
        credentials.openai_api_key.as_deref(),
        Duration::from_secs(config.vision.timeout_secs),
    )?;
    let lookup = GoogleBooks::new(
        &config.lookup.api_base,
        Duration::from_secs(config.lookup.timeout_secs),
    )?;
    Ok(Box::new(VisionComposer {
        store,
        backend: RustBackend::new(),
        vision,
        lookup,
        upload: UploadOptions::from_config(&config.vision),
        listing: config.listing.clone(),
    }))
}

/// Describe, publish, then record one book folder.
///
/// A publish failure is returned before anything is written to the database.
fn list_and_record(
    config: &BltConfig,
    credentials: &Credentials,
    composer: &dyn MetadataComposer,
    folder: &Path,
    headless: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open(Path::new(&config.database.path))?;
    db.init()?;

    let metadata = composer.describe(folder)?;
    output::print_metadata(&metadata);

    let publisher = VintedPublisher::new(&config.publish, credentials, headless)?;
    let url = publisher.publish(folder, &metadata)?;

    let photos: Vec<String> = list_images(folder, Order::Lexical)?
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    let book_id = db.record_listing(folder, &metadata, PLATFORM, &url, &photos)?;
    output::print_published(&metadata, &url, book_id);
    Ok(())
}
