//! Tool configuration module.
//!
//! Handles loading, validating, and layering `blt.toml`. Resolution order,
//! later layers winning:
//!
//! ```text
//! stock defaults  →  blt.toml (sparse)  →  environment variables
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [photos]
//! per_book = 2                  # PHOTOS_PER_BOOK
//! raw_dir = "photos_raw"        # RAW_DIR
//! grouped_dir = "photos_grouped" # GROUPED_DIR
//!
//! [vision]
//! max_images = 2                # VISION_MAX_IMAGES
//! upload_prefix = "vision"      # VISION_UPLOAD_PREFIX
//! signed_url_ttl = 300          # VISION_SIGNED_URL_TTL (seconds)
//! max_side = 1280               # VISION_MAX_SIDE
//! jpeg_quality = 85             # VISION_JPEG_QUALITY
//! model = "gpt-4o-mini"         # OPENAI_MODEL
//! api_base = "https://api.openai.com/v1"
//! timeout_secs = 60
//!
//! [lookup]
//! api_base = "https://www.googleapis.com/books/v1"
//! timeout_secs = 15
//!
//! [storage]
//! url = ""                      # SUPABASE_URL
//! bucket = "books"              # SUPABASE_BUCKET
//! timeout_secs = 30
//!
//! [listing]
//! price_min = 5.0               # PRICE_MIN
//! price_margin_eur = 2.0        # PRICE_MARGIN_EUR
//! location = ""                 # VINTED_LOCATION
//! shipping = ""                 # VINTED_SHIPPING
//!
//! [publish]
//! base_url = "https://www.vinted.pt"
//! timeout_secs = 30
//!
//! [database]
//! path = "blt.db"               # DB_PATH
//! ```
//!
//! Unknown keys are rejected to catch typos early. An environment variable
//! that is set but empty counts as unset.
//!
//! Secrets never live in the file: [`Credentials`] reads them from the
//! environment only.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

/// Tool configuration loaded from `blt.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BltConfig {
    /// Raw pool, grouped output and batch size.
    pub photos: PhotosConfig,
    /// Temporary upload and vision model settings.
    pub vision: VisionConfig,
    /// Bibliographic lookup service.
    pub lookup: LookupConfig,
    /// Object storage for temporary uploads.
    pub storage: StorageConfig,
    /// Pricing and description text.
    pub listing: ListingConfig,
    /// Marketplace browser automation.
    pub publish: PublishConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotosConfig {
    /// Photos per book (batch size).
    pub per_book: usize,
    pub raw_dir: String,
    pub grouped_dir: String,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            per_book: 2,
            raw_dir: "photos_raw".into(),
            grouped_dir: "photos_grouped".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisionConfig {
    /// Images uploaded per book for metadata extraction.
    pub max_images: usize,
    /// Key prefix of temporary uploads.
    pub upload_prefix: String,
    /// Signed URL lifetime in seconds.
    pub signed_url_ttl: u64,
    /// Longer edge bound of uploaded images, in pixels.
    pub max_side: u32,
    pub jpeg_quality: u32,
    pub model: String,
    /// OpenAI-compatible API root.
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            max_images: 2,
            upload_prefix: "vision".into(),
            signed_url_ttl: 300,
            max_side: 1280,
            jpeg_quality: 85,
            model: "gpt-4o-mini".into(),
            api_base: "https://api.openai.com/v1".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    /// Google Books API root.
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/books/v1".into(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`. Empty disables uploads.
    pub url: String,
    pub bucket: String,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            bucket: "books".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Base price in euros; never below 5.
    pub price_min: f64,
    /// Added on top of the base price.
    pub price_margin_eur: f64,
    /// Hand-delivery location mentioned in the description.
    pub location: String,
    /// Shipping alternative mentioned in the description.
    pub shipping: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            price_min: 5.0,
            price_margin_eur: 2.0,
            location: String::new(),
            shipping: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    pub base_url: String,
    /// Upper bound on every element wait.
    pub timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.vinted.pt".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "blt.db".into(),
        }
    }
}

impl BltConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.into()));

        if self.photos.per_book == 0 {
            return fail("photos.per_book must be at least 1");
        }
        if self.photos.raw_dir.trim().is_empty() || self.photos.grouped_dir.trim().is_empty() {
            return fail("photos.raw_dir and photos.grouped_dir must not be empty");
        }
        if self.photos.raw_dir == self.photos.grouped_dir {
            return fail("photos.raw_dir and photos.grouped_dir must differ");
        }
        if self.vision.max_images == 0 {
            return fail("vision.max_images must be at least 1");
        }
        if self.vision.upload_prefix.trim_matches('/').is_empty() {
            return fail("vision.upload_prefix must not be empty");
        }
        if self.vision.signed_url_ttl == 0 {
            return fail("vision.signed_url_ttl must be at least 1 second");
        }
        if self.vision.max_side == 0 {
            return fail("vision.max_side must be at least 1");
        }
        if !(1..=100).contains(&self.vision.jpeg_quality) {
            return fail("vision.jpeg_quality must be 1-100");
        }
        if self.storage.bucket.trim().is_empty() {
            return fail("storage.bucket must not be empty");
        }
        if self.vision.timeout_secs == 0
            || self.storage.timeout_secs == 0
            || self.lookup.timeout_secs == 0
            || self.publish.timeout_secs == 0
        {
            return fail("timeout_secs values must be at least 1");
        }
        for (name, value) in [
            ("listing.price_min", self.listing.price_min),
            ("listing.price_margin_eur", self.listing.price_margin_eur),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        if self.database.path.trim().is_empty() {
            return fail("database.path must not be empty");
        }
        Ok(())
    }

    /// Override fields from environment variables, looked up through `env`.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let env = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        parse_var(&env, "PHOTOS_PER_BOOK", &mut self.photos.per_book)?;
        string_var(&env, "RAW_DIR", &mut self.photos.raw_dir);
        string_var(&env, "GROUPED_DIR", &mut self.photos.grouped_dir);

        parse_var(&env, "VISION_MAX_IMAGES", &mut self.vision.max_images)?;
        string_var(&env, "VISION_UPLOAD_PREFIX", &mut self.vision.upload_prefix);
        parse_var(&env, "VISION_SIGNED_URL_TTL", &mut self.vision.signed_url_ttl)?;
        parse_var(&env, "VISION_MAX_SIDE", &mut self.vision.max_side)?;
        parse_var(&env, "VISION_JPEG_QUALITY", &mut self.vision.jpeg_quality)?;
        string_var(&env, "OPENAI_MODEL", &mut self.vision.model);

        string_var(&env, "SUPABASE_URL", &mut self.storage.url);
        string_var(&env, "SUPABASE_BUCKET", &mut self.storage.bucket);

        parse_var(&env, "PRICE_MIN", &mut self.listing.price_min)?;
        parse_var(&env, "PRICE_MARGIN_EUR", &mut self.listing.price_margin_eur)?;
        string_var(&env, "VINTED_LOCATION", &mut self.listing.location);
        string_var(&env, "VINTED_SHIPPING", &mut self.listing.shipping);

        string_var(&env, "DB_PATH", &mut self.database.path);
        Ok(())
    }
}

fn string_var(env: &impl Fn(&str) -> Option<String>, var: &'static str, target: &mut String) {
    if let Some(value) = env(var) {
        *target = value;
    }
}

fn parse_var<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(value) = env(var) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value })?;
    }
    Ok(())
}

/// Secrets, read from the environment only.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub supabase_service_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub vinted_email: Option<String>,
    pub vinted_password: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let get = |var: &str| env(var).filter(|v| !v.trim().is_empty());
        Self {
            supabase_service_key: get("SUPABASE_SERVICE_ROLE_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            vinted_email: get("VINTED_EMAIL"),
            vinted_password: get("VINTED_PASSWORD"),
        }
    }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("supabase_service_key", &mask(&self.supabase_service_key))
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("vinted_email", &mask(&self.vinted_email))
            .field("vinted_password", &mask(&self.vinted_password))
            .finish()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BltConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, apply environment overrides,
/// then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BltConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let mut config: BltConfig = merged.try_into()?;
    config.apply_env(env)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, layered over stock defaults and under the
/// process environment.
pub fn load_config(path: &Path) -> Result<BltConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    resolve_config(stock_defaults_value(), overlay, |var| std::env::var(var).ok())
}

/// Returns a fully-commented stock `blt.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# blt Configuration
# =================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Environment variables (shown next to each key) override this file.
# Credentials are never read from here; set them in the environment:
#   SUPABASE_SERVICE_ROLE_KEY, OPENAI_API_KEY, VINTED_EMAIL, VINTED_PASSWORD
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Photo batching
# ---------------------------------------------------------------------------
[photos]
# Photos taken per book. Each book folder receives exactly this many.
per_book = 2              # PHOTOS_PER_BOOK

# Flat staging directory the camera import writes into.
raw_dir = "photos_raw"    # RAW_DIR

# Root of the book_NNN folders.
grouped_dir = "photos_grouped"  # GROUPED_DIR

# ---------------------------------------------------------------------------
# Metadata extraction (vision model + temporary uploads)
# ---------------------------------------------------------------------------
[vision]
# Photos per book sent to the model (first ones, by file name).
max_images = 2            # VISION_MAX_IMAGES

# Storage key prefix for temporary uploads. Uploads are deleted right after use.
upload_prefix = "vision"  # VISION_UPLOAD_PREFIX

# Lifetime of the signed URLs handed to the model, in seconds.
signed_url_ttl = 300      # VISION_SIGNED_URL_TTL

# Longer edge of uploaded images, in pixels. Smaller images are not upscaled.
max_side = 1280           # VISION_MAX_SIDE

# JPEG quality of uploaded images (1 = worst, 100 = best).
jpeg_quality = 85         # VISION_JPEG_QUALITY

model = "gpt-4o-mini"     # OPENAI_MODEL
api_base = "https://api.openai.com/v1"
timeout_secs = 60

# ---------------------------------------------------------------------------
# Bibliographic lookup (Google Books)
# ---------------------------------------------------------------------------
[lookup]
api_base = "https://www.googleapis.com/books/v1"
timeout_secs = 15

# ---------------------------------------------------------------------------
# Object storage (Supabase)
# ---------------------------------------------------------------------------
[storage]
# Project URL. Leave empty to describe books without the vision model.
url = ""                  # SUPABASE_URL
bucket = "books"          # SUPABASE_BUCKET
timeout_secs = 30

# ---------------------------------------------------------------------------
# Listing text and price
# ---------------------------------------------------------------------------
[listing]
# Price = max(price_min, 5) + price_margin_eur
price_min = 5.0           # PRICE_MIN
price_margin_eur = 2.0    # PRICE_MARGIN_EUR

# Hand-delivery location and shipping alternative quoted in the description.
location = ""             # VINTED_LOCATION
shipping = ""             # VINTED_SHIPPING

# ---------------------------------------------------------------------------
# Marketplace
# ---------------------------------------------------------------------------
[publish]
base_url = "https://www.vinted.pt"
# Upper bound on each wait for a page element, in seconds.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Persistence
# ---------------------------------------------------------------------------
[database]
path = "blt.db"           # DB_PATH
"##
}
