//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from, in order of precedence:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! List-valued fields take figment array syntax in the environment, e.g.
//! `SWCACHE_SEED_LIST='["/", "/index.html"]'`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::GenerationName;
use crate::strategy::ShellPolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the generation this instance installs and activates.
    ///
    /// Change it whenever seeded or cached content changes.
    /// Set via SWCACHE_GENERATION.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Origin the worker is scoped to; relative seeds resolve against it and
    /// only responses from it are stored.
    ///
    /// Set via SWCACHE_ORIGIN.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Resources fetched and stored at install time.
    #[serde(default = "default_seed_list")]
    pub seed_list: Vec<String>,

    /// Path suffixes classified as static assets (case-insensitive).
    #[serde(default = "default_static_suffixes")]
    pub static_suffixes: Vec<String>,

    /// Path prefixes classified as API calls.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Schemes passed straight through in addition to every non-http(s) scheme.
    #[serde(default = "default_excluded_schemes")]
    pub excluded_schemes: Vec<String>,

    /// Strategy for shell/navigation requests.
    #[serde(default)]
    pub shell_policy: ShellPolicy,

    /// Path to the SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body the network layer will accept.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Seeds fetched concurrently during install.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,
}

fn default_generation() -> String {
    "swcache-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_seed_list() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_static_suffixes() -> Vec<String> {
    [
        ".png", ".jpg", ".jpeg", ".gif", ".webp", ".avif", ".svg", ".ico", ".woff", ".woff2", ".ttf", ".otf", ".eot",
        ".css", ".js", ".mjs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_excluded_schemes() -> Vec<String> {
    vec!["chrome-extension".into(), "moz-extension".into(), "safari-web-extension".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_install_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            origin: default_origin(),
            seed_list: default_seed_list(),
            static_suffixes: default_static_suffixes(),
            api_prefixes: default_api_prefixes(),
            excluded_schemes: default_excluded_schemes(),
            shell_policy: ShellPolicy::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            install_concurrency: default_install_concurrency(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured generation as a validated name.
    pub fn generation_name(&self) -> Result<GenerationName, Error> {
        GenerationName::new(self.generation.clone())
    }

    /// The configured origin URL.
    pub fn origin_url(&self) -> Result<Url, Error> {
        Url::parse(&self.origin).map_err(|e| Error::InvalidUrl(format!("origin {}: {e}", self.origin)))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
