//! Configuration loader and path helpers.
//!
//! Uses Figment to merge defaults + `config.toml` + `config.<env>.toml` +
//! `APP_*` env vars (`__` separates nested keys, e.g. `APP_INDEX__PATH`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// tantivy refuses writer arenas smaller than this per thread.
pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.search.max_limit < self.search.default_limit {
            anyhow::bail!(
                "search.max_limit ({}) is below search.default_limit ({})",
                self.search.max_limit,
                self.search.default_limit
            );
        }
        if self.search.fragment_chars == 0 {
            anyhow::bail!("search.fragment_chars must be positive");
        }
        if self.search.highlight_pre.is_empty() || self.search.highlight_post.is_empty() {
            anyhow::bail!("search.highlight_pre and search.highlight_post must not be empty");
        }
        if self.index.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            anyhow::bail!(
                "index.writer_heap_bytes ({}) is below the minimum of {}",
                self.index.writer_heap_bytes,
                MIN_WRITER_HEAP_BYTES
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub path: String,
    pub in_memory: bool,
    pub writer_heap_bytes: usize,
}

impl IndexSettings {
    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: "./data/search-index".to_string(),
            in_memory: false,
            writer_heap_bytes: 50_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// `memory` or a `sqlite://` URL.
    pub url: String,
    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { url: "sqlite://./data/documents.db".to_string(), max_connections: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub fragment_chars: usize,
    pub highlight_pre: String,
    pub highlight_post: String,
}

impl SearchSettings {
    /// Falls back to the default and clamps to the configured maximum.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            fragment_chars: 150,
            highlight_pre: "<mark>".to_string(),
            highlight_post: "</mark>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
