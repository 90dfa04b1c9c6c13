use crate::identity::ScopePolicy;
use crate::model::Brand;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub offers: OffersConfig,
    #[serde(default)]
    pub favorites: FavoritesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffersConfig {
    #[serde(default = "default_tier_max_nights")]
    pub tier_max_nights: u32,
    #[serde(default)]
    pub normalize_display: bool,
    #[serde(default)]
    pub brand: Brand,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for OffersConfig {
    fn default() -> Self {
        Self {
            tier_max_nights: default_tier_max_nights(),
            normalize_display: false,
            brand: Brand::default(),
            base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl OffersConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FavoritesConfig {
    #[serde(default)]
    pub scope_policy: ScopePolicy,
}

/// Per-user preferences from `<config dir>/tideline/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Project and user config merged, with the output mode decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    /// One of `pretty`, `text`, `json`.
    pub resolved_output: String,
}

const PROJECT_CONFIG: &str = ".tideline/config.toml";

/// Parse a TOML file, treating a missing file as all defaults.
fn read_toml<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => return Err(err).with_context(|| format!("Failed to read {}", path.display())),
    };
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    read_toml(&project_root.join(PROJECT_CONFIG))
}

pub fn load_user_config() -> Result<UserConfig> {
    dirs::config_dir().map_or_else(
        || Ok(UserConfig::default()),
        |dir| read_toml(&dir.join("tideline").join("config.toml")),
    )
}

/// Load both config files, anchor a relative store dir at `project_root`,
/// and pick the output mode.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let mut project = load_project_config(project_root)?;
    if project.store.dir.is_relative() {
        project.store.dir = project_root.join(&project.store.dir);
    }
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = pick_output(
        cli_json,
        env_format.as_deref(),
        user.output.as_deref(),
        io::stdout().is_terminal(),
    );

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output: resolved_output.to_string(),
    })
}

fn output_alias(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// `--json`, then `FORMAT`, then the user file; unknown values fall through.
fn pick_output(cli_json: bool, env_format: Option<&str>, user_output: Option<&str>, tty: bool) -> &'static str {
    if cli_json {
        return "json";
    }
    env_format
        .and_then(output_alias)
        .or_else(|| user_output.and_then(output_alias))
        .unwrap_or(if tty { "pretty" } else { "text" })
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".tideline/store")
}

const fn default_lock_timeout_ms() -> u64 {
    2_000
}

const fn default_tier_max_nights() -> u32 {
    7
}

const fn default_request_timeout_ms() -> u64 {
    15_000
}
