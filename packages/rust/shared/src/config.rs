//! Application configuration for filterchain.
//!
//! User config lives at `~/.filterchain/filterchain.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FilterChainError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "filterchain.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".filterchain";

// ---------------------------------------------------------------------------
// Config structs (matching filterchain.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Named filter chains.
    #[serde(default)]
    pub chains: Vec<ChainEntry>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Filter names used when no chain is given on the command line.
    #[serde(default = "default_chain")]
    pub chain: Vec<String>,

    /// How command-line input literals are interpreted:
    /// "auto", "int", "float", "bool", "string" or "null".
    #[serde(default = "default_input_kind")]
    pub input_kind: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            chain: default_chain(),
            input_kind: default_input_kind(),
        }
    }
}

fn default_chain() -> Vec<String> {
    vec!["to-string".into(), "length".into()]
}
fn default_input_kind() -> String {
    "auto".into()
}

/// `[[chains]]` entry: a named, reusable filter sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Name used to select the chain (`--chain <name>`).
    pub name: String,
    /// Filter names in execution order.
    pub filters: Vec<String>,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AppConfig {
    /// Look up a named chain.
    pub fn chain(&self, name: &str) -> Option<&ChainEntry> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Filter names for the named chain, or the default chain when `name` is `None`.
    pub fn resolve_chain(&self, name: Option<&str>) -> Result<&[String]> {
        match name {
            Some(name) => self
                .chain(name)
                .map(|c| c.filters.as_slice())
                .ok_or_else(|| FilterChainError::config(format!("unknown chain `{name}`"))),
            None => Ok(self.defaults.chain.as_slice()),
        }
    }

    /// Reject chains that cannot be selected unambiguously by name.
    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        for chain in &self.chains {
            if chain.name.trim().is_empty() {
                return Err(FilterChainError::config("a chain has an empty name"));
            }
            if !names.insert(chain.name.as_str()) {
                return Err(FilterChainError::config(format!(
                    "chain `{}` is defined more than once",
                    chain.name
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "FILTERCHAIN_CONFIG";

/// Location of the config file: `$FILTERCHAIN_CONFIG` when set and non-empty,
/// else `~/.filterchain/filterchain.toml`.
pub fn config_file_path() -> Result<PathBuf> {
    resolve_config_path(std::env::var_os(CONFIG_PATH_ENV), dirs::home_dir())
}

fn resolve_config_path(overridden: Option<OsString>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = overridden.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let home =
        home.ok_or_else(|| FilterChainError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the config from [`config_file_path`]. A missing file yields defaults.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;
    match fs::read_to_string(&path) {
        Ok(content) => parse_config(&content, &path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(FilterChainError::io(path, e)),
    }
}

/// Load and validate the config at `path`, which must exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path).map_err(|e| FilterChainError::io(path, e))?;
    parse_config(&content, path)
}

fn parse_config(content: &str, origin: &Path) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)
        .map_err(|e| FilterChainError::config(format!("{}: {e}", origin.display())))?;
    config.validate()?;
    Ok(config)
}

/// Write the default config to [`config_file_path`].
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path, force)?;
    Ok(path)
}

/// Write the default config to `path`, creating parent directories.
///
/// An existing file is only replaced when `force` is set.
pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(FilterChainError::config(format!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        )));
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| FilterChainError::io(dir, e))?;
    }

    fs::write(path, render_config(&AppConfig::default())?)
        .map_err(|e| FilterChainError::io(path, e))?;
    info!(path = %path.display(), force, "wrote default config");
    Ok(())
}

/// Serialize a config to pretty TOML.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| FilterChainError::config(e.to_string()))
}
