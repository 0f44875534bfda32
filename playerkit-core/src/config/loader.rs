use std::path::{Path, PathBuf};

use super::types::{
    DEFAULT_LOG_FILTER, LoggingConfig, RawLoggingConfig, RawRuntimeConfig, RawScopeConfig,
    RuntimeConfig, ScopeConfig,
};
use crate::error::ConfigError;

/// Environment variable naming an extra config file layered on top
pub const CONFIG_ENV_VAR: &str = "PLAYERKIT_CONFIG";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a single TOML document and apply defaults
    pub fn from_toml_str(contents: &str) -> Result<RuntimeConfig, ConfigError> {
        let raw = Self::parse(contents)?;
        Self::finalize(raw)
    }

    /// Load a single config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<RuntimeConfig, ConfigError> {
        Self::load_layered(&[path.to_path_buf()])
    }

    /// Load several config files, later layers overriding earlier ones.
    ///
    /// Missing files are skipped. If `PLAYERKIT_CONFIG` is set, that file is
    /// applied last.
    pub fn load_layered(paths: &[PathBuf]) -> Result<RuntimeConfig, ConfigError> {
        let mut raw = RawRuntimeConfig::default();

        for path in paths {
            if let Some(layer) = Self::read_layer(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }

        // Layer N: explicit override from the environment
        if let Some(path) = Self::env_config_path()
            && let Some(layer) = Self::read_layer(&path)?
        {
            raw = Self::merge_raw(raw, layer);
        }

        Self::finalize(raw)
    }

    /// Path named by `PLAYERKIT_CONFIG`, if set
    pub fn env_config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from)
    }

    fn read_layer(path: &Path) -> Result<Option<RawRuntimeConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map(Some)
    }

    fn parse(contents: &str) -> Result<RawRuntimeConfig, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawRuntimeConfig, overlay: RawRuntimeConfig) -> RawRuntimeConfig {
        let mut scopes = base.scopes;
        for (name, scope) in overlay.scopes {
            let merged = match scopes.remove(&name) {
                Some(existing) => RawScopeConfig {
                    blacklist: scope.blacklist.or(existing.blacklist),
                },
                None => scope,
            };
            scopes.insert(name, merged);
        }

        RawRuntimeConfig {
            logging: RawLoggingConfig {
                filter: overlay.logging.filter.or(base.logging.filter),
                ansi: overlay.logging.ansi.or(base.logging.ansi),
                with_target: overlay.logging.with_target.or(base.logging.with_target),
            },
            scopes,
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawRuntimeConfig) -> Result<RuntimeConfig, ConfigError> {
        let defaults = LoggingConfig::default();
        let filter = raw
            .logging
            .filter
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        if filter.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logging.filter must not be empty".to_string(),
            ));
        }

        let mut scopes = std::collections::BTreeMap::new();
        for (name, scope) in raw.scopes {
            if let Some(id) = scope
                .blacklist
                .iter()
                .flatten()
                .find(|id| id.trim().is_empty())
            {
                return Err(ConfigError::Invalid(format!(
                    "scopes.{name}.blacklist contains an empty identifier {id:?}"
                )));
            }
            scopes.insert(
                name,
                ScopeConfig {
                    blacklist: scope.blacklist,
                },
            );
        }

        Ok(RuntimeConfig {
            logging: LoggingConfig {
                filter,
                ansi: raw.logging.ansi.unwrap_or(defaults.ansi),
                with_target: raw.logging.with_target.unwrap_or(defaults.with_target),
            },
            scopes,
        })
    }
}
