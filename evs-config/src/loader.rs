// Standard library imports
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

// External crate imports
use indexmap::IndexMap;
use tracing::debug;

// Internal imports
use crate::config::{
    AwsConfig, Config, EvsConfig, MigrationConfig, MonitoringConfig, SecurityConfig, VmwareConfig,
};
use crate::validate;
use evs_core::error::{EvsError, Result};

/// Location used when no `--config` flag is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Environment variables that override file values at load time.
pub const ENV_OVERRIDES: [&str; 6] = [
    "AWS_REGION",
    "AWS_PROFILE",
    "VCENTER_SERVER",
    "VCENTER_USERNAME",
    "VCENTER_PASSWORD",
    "EVS_CLUSTER_NAME",
];

/// Loaded, validated configuration. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Loads `path` (or [`DEFAULT_CONFIG_PATH`]) and applies environment
    /// overrides from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// Same as [`ConfigManager::load`] with an explicit variable lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        if !path.is_file() {
            return Err(EvsError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        debug!("Loading config from: {}", path.display());
        let contents = fs::read_to_string(&path).map_err(|e| {
            EvsError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::parse(&contents, &path.display().to_string(), lookup)?;
        Ok(Self { path, config })
    }

    /// Builds a manager from YAML text without touching the filesystem.
    pub fn from_yaml<F>(contents: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::parse(contents, "<inline>", lookup)?;
        Ok(Self {
            path: PathBuf::from("<inline>"),
            config,
        })
    }

    /// Wraps an already-built configuration, validating it first.
    pub fn from_config(config: Config) -> Result<Self> {
        validate::validate(&config)?;
        Ok(Self {
            path: PathBuf::from("<memory>"),
            config,
        })
    }

    fn parse<F>(contents: &str, source: &str, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        // An empty file or a bare `~` means "all defaults".
        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml_ng::from_str::<Option<Config>>(contents)
                .map_err(|e| EvsError::Config(format!("Invalid YAML in {}: {}", source, e)))?
                .unwrap_or_default()
        };

        let applied = apply_env_overrides(&mut config, lookup);
        if !applied.is_empty() {
            debug!(overrides = ?applied, "Applied environment overrides");
        }

        validate::validate(&config)?;
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn aws(&self) -> &AwsConfig {
        &self.config.aws
    }

    pub fn vmware(&self) -> &VmwareConfig {
        &self.config.vmware
    }

    pub fn evs(&self) -> &EvsConfig {
        &self.config.evs
    }

    pub fn security(&self) -> &SecurityConfig {
        &self.config.security
    }

    pub fn monitoring(&self) -> &MonitoringConfig {
        &self.config.monitoring
    }

    pub fn migration(&self) -> &MigrationConfig {
        &self.config.migration
    }

    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.config.tags
    }
}

/// Overlay the variables in [`ENV_OVERRIDES`] onto `config`.
///
/// Empty values are ignored. Returns the names of the variables applied.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = Vec::new();
    for key in ENV_OVERRIDES {
        let Some(value) = lookup(key).filter(|v| !v.is_empty()) else {
            continue;
        };
        match key {
            "AWS_REGION" => config.aws.region = value,
            "AWS_PROFILE" => config.aws.profile = Some(value),
            "VCENTER_SERVER" => config.vmware.vcenter_server = Some(value),
            "VCENTER_USERNAME" => config.vmware.username = Some(value),
            "VCENTER_PASSWORD" => config.vmware.password = Some(value),
            "EVS_CLUSTER_NAME" => config.evs.default_cluster_name = Some(value),
            _ => continue,
        }
        applied.push(key);
    }
    applied
}
