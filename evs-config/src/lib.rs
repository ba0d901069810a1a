//! Configuration for the VCF to EVS migration toolkit.
//!
//! A single YAML file (default `config/config.yaml`) is loaded once at
//! startup, overlaid with environment variables, validated, and then exposed
//! read-only through [`ConfigManager`].

pub mod config;
pub mod loader;
pub mod validate;

pub use config::{
    AwsConfig, Config, EndpointOverrides, EvsConfig, MigrationConfig, MonitoringConfig,
    SecurityConfig, VmwareConfig,
};
pub use loader::{apply_env_overrides, ConfigManager, DEFAULT_CONFIG_PATH, ENV_OVERRIDES};
