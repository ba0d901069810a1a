use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;
use evs_core::error::{EvsError, Result};

/// AWS region names: `us-west-2`, `eu-central-1`, `us-gov-west-1`, `cn-north-1`.
static REGION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-\d{1,2}$")
        .expect("Region regex should compile - this is a static pattern")
});

/// S3 bucket naming rules, minus the IP-address and prefix/suffix exceptions.
static BUCKET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$")
        .expect("Bucket regex should compile - this is a static pattern")
});

pub fn is_valid_region(region: &str) -> bool {
    REGION_REGEX.is_match(region)
}

/// Structural checks on a loaded configuration.
///
/// vCenter credentials are not required here; they are checked when a
/// vCenter client is built, so cluster-only commands work without them.
pub fn validate(config: &Config) -> Result<()> {
    let mut problems = Vec::new();

    if !is_valid_region(&config.aws.region) {
        problems.push(format!("aws.region '{}' is not a valid AWS region", config.aws.region));
    }
    if config.vmware.port == 0 {
        problems.push("vmware.port must be between 1 and 65535".to_string());
    }
    if config.evs.node_count == 0 {
        problems.push("evs.node_count must be at least 1".to_string());
    }
    if config.evs.instance_type.trim().is_empty() {
        problems.push("evs.instance_type must not be empty".to_string());
    }
    if let Some(bucket) = &config.migration.s3_bucket {
        if !BUCKET_REGEX.is_match(bucket) {
            problems.push(format!("migration.s3_bucket '{}' is not a valid bucket name", bucket));
        }
    }
    if config.migration.s3_prefix.starts_with('/') {
        problems.push("migration.s3_prefix must not start with '/'".to_string());
    }
    if config.migration.poll_initial_ms == 0 {
        problems.push("migration.poll_initial_ms must be at least 1".to_string());
    }
    if config.migration.poll_max_secs == 0 {
        problems.push("migration.poll_max_secs must be at least 1".to_string());
    }
    if config.migration.poll_initial() > config.migration.poll_max() {
        problems.push(format!(
            "migration.poll_initial_ms ({}) must not exceed migration.poll_max_secs ({}s)",
            config.migration.poll_initial_ms, config.migration.poll_max_secs
        ));
    }
    if config.monitoring.period_secs == 0 || config.monitoring.period_secs % 60 != 0 {
        problems.push("monitoring.period_secs must be a positive multiple of 60".to_string());
    }
    for key in config.tags.keys() {
        if key.is_empty() || key.starts_with("aws:") {
            problems.push(format!("tag key '{}' is reserved or empty", key));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(EvsError::Config(problems.join("; ")))
    }
}
