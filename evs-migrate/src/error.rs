use evs_aws::AwsError;
use evs_vcenter::VCenterError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrationError>;

/// Fault raised by one of the sites during a migration step.
#[derive(Error, Debug, Clone)]
pub enum MigrationError {
    #[error(transparent)]
    Source(#[from] VCenterError),

    #[error(transparent)]
    Target(#[from] AwsError),

    #[error("{0}")]
    Other(String),
}
