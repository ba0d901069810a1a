//! AWS side of the VCF to EVS toolkit.
//!
//! Low-level service bindings ([`EvsApi`], [`SubnetApi`], [`ObjectStore`],
//! [`MetricsApi`]) are implemented over signed HTTP by [`AwsClient`]. The
//! higher-level [`EvsClient`] and [`CloudWatchMonitor`] compose them into the
//! operations the CLI and the migrator use.

pub mod client;
pub mod cloudwatch;
pub mod credentials;
pub mod ec2;
pub mod error;
pub mod evs;
pub mod evs_client;
pub mod monitoring;
pub mod region;
pub mod s3;
pub mod signing;
mod timestamp;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use client::AwsClient;
pub use cloudwatch::{Datapoint, MetricQuery, MetricsApi};
pub use credentials::AwsCredentials;
pub use ec2::{Filter, SubnetApi};
pub use error::{AwsError, AwsErrorKind, AwsResult};
pub use evs::{
    ClusterRecord, CreateClusterRequest, CreatedCluster, EvsApi, ImportStatus, ImportTask,
    MigratedVm, StartVmImportRequest,
};
pub use evs_client::{ClusterInfo, ClusterSpec, EvsBackends, EvsClient, EvsSettings};
pub use monitoring::{CloudWatchMonitor, ClusterMetrics};
pub use s3::{ObjectStore, PutOptions, S3Location, ServerSideEncryption};

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockAws;
