use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root of `config.yaml`. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aws: AwsConfig,
    pub vmware: VmwareConfig,
    pub evs: EvsConfig,
    pub security: SecurityConfig,
    pub monitoring: MonitoringConfig,
    pub migration: MigrationConfig,
    /// Extra tags applied to every cluster the toolkit creates.
    pub tags: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
    /// Named profile in the shared credentials file.
    pub profile: Option<String>,
    pub endpoints: EndpointOverrides,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            profile: None,
            endpoints: EndpointOverrides::default(),
        }
    }
}

/// Per-service endpoint URLs, for VPC endpoints or local test doubles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOverrides {
    pub evs: Option<String>,
    pub ec2: Option<String>,
    pub s3: Option<String>,
    pub cloudwatch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmwareConfig {
    pub vcenter_server: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: u16,
    pub ssl_verify: bool,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for VmwareConfig {
    fn default() -> Self {
        Self {
            vcenter_server: None,
            username: None,
            password: None,
            port: 443,
            ssl_verify: true,
            timeout_secs: 60,
        }
    }
}

impl VmwareConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvsConfig {
    pub default_cluster_name: Option<String>,
    /// Value of the `Environment` tag on created clusters.
    pub environment: String,
    pub instance_type: String,
    pub node_count: u32,
}

impl Default for EvsConfig {
    fn default() -> Self {
        Self {
            default_cluster_name: None,
            environment: "development".to_string(),
            instance_type: "i3.metal".to_string(),
            node_count: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Request server-side encryption for uploaded images.
    pub encrypt_uploads: bool,
    /// KMS key for SSE-KMS; SSE-S3 (AES256) is used when absent.
    pub kms_key_id: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encrypt_uploads: true,
            kms_key_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub namespace: String,
    pub metric_name: String,
    pub statistic: String,
    pub period_secs: u32,
    pub lookback_minutes: u32,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            namespace: "AWS/EVS".to_string(),
            metric_name: "ClusterHealth".to_string(),
            statistic: "Average".to_string(),
            period_secs: 300,
            lookback_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Staging bucket for exported images. Required for `migrate`.
    pub s3_bucket: Option<String>,
    pub s3_prefix: String,
    /// Local directory that receives OVF exports.
    pub export_path: PathBuf,
    /// Budget for a single vCenter task (snapshot create or revert).
    pub task_timeout_secs: u64,
    /// Budget for an EVS import task to reach a terminal state.
    pub import_timeout_secs: u64,
    pub poll_initial_ms: u64,
    pub poll_max_secs: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            s3_bucket: None,
            s3_prefix: "vm-imports/".to_string(),
            export_path: PathBuf::from("/tmp"),
            task_timeout_secs: 30 * 60,
            import_timeout_secs: 4 * 60 * 60,
            poll_initial_ms: 100,
            poll_max_secs: 5,
        }
    }
}

impl MigrationConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn import_timeout(&self) -> Duration {
        Duration::from_secs(self.import_timeout_secs)
    }

    pub fn poll_initial(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_secs(self.poll_max_secs)
    }
}
