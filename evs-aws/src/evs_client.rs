//! Cluster lifecycle and VM import on top of the raw service bindings.
//!
//! Cluster operations are single round trips with no local retry; provider
//! faults propagate unchanged. Import waiting is the one place this client
//! loops, and it is bounded by a [`PollConfig`] and a [`CancellationToken`].

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::client::AwsClient;
use crate::ec2::{Filter, SubnetApi};
use crate::error::{AwsError, AwsResult};
use crate::evs::{
    ClusterRecord, CreateClusterRequest, CreatedCluster, EvsApi, ImportStatus, ImportTask,
    MigratedVm, StartVmImportRequest, Tag,
};
use crate::s3::{ObjectStore, PutOptions, S3Location, ServerSideEncryption};
use evs_config::{Config, EvsConfig, MigrationConfig, SecurityConfig};
use evs_core::{poll_until, CancellationToken, PollConfig, PollOutcome, WaitError};
use evs_logging::Logger;

/// Marker written to the `ManagedBy` tag of every cluster this toolkit creates.
pub const MANAGED_BY: &str = "vcf-evs-toolkit";

/// Upper bound on auto-discovered subnets for a new cluster.
pub const MAX_DEFAULT_SUBNETS: usize = 3;

/// Cluster view returned to callers.
///
/// `list_clusters` fills the summary fields; `get_cluster_status` adds the
/// detail fields. Nothing is cached between calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterInfo {
    pub name: String,
    pub status: String,
    pub node_count: u32,
    pub region: String,
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<String>,
}

impl ClusterInfo {
    fn from_record(record: ClusterRecord, region: &str) -> Self {
        Self {
            name: record.cluster_name,
            status: record.cluster_status,
            node_count: record.node_count,
            region: region.to_string(),
            cluster_id: record.cluster_id,
            created_at: record.created_at,
            vpc_id: record.vpc_id,
            subnet_ids: record.subnet_ids,
        }
    }
}

/// Parameters for a new cluster. Unset fields fall back to `evs` config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSpec {
    pub name: String,
    pub instance_type: Option<String>,
    pub node_count: Option<u32>,
    pub subnet_ids: Vec<String>,
    pub environment: Option<String>,
}

impl ClusterSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn node_count(mut self, count: u32) -> Self {
        self.node_count = Some(count);
        self
    }

    pub fn subnet_ids(mut self, ids: Vec<String>) -> Self {
        self.subnet_ids = ids;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}

/// Configuration slices the client needs.
#[derive(Debug, Clone, Default)]
pub struct EvsSettings {
    pub region: String,
    pub defaults: EvsConfig,
    pub migration: MigrationConfig,
    pub security: SecurityConfig,
    pub tags: IndexMap<String, String>,
}

impl EvsSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            region: config.aws.region.clone(),
            defaults: config.evs.clone(),
            migration: config.migration.clone(),
            security: config.security.clone(),
            tags: config.tags.clone(),
        }
    }
}

/// Service bindings the client talks to.
pub struct EvsBackends {
    pub evs: Box<dyn EvsApi>,
    pub subnets: Box<dyn SubnetApi>,
    pub store: Box<dyn ObjectStore>,
}

impl EvsBackends {
    /// All three bindings served by one signed HTTP client.
    pub fn http(client: AwsClient) -> Self {
        Self {
            evs: Box::new(client.clone()),
            subnets: Box::new(client.clone()),
            store: Box::new(client),
        }
    }
}

pub struct EvsClient {
    settings: EvsSettings,
    evs: Box<dyn EvsApi>,
    subnets: Box<dyn SubnetApi>,
    store: Box<dyn ObjectStore>,
    log: Logger,
}

impl EvsClient {
    pub fn new(settings: EvsSettings, backends: EvsBackends, log: Logger) -> Self {
        Self {
            settings,
            evs: backends.evs,
            subnets: backends.subnets,
            store: backends.store,
            log,
        }
    }

    /// HTTP-backed client for the configured region and profile.
    pub fn from_config(config: &Config, log: &Logger) -> AwsResult<Self> {
        let client = AwsClient::from_config(&config.aws)?;
        Ok(Self::new(
            EvsSettings::from_config(config),
            EvsBackends::http(client),
            log.component("evs"),
        ))
    }

    pub fn region(&self) -> &str {
        &self.settings.region
    }

    pub fn settings(&self) -> &EvsSettings {
        &self.settings
    }

    pub fn list_clusters(&self) -> AwsResult<Vec<ClusterInfo>> {
        let _span = self.log.enter();
        let records = self.evs.describe_clusters().map_err(|e| {
            warn!("AWS error listing clusters: {}", e);
            e
        })?;
        debug!(count = records.len(), "Listed EVS clusters");
        Ok(records
            .into_iter()
            .map(|record| ClusterInfo::from_record(record, &self.settings.region))
            .collect())
    }

    /// Create a cluster, discovering default subnets when none are given.
    pub fn create_cluster(&self, spec: &ClusterSpec) -> AwsResult<CreatedCluster> {
        let _span = self.log.enter();
        if spec.name.trim().is_empty() {
            return Err(AwsError::validation("evs", "Cluster name must not be empty"));
        }

        let subnet_ids = if spec.subnet_ids.is_empty() {
            self.default_subnets()?
        } else {
            spec.subnet_ids.clone()
        };
        if subnet_ids.is_empty() {
            return Err(AwsError::validation(
                "evs",
                format!(
                    "No subnets supplied and no default subnets available in {}",
                    self.settings.region
                ),
            ));
        }

        let defaults = &self.settings.defaults;
        let environment = spec
            .environment
            .clone()
            .unwrap_or_else(|| defaults.environment.clone());
        let request = CreateClusterRequest {
            cluster_name: spec.name.clone(),
            instance_type: spec
                .instance_type
                .clone()
                .unwrap_or_else(|| defaults.instance_type.clone()),
            node_count: spec.node_count.unwrap_or(defaults.node_count),
            subnet_ids,
            tags: self.cluster_tags(&environment),
            client_token: uuid::Uuid::new_v4().to_string(),
        };

        info!(
            cluster = %request.cluster_name,
            instance_type = %request.instance_type,
            node_count = request.node_count,
            subnets = ?request.subnet_ids,
            "Creating EVS cluster"
        );
        self.evs.create_cluster(&request).map_err(|e| {
            warn!("Failed to create cluster {}: {}", spec.name, e);
            e
        })
    }

    /// Provenance tags first, then configured tags that do not collide.
    fn cluster_tags(&self, environment: &str) -> Vec<Tag> {
        let mut tags = vec![
            Tag {
                key: "Environment".to_string(),
                value: environment.to_string(),
            },
            Tag {
                key: "ManagedBy".to_string(),
                value: MANAGED_BY.to_string(),
            },
        ];
        for (key, value) in &self.settings.tags {
            if key != "Environment" && key != "ManagedBy" {
                tags.push(Tag {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
        tags
    }

    pub fn delete_cluster(&self, cluster_id: &str) -> AwsResult<bool> {
        let _span = self.log.enter();
        self.evs.delete_cluster(cluster_id).map_err(|e| {
            warn!("Failed to delete cluster {}: {}", cluster_id, e);
            e
        })?;
        info!(cluster_id, "Requested EVS cluster deletion");
        Ok(true)
    }

    pub fn get_cluster_status(&self, cluster_id: &str) -> AwsResult<ClusterInfo> {
        let _span = self.log.enter();
        let record = self.evs.describe_cluster(cluster_id).map_err(|e| {
            warn!("Failed to get cluster status {}: {}", cluster_id, e);
            e
        })?;
        Ok(ClusterInfo::from_record(record, &self.settings.region))
    }

    /// Up to three default, available subnets in provider order.
    pub fn default_subnets(&self) -> AwsResult<Vec<String>> {
        let filters = [
            Filter::new("default-for-az", &["true"]),
            Filter::new("state", &["available"]),
        ];
        let mut subnets = self.subnets.describe_subnets(&filters)?;
        subnets.truncate(MAX_DEFAULT_SUBNETS);
        debug!(?subnets, "Selected default subnets");
        Ok(subnets)
    }

    /// Upload an exported image to the configured staging bucket.
    pub fn upload_image_to_s3(&self, image: &Path) -> AwsResult<S3Location> {
        let _span = self.log.enter();
        let migration = &self.settings.migration;
        let bucket = migration.s3_bucket.clone().ok_or_else(|| {
            AwsError::validation("s3", "migration.s3_bucket is not configured")
        })?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AwsError::validation("s3", format!("Not a file path: {}", image.display()))
            })?;
        let key = join_key(&migration.s3_prefix, &file_name);

        let body = fs::read(image).map_err(|e| {
            AwsError::validation("s3", format!("Cannot read {}: {}", image.display(), e))
        })?;
        let options = PutOptions {
            content_type: Some(content_type_for(&file_name).to_string()),
            encryption: self.encryption(),
        };

        info!(bucket = %bucket, key = %key, bytes = body.len(), "Uploading image to S3");
        let etag = self.store.put_object(&bucket, &key, body, &options)?;
        debug!(?etag, "Upload complete");
        Ok(S3Location { bucket, key })
    }

    fn encryption(&self) -> Option<ServerSideEncryption> {
        let security = &self.settings.security;
        if !security.encrypt_uploads {
            return None;
        }
        Some(match &security.kms_key_id {
            Some(key) => ServerSideEncryption::Kms(key.clone()),
            None => ServerSideEncryption::Aes256,
        })
    }

    pub fn import_vm_from_s3(
        &self,
        image: &S3Location,
        cluster_name: &str,
        vm_name: &str,
    ) -> AwsResult<ImportTask> {
        let _span = self.log.enter();
        let request = StartVmImportRequest {
            cluster_name: cluster_name.to_string(),
            vm_name: vm_name.to_string(),
            s3_bucket: image.bucket.clone(),
            s3_key: image.key.clone(),
            client_token: uuid::Uuid::new_v4().to_string(),
        };
        let task = self.evs.start_vm_import(&request)?;
        info!(task_id = %task.import_task_id, source = %image, cluster = cluster_name, "Started VM import");
        Ok(task)
    }

    /// Block until the import task completes.
    ///
    /// `failed` and `cancelled` terminal states become
    /// [`AwsErrorKind::TaskFailed`](crate::AwsErrorKind::TaskFailed).
    pub fn wait_for_import_completion(
        &self,
        task_id: &str,
        poll: &PollConfig,
        cancel: &CancellationToken,
    ) -> AwsResult<ImportTask> {
        let _span = self.log.enter();
        let result = poll_until(poll, cancel, || {
            let task = self.evs.describe_vm_import_task(task_id)?;
            debug!(task_id, status = %task.status, progress = ?task.progress, "Import task state");
            if task.status.is_terminal() {
                Ok(PollOutcome::Ready(task))
            } else {
                Ok(PollOutcome::Pending)
            }
        });

        let task = match result {
            Ok(task) => task,
            Err(WaitError::Failed(e)) => return Err(e),
            Err(WaitError::Timeout(after)) => {
                return Err(AwsError::timeout(
                    "evs",
                    format!("Import task {} did not finish within {:?}", task_id, after),
                ))
            }
            Err(WaitError::Cancelled) => {
                return Err(AwsError::cancelled(
                    "evs",
                    format!("Wait for import task {} was cancelled", task_id),
                ))
            }
        };

        match task.status {
            ImportStatus::Completed => {
                info!(task_id, "VM import completed");
                Ok(task)
            }
            status => Err(AwsError::task_failed(
                "evs",
                format!(
                    "Import task {} ended {}: {}",
                    task_id,
                    status,
                    task.status_message.as_deref().unwrap_or("no details")
                ),
            )),
        }
    }

    /// Identity of a VM that now lives in `cluster_name`.
    pub fn get_vm_info(&self, vm_name: &str, cluster_name: &str) -> AwsResult<MigratedVm> {
        let _span = self.log.enter();
        self.evs.describe_vm(cluster_name, vm_name)
    }
}

fn join_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    if file_name.ends_with(".ovf") {
        "application/xml"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAws, MockCall};
    use crate::AwsErrorKind;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings() -> EvsSettings {
        let mut config = Config::default();
        config.migration.s3_bucket = Some("corp-imports".to_string());
        config.tags.insert("Project".to_string(), "dc-exit".to_string());
        config.tags.insert("ManagedBy".to_string(), "someone-else".to_string());
        EvsSettings::from_config(&config)
    }

    fn client(mock: &MockAws) -> EvsClient {
        EvsClient::new(settings(), mock.backends(), Logger::disabled())
    }

    fn fast_poll() -> PollConfig {
        PollConfig::with_timeout(Duration::from_secs(5))
            .initial_interval(Duration::from_millis(1))
            .max_interval(Duration::from_millis(2))
    }

    #[test]
    fn list_clusters_on_empty_account_is_empty() {
        let mock = MockAws::new();
        let clusters = client(&mock).list_clusters().unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn list_clusters_maps_records_and_region() {
        let mock = MockAws::new();
        mock.add_cluster("evs-1", "prod-cluster", "ACTIVE", 4);
        let clusters = client(&mock).list_clusters().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].name, "prod-cluster");
        assert_eq!(clusters[0].status, "ACTIVE");
        assert_eq!(clusters[0].node_count, 4);
        assert_eq!(clusters[0].region, "us-west-2");
        assert_eq!(clusters[0].cluster_id, "evs-1");
    }

    #[test]
    fn create_without_subnets_uses_filtered_defaults() {
        let mock = MockAws::new();
        mock.set_subnets(&["subnet-a", "subnet-b", "subnet-c", "subnet-d", "subnet-e"]);

        let created = client(&mock)
            .create_cluster(&ClusterSpec::named("prod-cluster"))
            .unwrap();
        assert_eq!(created.cluster_status, "CREATING");

        let filters = mock.subnet_filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(
            filters[0],
            vec![
                Filter::new("default-for-az", &["true"]),
                Filter::new("state", &["available"]),
            ]
        );

        let request = mock.last_create_request().unwrap();
        assert_eq!(request.subnet_ids, vec!["subnet-a", "subnet-b", "subnet-c"]);
        assert_eq!(request.instance_type, "i3.metal");
        assert_eq!(request.node_count, 3);
    }

    #[test]
    fn create_with_explicit_subnets_skips_discovery() {
        let mock = MockAws::new();
        let spec = ClusterSpec::named("c1")
            .subnet_ids(vec!["subnet-x".into()])
            .instance_type("i4i.metal")
            .node_count(5);
        client(&mock).create_cluster(&spec).unwrap();

        assert!(mock.subnet_filters().is_empty());
        let request = mock.last_create_request().unwrap();
        assert_eq!(request.subnet_ids, vec!["subnet-x"]);
        assert_eq!(request.instance_type, "i4i.metal");
        assert_eq!(request.node_count, 5);
    }

    #[test]
    fn created_clusters_carry_provenance_tags() {
        let mock = MockAws::new();
        mock.set_subnets(&["subnet-a"]);
        client(&mock)
            .create_cluster(&ClusterSpec::named("c1").environment("production"))
            .unwrap();

        let tags: Vec<(String, String)> = mock
            .last_create_request()
            .unwrap()
            .tags
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("Environment".to_string(), "production".to_string()),
                ("ManagedBy".to_string(), MANAGED_BY.to_string()),
                ("Project".to_string(), "dc-exit".to_string()),
            ]
        );
    }

    #[test]
    fn create_fails_when_no_subnets_exist() {
        let mock = MockAws::new();
        let err = client(&mock)
            .create_cluster(&ClusterSpec::named("c1"))
            .unwrap_err();
        assert_eq!(err.kind, AwsErrorKind::Validation);
        assert!(mock.last_create_request().is_none());
    }

    #[test]
    fn provider_faults_propagate_unchanged() {
        let mock = MockAws::new();
        mock.fail_next(
            "DescribeCluster",
            AwsError::service("evs", 404, "ResourceNotFoundException", "evs-404"),
        );
        let err = client(&mock).get_cluster_status("evs-404").unwrap_err();
        assert_eq!(err.code, "ResourceNotFoundException");
        assert!(err.is_not_found());
    }

    #[test]
    fn get_cluster_status_includes_detail_fields() {
        let mock = MockAws::new();
        mock.add_cluster("evs-1", "prod", "ACTIVE", 3);
        let info = client(&mock).get_cluster_status("evs-1").unwrap();
        assert_eq!(info.vpc_id.as_deref(), Some("vpc-mock"));
        assert!(!info.subnet_ids.is_empty());
        assert!(info.created_at.is_some());
    }

    #[test]
    fn delete_cluster_returns_true() {
        let mock = MockAws::new();
        mock.add_cluster("evs-1", "prod", "ACTIVE", 3);
        assert!(client(&mock).delete_cluster("evs-1").unwrap());
        assert!(mock.calls().contains(&MockCall::DeleteCluster("evs-1".into())));
    }

    #[test]
    fn upload_uses_prefix_and_encryption() {
        let mock = MockAws::new();
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("web01.ovf");
        std::fs::write(&image, "<Envelope/>").unwrap();

        let location = client(&mock).upload_image_to_s3(&image).unwrap();
        assert_eq!(location.to_string(), "s3://corp-imports/vm-imports/web01.ovf");

        let put = mock.last_put().unwrap();
        assert_eq!(put.body, b"<Envelope/>".to_vec());
        assert_eq!(put.options.encryption, Some(ServerSideEncryption::Aes256));
    }

    #[test]
    fn upload_requires_bucket() {
        let mock = MockAws::new();
        let client = EvsClient::new(EvsSettings::default(), mock.backends(), Logger::disabled());
        let err = client.upload_image_to_s3(Path::new("/tmp/web01.ovf")).unwrap_err();
        assert_eq!(err.kind, AwsErrorKind::Validation);
        assert!(mock.last_put().is_none());
    }

    #[test]
    fn import_wait_polls_until_completed() {
        let mock = MockAws::new();
        mock.script_import(&[ImportStatus::Pending, ImportStatus::InProgress, ImportStatus::Completed]);
        let evs = client(&mock);
        let location = S3Location {
            bucket: "corp-imports".into(),
            key: "vm-imports/web01.ovf".into(),
        };
        let task = evs.import_vm_from_s3(&location, "prod-cluster", "web01").unwrap();
        let done = evs
            .wait_for_import_completion(&task.import_task_id, &fast_poll(), &CancellationToken::new())
            .unwrap();
        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(mock.import_polls(), 3);
    }

    #[test]
    fn failed_import_is_task_failure() {
        let mock = MockAws::new();
        mock.script_import(&[ImportStatus::InProgress, ImportStatus::Failed]);
        let evs = client(&mock);
        let err = evs
            .wait_for_import_completion("import-1", &fast_poll(), &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.kind, AwsErrorKind::TaskFailed);
    }

    #[test]
    fn stuck_import_times_out() {
        let mock = MockAws::new();
        mock.script_import(&[ImportStatus::InProgress]);
        let poll = PollConfig {
            timeout: Duration::from_millis(20),
            ..fast_poll()
        };
        let err = client(&mock)
            .wait_for_import_completion("import-1", &poll, &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.kind, AwsErrorKind::Timeout);
    }

    #[test]
    fn cancelled_import_wait() {
        let mock = MockAws::new();
        mock.script_import(&[ImportStatus::InProgress]);
        let token = CancellationToken::new();
        token.cancel();
        let err = client(&mock)
            .wait_for_import_completion("import-1", &fast_poll(), &token)
            .unwrap_err();
        assert_eq!(err.kind, AwsErrorKind::Cancelled);
    }
}
