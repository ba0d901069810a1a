//! Elastic VMware Service control plane (JSON 1.0 protocol).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::client::{AwsClient, EVS};
use crate::error::{AwsError, AwsResult};

/// `X-Amz-Target` prefix for every EVS operation.
pub const TARGET_PREFIX: &str = "AmazonElasticVMwareService";

/// Cluster as reported by `DescribeClusters` / `DescribeCluster`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterRecord {
    pub cluster_id: String,
    pub cluster_name: String,
    pub cluster_status: String,
    pub node_count: u32,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateClusterRequest {
    pub cluster_name: String,
    pub instance_type: String,
    pub node_count: u32,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<Tag>,
    /// Idempotency token; a retried create with the same token is a no-op.
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatedCluster {
    pub cluster_id: String,
    pub cluster_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartVmImportRequest {
    pub cluster_name: String,
    pub vm_name: String,
    pub s3_bucket: String,
    pub s3_key: String,
    pub client_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl ImportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImportTask {
    pub import_task_id: String,
    pub status: ImportStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    /// Percent complete, when the service reports it.
    #[serde(default)]
    pub progress: Option<u8>,
    /// Identifier of the imported VM once the task has completed.
    #[serde(default)]
    pub vm_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MigratedVm {
    pub vm_id: String,
    pub vm_name: String,
    pub cluster_name: String,
    #[serde(default)]
    pub power_state: Option<String>,
}

/// EVS operations the toolkit relies on.
pub trait EvsApi: Send + Sync {
    fn describe_clusters(&self) -> AwsResult<Vec<ClusterRecord>>;

    fn create_cluster(&self, request: &CreateClusterRequest) -> AwsResult<CreatedCluster>;

    fn delete_cluster(&self, cluster_id: &str) -> AwsResult<()>;

    fn describe_cluster(&self, cluster_id: &str) -> AwsResult<ClusterRecord>;

    /// Start importing an OVF image staged in S3 into `cluster_name`.
    fn start_vm_import(&self, request: &StartVmImportRequest) -> AwsResult<ImportTask>;

    fn describe_vm_import_task(&self, task_id: &str) -> AwsResult<ImportTask>;

    /// Look up a VM by name inside a cluster.
    fn describe_vm(&self, cluster_name: &str, vm_name: &str) -> AwsResult<MigratedVm>;
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeClustersOutput {
    #[serde(default)]
    clusters: Vec<ClusterRecord>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeClusterOutput {
    cluster: ClusterRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImportTaskOutput {
    import_task: ImportTask,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVmOutput {
    vm: MigratedVm,
}

fn target(operation: &str) -> String {
    format!("{}.{}", TARGET_PREFIX, operation)
}

fn decode<T: serde::de::DeserializeOwned>(operation: &str, value: serde_json::Value) -> AwsResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AwsError::parse("evs", format!("Unexpected {} response: {}", operation, e)))
}

impl EvsApi for AwsClient {
    fn describe_clusters(&self) -> AwsResult<Vec<ClusterRecord>> {
        let mut clusters = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let payload = match &next_token {
                Some(token) => json!({ "NextToken": token }),
                None => json!({}),
            };
            let page: DescribeClustersOutput = decode(
                "DescribeClusters",
                self.json_request(EVS, &target("DescribeClusters"), &payload)?,
            )?;
            clusters.extend(page.clusters);
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(clusters)
    }

    fn create_cluster(&self, request: &CreateClusterRequest) -> AwsResult<CreatedCluster> {
        let payload = serde_json::to_value(request)
            .map_err(|e| AwsError::validation("evs", e.to_string()))?;
        decode(
            "CreateCluster",
            self.json_request(EVS, &target("CreateCluster"), &payload)?,
        )
    }

    fn delete_cluster(&self, cluster_id: &str) -> AwsResult<()> {
        self.json_request(
            EVS,
            &target("DeleteCluster"),
            &json!({ "ClusterId": cluster_id }),
        )?;
        Ok(())
    }

    fn describe_cluster(&self, cluster_id: &str) -> AwsResult<ClusterRecord> {
        let output: DescribeClusterOutput = decode(
            "DescribeCluster",
            self.json_request(
                EVS,
                &target("DescribeCluster"),
                &json!({ "ClusterId": cluster_id }),
            )?,
        )?;
        Ok(output.cluster)
    }

    fn start_vm_import(&self, request: &StartVmImportRequest) -> AwsResult<ImportTask> {
        let payload = serde_json::to_value(request)
            .map_err(|e| AwsError::validation("evs", e.to_string()))?;
        let output: ImportTaskOutput = decode(
            "StartVmImport",
            self.json_request(EVS, &target("StartVmImport"), &payload)?,
        )?;
        Ok(output.import_task)
    }

    fn describe_vm_import_task(&self, task_id: &str) -> AwsResult<ImportTask> {
        let output: ImportTaskOutput = decode(
            "DescribeVmImportTask",
            self.json_request(
                EVS,
                &target("DescribeVmImportTask"),
                &json!({ "ImportTaskId": task_id }),
            )?,
        )?;
        Ok(output.import_task)
    }

    fn describe_vm(&self, cluster_name: &str, vm_name: &str) -> AwsResult<MigratedVm> {
        let output: DescribeVmOutput = decode(
            "DescribeVm",
            self.json_request(
                EVS,
                &target("DescribeVm"),
                &json!({ "ClusterName": cluster_name, "VmName": vm_name }),
            )?,
        )?;
        Ok(output.vm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_record_decodes_epoch_timestamp() {
        let value = json!({
            "ClusterId": "evs-0a1b",
            "ClusterName": "prod-cluster",
            "ClusterStatus": "ACTIVE",
            "NodeCount": 4,
            "CreatedAt": 1714557600,
            "VpcId": "vpc-1",
            "SubnetIds": ["subnet-a", "subnet-b"]
        });
        let record: ClusterRecord = decode("DescribeCluster", value).unwrap();
        assert_eq!(record.cluster_name, "prod-cluster");
        assert_eq!(record.created_at.unwrap().timestamp(), 1_714_557_600);
        assert_eq!(record.subnet_ids.len(), 2);
    }

    #[test]
    fn list_entries_may_omit_detail_fields() {
        let value = json!({
            "Clusters": [{
                "ClusterId": "evs-1",
                "ClusterName": "dev",
                "ClusterStatus": "CREATING",
                "NodeCount": 3
            }]
        });
        let page: DescribeClustersOutput = decode("DescribeClusters", value).unwrap();
        assert_eq!(page.clusters.len(), 1);
        assert!(page.clusters[0].vpc_id.is_none());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn create_request_uses_wire_names() {
        let request = CreateClusterRequest {
            cluster_name: "c1".into(),
            instance_type: "i3.metal".into(),
            node_count: 3,
            subnet_ids: vec!["subnet-1".into()],
            tags: vec![Tag {
                key: "ManagedBy".into(),
                value: "vcf-evs-toolkit".into(),
            }],
            client_token: "tok".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["ClusterName"], "c1");
        assert_eq!(value["NodeCount"], 3);
        assert_eq!(value["Tags"][0]["Key"], "ManagedBy");
    }

    #[test]
    fn import_status_wire_format() {
        let task: ImportTask = serde_json::from_value(json!({
            "ImportTaskId": "import-1",
            "Status": "IN_PROGRESS",
            "Progress": 40
        }))
        .unwrap();
        assert_eq!(task.status, ImportStatus::InProgress);
        assert!(!task.status.is_terminal());
        assert!(ImportStatus::Cancelled.is_terminal());
    }

    #[test]
    fn malformed_response_is_parse_error() {
        let err = decode::<DescribeClusterOutput>("DescribeCluster", json!({"Nope": 1})).unwrap_err();
        assert_eq!(err.kind, crate::error::AwsErrorKind::Parse);
    }
}
