//! In-memory stand-in for the AWS service bindings.
//!
//! One [`MockAws`] implements every binding trait and records each call, so
//! tests can build an [`EvsClient`](crate::EvsClient) or
//! [`CloudWatchMonitor`](crate::CloudWatchMonitor) without a network.

use chrono::{TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cloudwatch::{Datapoint, MetricQuery, MetricsApi};
use crate::ec2::{Filter, SubnetApi};
use crate::error::{AwsError, AwsResult};
use crate::evs::{
    ClusterRecord, CreateClusterRequest, CreatedCluster, EvsApi, ImportStatus, ImportTask,
    MigratedVm, StartVmImportRequest,
};
use crate::evs_client::EvsBackends;
use crate::s3::{ObjectStore, PutOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    DescribeClusters,
    CreateCluster(String),
    DeleteCluster(String),
    DescribeCluster(String),
    StartVmImport { cluster: String, vm: String },
    DescribeVmImportTask(String),
    DescribeVm { cluster: String, vm: String },
    DescribeSubnets,
    PutObject { bucket: String, key: String },
    GetMetricStatistics(String),
}

#[derive(Debug, Clone)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub options: PutOptions,
}

#[derive(Default)]
struct State {
    clusters: Vec<ClusterRecord>,
    subnets: Vec<String>,
    subnet_filters: Vec<Vec<Filter>>,
    create_requests: Vec<CreateClusterRequest>,
    puts: Vec<PutRecord>,
    import_script: VecDeque<ImportStatus>,
    import_polls: usize,
    imports_started: usize,
    vms: HashMap<(String, String), MigratedVm>,
    datapoints: Vec<Datapoint>,
    metric_queries: Vec<MetricQuery>,
    failures: HashMap<String, AwsError>,
    calls: Vec<MockCall>,
}

#[derive(Clone, Default)]
pub struct MockAws {
    state: Arc<Mutex<State>>,
}

impl MockAws {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("mock state poisoned")
    }

    /// Boxed bindings sharing this mock's state.
    pub fn backends(&self) -> EvsBackends {
        EvsBackends {
            evs: Box::new(self.clone()),
            subnets: Box::new(self.clone()),
            store: Box::new(self.clone()),
        }
    }

    pub fn add_cluster(&self, id: &str, name: &str, status: &str, node_count: u32) {
        self.state().clusters.push(ClusterRecord {
            cluster_id: id.to_string(),
            cluster_name: name.to_string(),
            cluster_status: status.to_string(),
            node_count,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single(),
            vpc_id: Some("vpc-mock".to_string()),
            subnet_ids: vec!["subnet-mock-a".to_string(), "subnet-mock-b".to_string()],
        });
    }

    pub fn set_subnets(&self, ids: &[&str]) {
        self.state().subnets = ids.iter().map(|s| s.to_string()).collect();
    }

    /// Statuses returned by successive `DescribeVmImportTask` calls. The
    /// last one repeats; an empty script completes immediately.
    pub fn script_import(&self, statuses: &[ImportStatus]) {
        self.state().import_script = statuses.iter().copied().collect();
    }

    pub fn add_vm(&self, cluster: &str, vm: MigratedVm) {
        self.state()
            .vms
            .insert((cluster.to_string(), vm.vm_name.clone()), vm);
    }

    pub fn set_datapoints(&self, points: Vec<Datapoint>) {
        self.state().datapoints = points;
    }

    /// Make the next call of `operation` (wire name, e.g. `CreateCluster`)
    /// fail with `error`.
    pub fn fail_next(&self, operation: &str, error: AwsError) {
        self.state().failures.insert(operation.to_string(), error);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn subnet_filters(&self) -> Vec<Vec<Filter>> {
        self.state().subnet_filters.clone()
    }

    pub fn last_create_request(&self) -> Option<CreateClusterRequest> {
        self.state().create_requests.last().cloned()
    }

    pub fn last_put(&self) -> Option<PutRecord> {
        self.state().puts.last().cloned()
    }

    pub fn import_polls(&self) -> usize {
        self.state().import_polls
    }

    pub fn metric_queries(&self) -> Vec<MetricQuery> {
        self.state().metric_queries.clone()
    }

    fn begin(&self, operation: &str, call: MockCall) -> AwsResult<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(call);
        let failure = state.failures.remove(operation);
        match failure {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

fn task(id: &str, status: ImportStatus) -> ImportTask {
    ImportTask {
        import_task_id: id.to_string(),
        status,
        status_message: match status {
            ImportStatus::Failed => Some("disk conversion failed".to_string()),
            _ => None,
        },
        progress: match status {
            ImportStatus::Completed => Some(100),
            ImportStatus::InProgress => Some(50),
            _ => Some(0),
        },
        vm_id: match status {
            ImportStatus::Completed => Some(format!("vm-{}", id)),
            _ => None,
        },
    }
}

impl EvsApi for MockAws {
    fn describe_clusters(&self) -> AwsResult<Vec<ClusterRecord>> {
        let state = self.begin("DescribeClusters", MockCall::DescribeClusters)?;
        Ok(state.clusters.clone())
    }

    fn create_cluster(&self, request: &CreateClusterRequest) -> AwsResult<CreatedCluster> {
        let mut state = self.begin(
            "CreateCluster",
            MockCall::CreateCluster(request.cluster_name.clone()),
        )?;
        let cluster_id = format!("evs-mock-{}", state.create_requests.len() + 1);
        state.create_requests.push(request.clone());
        state.clusters.push(ClusterRecord {
            cluster_id: cluster_id.clone(),
            cluster_name: request.cluster_name.clone(),
            cluster_status: "CREATING".to_string(),
            node_count: request.node_count,
            created_at: Some(Utc::now()),
            vpc_id: Some("vpc-mock".to_string()),
            subnet_ids: request.subnet_ids.clone(),
        });
        Ok(CreatedCluster {
            cluster_id,
            cluster_status: "CREATING".to_string(),
        })
    }

    fn delete_cluster(&self, cluster_id: &str) -> AwsResult<()> {
        let mut state = self.begin(
            "DeleteCluster",
            MockCall::DeleteCluster(cluster_id.to_string()),
        )?;
        match state.clusters.iter_mut().find(|c| c.cluster_id == cluster_id) {
            Some(cluster) => {
                cluster.cluster_status = "DELETING".to_string();
                Ok(())
            }
            None => Err(AwsError::service(
                "evs",
                404,
                "ResourceNotFoundException",
                format!("Cluster {} not found", cluster_id),
            )),
        }
    }

    fn describe_cluster(&self, cluster_id: &str) -> AwsResult<ClusterRecord> {
        let state = self.begin(
            "DescribeCluster",
            MockCall::DescribeCluster(cluster_id.to_string()),
        )?;
        state
            .clusters
            .iter()
            .find(|c| c.cluster_id == cluster_id)
            .cloned()
            .ok_or_else(|| {
                AwsError::service(
                    "evs",
                    404,
                    "ResourceNotFoundException",
                    format!("Cluster {} not found", cluster_id),
                )
            })
    }

    fn start_vm_import(&self, request: &StartVmImportRequest) -> AwsResult<ImportTask> {
        let mut state = self.begin(
            "StartVmImport",
            MockCall::StartVmImport {
                cluster: request.cluster_name.clone(),
                vm: request.vm_name.clone(),
            },
        )?;
        state.imports_started += 1;
        Ok(task(
            &format!("import-{}", state.imports_started),
            ImportStatus::Pending,
        ))
    }

    fn describe_vm_import_task(&self, task_id: &str) -> AwsResult<ImportTask> {
        let mut state = self.begin(
            "DescribeVmImportTask",
            MockCall::DescribeVmImportTask(task_id.to_string()),
        )?;
        state.import_polls += 1;
        let status = if state.import_script.len() > 1 {
            state.import_script.pop_front()
        } else {
            state.import_script.front().copied()
        };
        Ok(task(task_id, status.unwrap_or(ImportStatus::Completed)))
    }

    fn describe_vm(&self, cluster_name: &str, vm_name: &str) -> AwsResult<MigratedVm> {
        let state = self.begin(
            "DescribeVm",
            MockCall::DescribeVm {
                cluster: cluster_name.to_string(),
                vm: vm_name.to_string(),
            },
        )?;
        let key = (cluster_name.to_string(), vm_name.to_string());
        Ok(state.vms.get(&key).cloned().unwrap_or_else(|| MigratedVm {
            vm_id: format!("vm-{}", vm_name),
            vm_name: vm_name.to_string(),
            cluster_name: cluster_name.to_string(),
            power_state: Some("POWERED_ON".to_string()),
        }))
    }
}

impl SubnetApi for MockAws {
    fn describe_subnets(&self, filters: &[Filter]) -> AwsResult<Vec<String>> {
        let mut state = self.begin("DescribeSubnets", MockCall::DescribeSubnets)?;
        state.subnet_filters.push(filters.to_vec());
        Ok(state.subnets.clone())
    }
}

impl ObjectStore for MockAws {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> AwsResult<Option<String>> {
        let mut state = self.begin(
            "PutObject",
            MockCall::PutObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        )?;
        state.puts.push(PutRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            options: options.clone(),
        });
        Ok(Some(format!("etag-{}", state.puts.len())))
    }
}

impl MetricsApi for MockAws {
    fn get_metric_statistics(&self, query: &MetricQuery) -> AwsResult<Vec<Datapoint>> {
        let mut state = self.begin(
            "GetMetricStatistics",
            MockCall::GetMetricStatistics(query.metric_name.clone()),
        )?;
        state.metric_queries.push(query.clone());
        Ok(state.datapoints.clone())
    }
}
