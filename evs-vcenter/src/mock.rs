//! In-memory vSphere endpoint for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::VSphereApi;
use crate::error::{VCenterError, VCenterResult};
use crate::types::{SnapshotNode, SnapshotSpec, TaskHandle, TaskInfo, VmInfo, VmSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockVSphereCall {
    Login,
    Logout,
    ListVms,
    FindVm(String),
    VmDetails(String),
    SnapshotTree(String),
    CreateSnapshot { vm_id: String, name: String },
    RevertSnapshot { vm_id: String, snapshot_id: String },
    TaskInfo(String),
}

#[derive(Default)]
struct State {
    vms: Vec<VmInfo>,
    trees: HashMap<String, Vec<SnapshotNode>>,
    specs: Vec<SnapshotSpec>,
    task_results: HashMap<String, Option<String>>,
    task_script: VecDeque<TaskInfo>,
    task_polls: usize,
    next_id: usize,
    failures: HashMap<String, VCenterError>,
    calls: Vec<MockVSphereCall>,
}

#[derive(Clone, Default)]
pub struct MockVSphere {
    state: Arc<Mutex<State>>,
}

impl MockVSphere {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("mock state poisoned")
    }

    /// Register a powered-on VM; ids are assigned as `vm-1`, `vm-2`, ...
    pub fn add_vm(&self, name: &str) -> String {
        let mut state = self.state();
        let seq = state.vms.len() + 1;
        let vm_id = format!("vm-{}", seq);
        state.vms.push(VmInfo {
            name: name.to_string(),
            power_state: "POWERED_ON".to_string(),
            guest_os: "Ubuntu Linux (64-bit)".to_string(),
            memory_mb: 4096,
            num_cpu: 2,
            vm_id: vm_id.clone(),
            uuid: format!("4201-{}", seq),
        });
        vm_id
    }

    pub fn set_snapshot_tree(&self, vm_id: &str, roots: Vec<SnapshotNode>) {
        self.state().trees.insert(vm_id.to_string(), roots);
    }

    /// States returned by successive `task_info` calls; the last one repeats.
    /// Without a script every task succeeds on the first poll.
    pub fn script_tasks(&self, states: Vec<TaskInfo>) {
        self.state().task_script = states.into();
    }

    pub fn fail_next(&self, operation: &str, error: VCenterError) {
        self.state().failures.insert(operation.to_string(), error);
    }

    pub fn calls(&self) -> Vec<MockVSphereCall> {
        self.state().calls.clone()
    }

    pub fn snapshot_specs(&self) -> Vec<SnapshotSpec> {
        self.state().specs.clone()
    }

    pub fn task_polls(&self) -> usize {
        self.state().task_polls
    }

    fn begin(&self, operation: &str, call: MockVSphereCall) -> VCenterResult<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(call);
        let failure = state.failures.remove(operation);
        match failure {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

impl VSphereApi for MockVSphere {
    fn login(&mut self) -> VCenterResult<()> {
        self.begin("login", MockVSphereCall::Login).map(|_| ())
    }

    fn logout(&mut self) -> VCenterResult<()> {
        self.begin("logout", MockVSphereCall::Logout).map(|_| ())
    }

    fn list_vms(&self) -> VCenterResult<Vec<VmSummary>> {
        let state = self.begin("list_vms", MockVSphereCall::ListVms)?;
        Ok(state
            .vms
            .iter()
            .map(|vm| VmSummary {
                name: vm.name.clone(),
                power_state: vm.power_state.clone(),
                guest_os: vm.guest_os.clone(),
                vm_id: vm.vm_id.clone(),
            })
            .collect())
    }

    fn find_vm(&self, name: &str) -> VCenterResult<Option<String>> {
        let state = self.begin("find_vm", MockVSphereCall::FindVm(name.to_string()))?;
        Ok(state
            .vms
            .iter()
            .find(|vm| vm.name == name)
            .map(|vm| vm.vm_id.clone()))
    }

    fn vm_details(&self, vm_id: &str) -> VCenterResult<VmInfo> {
        let state = self.begin("vm_details", MockVSphereCall::VmDetails(vm_id.to_string()))?;
        state
            .vms
            .iter()
            .find(|vm| vm.vm_id == vm_id)
            .cloned()
            .ok_or_else(|| VCenterError::not_found(format!("VM not found: {}", vm_id)))
    }

    fn snapshot_tree(&self, vm_id: &str) -> VCenterResult<Vec<SnapshotNode>> {
        let state = self.begin(
            "snapshot_tree",
            MockVSphereCall::SnapshotTree(vm_id.to_string()),
        )?;
        Ok(state.trees.get(vm_id).cloned().unwrap_or_default())
    }

    fn create_snapshot(&self, vm_id: &str, spec: &SnapshotSpec) -> VCenterResult<TaskHandle> {
        let mut state = self.begin(
            "create_snapshot",
            MockVSphereCall::CreateSnapshot {
                vm_id: vm_id.to_string(),
                name: spec.name.clone(),
            },
        )?;
        state.next_id += 1;
        let snapshot_id = format!("snapshot-{}", state.next_id);
        let task = format!("task-{}", state.next_id);
        state.specs.push(spec.clone());
        state
            .trees
            .entry(vm_id.to_string())
            .or_default()
            .push(SnapshotNode {
                id: snapshot_id.clone(),
                name: spec.name.clone(),
                description: Some(spec.description.clone()),
                children: Vec::new(),
            });
        state.task_results.insert(task.clone(), Some(snapshot_id));
        Ok(TaskHandle(task))
    }

    fn revert_snapshot(&self, vm_id: &str, snapshot_id: &str) -> VCenterResult<TaskHandle> {
        let mut state = self.begin(
            "revert_snapshot",
            MockVSphereCall::RevertSnapshot {
                vm_id: vm_id.to_string(),
                snapshot_id: snapshot_id.to_string(),
            },
        )?;
        state.next_id += 1;
        let task = format!("task-{}", state.next_id);
        state.task_results.insert(task.clone(), None);
        Ok(TaskHandle(task))
    }

    fn task_info(&self, task: &TaskHandle) -> VCenterResult<TaskInfo> {
        let mut state = self.begin("task_info", MockVSphereCall::TaskInfo(task.0.clone()))?;
        state.task_polls += 1;
        let scripted = if state.task_script.len() > 1 {
            state.task_script.pop_front()
        } else {
            state.task_script.front().cloned()
        };
        Ok(scripted.unwrap_or_else(|| {
            TaskInfo::success(state.task_results.get(&task.0).cloned().flatten())
        }))
    }
}
