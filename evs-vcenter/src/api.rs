use crate::error::VCenterResult;
use crate::types::{SnapshotNode, SnapshotSpec, TaskHandle, TaskInfo, VmInfo, VmSummary};

/// Calls the vCenter client makes against a vSphere endpoint.
///
/// VM arguments are managed object ids (`vm-42`), not display names;
/// [`find_vm`](VSphereApi::find_vm) translates between the two.
pub trait VSphereApi: Send {
    /// Open a session.
    fn login(&mut self) -> VCenterResult<()>;

    /// Close the session. Closing an already closed session succeeds.
    fn logout(&mut self) -> VCenterResult<()>;

    fn list_vms(&self) -> VCenterResult<Vec<VmSummary>>;

    /// Managed object id of the VM named `name`, if any.
    fn find_vm(&self, name: &str) -> VCenterResult<Option<String>>;

    fn vm_details(&self, vm_id: &str) -> VCenterResult<VmInfo>;

    /// Root snapshots of the VM, each with its descendants.
    fn snapshot_tree(&self, vm_id: &str) -> VCenterResult<Vec<SnapshotNode>>;

    fn create_snapshot(&self, vm_id: &str, spec: &SnapshotSpec) -> VCenterResult<TaskHandle>;

    fn revert_snapshot(&self, vm_id: &str, snapshot_id: &str) -> VCenterResult<TaskHandle>;

    fn task_info(&self, task: &TaskHandle) -> VCenterResult<TaskInfo>;
}
