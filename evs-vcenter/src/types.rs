use serde::{Deserialize, Serialize};

/// Opaque snapshot identifier issued by vCenter.
pub type SnapshotId = String;

/// VM details as reported by vCenter at the time of the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInfo {
    pub name: String,
    pub power_state: String,
    pub guest_os: String,
    pub memory_mb: u64,
    pub num_cpu: u32,
    /// Managed object id, e.g. `vm-42`.
    pub vm_id: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSummary {
    pub name: String,
    pub power_state: String,
    pub guest_os: String,
    pub vm_id: String,
}

/// One node of a VM's snapshot tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: SnapshotId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    pub fn leaf(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SnapshotNode>) -> Self {
        self.children = children;
        self
    }
}

/// Parameters for a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSpec {
    pub name: String,
    pub description: String,
    /// Include guest memory.
    pub memory: bool,
    /// Quiesce the guest file system first.
    pub quiesce: bool,
}

/// Identifier of a running vCenter task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(pub String);

impl TaskHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub state: TaskState,
    /// Result payload on success, e.g. the id of a new snapshot.
    #[serde(default)]
    pub result: Option<String>,
    /// Raw error text on failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskInfo {
    pub fn queued() -> Self {
        Self {
            state: TaskState::Queued,
            result: None,
            error: None,
        }
    }

    pub fn running() -> Self {
        Self {
            state: TaskState::Running,
            result: None,
            error: None,
        }
    }

    pub fn success(result: Option<String>) -> Self {
        Self {
            state: TaskState::Success,
            result,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: TaskState::Error,
            result: None,
            error: Some(error.into()),
        }
    }
}
