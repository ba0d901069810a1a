//! Session-scoped vCenter client.
//!
//! A [`VCenterClient`] starts disconnected. [`connect`](VCenterClient::connect)
//! opens a session; every VM and snapshot operation requires one and fails
//! with [`VCenterErrorKind::NotConnected`](crate::VCenterErrorKind) otherwise.
//! The session is closed by [`disconnect`](VCenterClient::disconnect) or when
//! the client is dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::api::VSphereApi;
use crate::error::{VCenterError, VCenterResult};
use crate::ovf;
use crate::rest::{RestSettings, VsphereRestApi};
use crate::snapshot;
use crate::types::{SnapshotId, SnapshotSpec, TaskHandle, TaskInfo, TaskState, VmInfo, VmSummary};
use evs_config::VmwareConfig;
use evs_core::{poll_until, CancellationToken, PollConfig, PollOutcome, WaitError};
use evs_logging::Logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connected,
}

/// Validated connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VCenterSettings {
    pub server: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub ssl_verify: bool,
    pub request_timeout: Duration,
}

impl VCenterSettings {
    /// Requires `vcenter_server`, `username` and `password` to be non-empty.
    pub fn from_config(config: &VmwareConfig) -> VCenterResult<Self> {
        let required = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
        match (
            required(&config.vcenter_server),
            required(&config.username),
            required(&config.password),
        ) {
            (Some(server), Some(username), Some(password)) => Ok(Self {
                server,
                username,
                password,
                port: config.port,
                ssl_verify: config.ssl_verify,
                request_timeout: config.request_timeout(),
            }),
            _ => Err(VCenterError::config(
                "vcenter_server, username, and password are required",
            )),
        }
    }

    fn rest(&self) -> RestSettings {
        RestSettings {
            server: self.server.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            ssl_verify: self.ssl_verify,
            timeout: self.request_timeout,
        }
    }
}

pub struct VCenterClient {
    settings: VCenterSettings,
    api: Box<dyn VSphereApi>,
    state: ConnectionState,
    task_poll: PollConfig,
    cancel: CancellationToken,
    log: Logger,
}

impl VCenterClient {
    /// Client over the vSphere REST API. Does not connect.
    pub fn new(config: &VmwareConfig, log: &Logger) -> VCenterResult<Self> {
        let settings = VCenterSettings::from_config(config)?;
        let api = VsphereRestApi::new(&settings.rest())?;
        Ok(Self::from_parts(settings, Box::new(api), log.component("vcenter")))
    }

    /// Client over an arbitrary binding, e.g. a test double.
    pub fn with_api(
        config: &VmwareConfig,
        api: Box<dyn VSphereApi>,
        log: &Logger,
    ) -> VCenterResult<Self> {
        let settings = VCenterSettings::from_config(config)?;
        Ok(Self::from_parts(settings, api, log.component("vcenter")))
    }

    fn from_parts(settings: VCenterSettings, api: Box<dyn VSphereApi>, log: Logger) -> Self {
        Self {
            settings,
            api,
            state: ConnectionState::Disconnected,
            task_poll: PollConfig::default(),
            cancel: CancellationToken::new(),
            log,
        }
    }

    /// Backoff and timeout used when waiting on vCenter tasks.
    pub fn with_task_poll(mut self, poll: PollConfig) -> Self {
        self.task_poll = poll;
        self
    }

    /// Token that aborts any task wait in progress when cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn server(&self) -> &str {
        &self.settings.server
    }

    pub fn connect(&mut self) -> VCenterResult<()> {
        let _span = self.log.enter();
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        if let Err(e) = self.api.login() {
            error!("Failed to connect to vCenter {}: {}", self.settings.server, e);
            return Err(e);
        }
        self.state = ConnectionState::Connected;
        info!("Connected to vCenter: {}", self.settings.server);
        Ok(())
    }

    /// Close the session. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        let _span = self.log.enter();
        if self.state == ConnectionState::Disconnected {
            return;
        }
        if let Err(e) = self.api.logout() {
            warn!("Error while closing vCenter session: {}", e);
        }
        self.state = ConnectionState::Disconnected;
        info!("Disconnected from vCenter");
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn require_connected(&self) -> VCenterResult<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected => Err(VCenterError::not_connected()),
        }
    }

    fn resolve_vm(&self, vm_name: &str) -> VCenterResult<String> {
        self.require_connected()?;
        self.api
            .find_vm(vm_name)?
            .ok_or_else(|| VCenterError::not_found(format!("VM not found: {}", vm_name)))
    }

    pub fn get_vm_info(&self, vm_name: &str) -> VCenterResult<VmInfo> {
        let _span = self.log.enter();
        let result = self
            .resolve_vm(vm_name)
            .and_then(|vm_id| self.api.vm_details(&vm_id));
        if let Err(e) = &result {
            error!("Failed to get VM info for {}: {}", vm_name, e);
        }
        result
    }

    pub fn list_vms(&self) -> VCenterResult<Vec<VmSummary>> {
        let _span = self.log.enter();
        self.require_connected()?;
        self.api.list_vms().map_err(|e| {
            error!("Failed to list VMs: {}", e);
            e
        })
    }

    /// Take a disk-only, quiesced snapshot named `snapshot-<vm>` and return
    /// its id once the task completes.
    pub fn create_snapshot(&self, vm_name: &str, description: &str) -> VCenterResult<SnapshotId> {
        let _span = self.log.enter();
        let result = self.resolve_vm(vm_name).and_then(|vm_id| {
            let spec = SnapshotSpec {
                name: format!("snapshot-{}", vm_name),
                description: description.to_string(),
                memory: false,
                quiesce: true,
            };
            let task = self.api.create_snapshot(&vm_id, &spec)?;
            let info = self.wait_for_task(&task)?;
            info.result.ok_or_else(|| {
                VCenterError::parse(format!("Snapshot task {} returned no snapshot id", task))
            })
        });
        match &result {
            Ok(snapshot_id) => info!("Created snapshot {} for VM {}", snapshot_id, vm_name),
            Err(e) => error!("Failed to create snapshot for {}: {}", vm_name, e),
        }
        result
    }

    /// Write an OVF descriptor for the VM to `<dir>/<vm>.ovf`.
    pub fn export_vm_to_ovf(&self, vm_name: &str, dir: &Path) -> VCenterResult<PathBuf> {
        let _span = self.log.enter();
        let result = self
            .resolve_vm(vm_name)
            .and_then(|vm_id| self.api.vm_details(&vm_id))
            .and_then(|vm| ovf::write_descriptor(&vm, dir));
        match &result {
            Ok(path) => info!("Exported VM {} to OVF: {}", vm_name, path.display()),
            Err(e) => error!("Failed to export VM {} to OVF: {}", vm_name, e),
        }
        result
    }

    /// Revert the VM to a snapshot from its tree.
    ///
    /// An id that is not in the tree fails with `NotFound` before any revert
    /// is requested.
    pub fn revert_to_snapshot(&self, vm_name: &str, snapshot_id: &str) -> VCenterResult<()> {
        let _span = self.log.enter();
        let result = self.resolve_vm(vm_name).and_then(|vm_id| {
            let tree = self.api.snapshot_tree(&vm_id)?;
            if snapshot::find(&tree, snapshot_id).is_none() {
                return Err(VCenterError::not_found(format!(
                    "Snapshot not found: {}",
                    snapshot_id
                )));
            }
            let task = self.api.revert_snapshot(&vm_id, snapshot_id)?;
            self.wait_for_task(&task).map(|_| ())
        });
        match &result {
            Ok(()) => info!("Reverted VM {} to snapshot {}", vm_name, snapshot_id),
            Err(e) => error!(
                "Failed to revert VM {} to snapshot {}: {}",
                vm_name, snapshot_id, e
            ),
        }
        result
    }

    /// Block until `task` leaves the queued/running states.
    ///
    /// A task that ends in `error` becomes a `TaskFailed` error whose message
    /// is HTML-escaped.
    pub fn wait_for_task(&self, task: &TaskHandle) -> VCenterResult<TaskInfo> {
        let outcome = poll_until(&self.task_poll, &self.cancel, || {
            let info = self.api.task_info(task)?;
            debug!(task = %task, state = ?info.state, "vCenter task state");
            if info.state.is_terminal() {
                Ok(PollOutcome::Ready(info))
            } else {
                Ok(PollOutcome::Pending)
            }
        });

        let info = match outcome {
            Ok(info) => info,
            Err(WaitError::Failed(e)) => return Err(e),
            Err(WaitError::Timeout(after)) => {
                return Err(VCenterError::timeout(format!(
                    "Task {} did not finish within {:?}",
                    task, after
                )))
            }
            Err(WaitError::Cancelled) => {
                return Err(VCenterError::cancelled(format!(
                    "Wait for task {} was cancelled",
                    task
                )))
            }
        };

        match info.state {
            TaskState::Error => {
                let message = info
                    .error
                    .as_deref()
                    .map(|raw| quick_xml::escape::escape(raw).into_owned())
                    .unwrap_or_else(|| "Unknown error".to_string());
                Err(VCenterError::task_failed(format!("Task failed: {}", message)))
            }
            _ => Ok(info),
        }
    }
}

impl Drop for VCenterClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
