//! vSphere Automation REST binding.
//!
//! Talks to `https://{server}:{port}/api/...` with a session created by
//! `POST /api/session` and passed back in the `vmware-api-session-id` header.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::VSphereApi;
use crate::error::{VCenterError, VCenterResult};
use crate::snapshot::{build_tree, FlatSnapshot};
use crate::types::{SnapshotNode, SnapshotSpec, TaskHandle, TaskInfo, TaskState, VmInfo, VmSummary};

const SESSION_HEADER: &str = "vmware-api-session-id";

/// Connection parameters for [`VsphereRestApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub ssl_verify: bool,
    pub timeout: Duration,
}

pub struct VsphereRestApi {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    session_id: Option<String>,
}

impl VsphereRestApi {
    /// Build the HTTP client. No request is sent until [`VSphereApi::login`].
    pub fn new(settings: &RestSettings) -> VCenterResult<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(!settings.ssl_verify)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| VCenterError::connection(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: format!("https://{}:{}", settings.server, settings.port),
            username: settings.username.clone(),
            password: settings.password.clone(),
            session_id: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session(&self) -> VCenterResult<&str> {
        self.session_id.as_deref().ok_or_else(VCenterError::not_connected)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> VCenterResult<Response> {
        let response = request.header(SESSION_HEADER, self.session()?).send()?;
        check_status(response)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> VCenterResult<T> {
        let response = self.send(self.http.get(self.url(path)))?;
        parse_body(response)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> VCenterResult<T> {
        let response = self.send(self.http.post(self.url(path)).json(body))?;
        parse_body(response)
    }
}

fn check_status(response: Response) -> VCenterResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => {
            VCenterError::auth(format!("Session expired or invalid: {}", body))
        }
        StatusCode::NOT_FOUND => VCenterError::not_found(format!("Resource not found: {}", body)),
        _ => VCenterError::api(status.as_u16(), format!("API error {}: {}", status.as_u16(), body)),
    })
}

fn parse_body<T: DeserializeOwned>(response: Response) -> VCenterResult<T> {
    let text = response.text()?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| {
        let preview: String = text.chars().take(300).collect();
        VCenterError::parse(format!("{} in body: {}", e, preview))
    })
}

#[derive(Deserialize)]
struct RestVmSummary {
    vm: String,
    name: String,
    power_state: String,
}

#[derive(Deserialize)]
struct RestVmInfo {
    name: String,
    power_state: String,
    #[serde(rename = "guest_OS", default)]
    guest_os: Option<String>,
    #[serde(default)]
    cpu: Option<RestCpu>,
    #[serde(default)]
    memory: Option<RestMemory>,
    #[serde(default)]
    identity: Option<RestIdentity>,
}

#[derive(Deserialize)]
struct RestCpu {
    count: u32,
}

#[derive(Deserialize)]
struct RestMemory {
    #[serde(rename = "size_MiB")]
    size_mib: u64,
}

#[derive(Deserialize)]
struct RestIdentity {
    #[serde(default)]
    instance_uuid: Option<String>,
    #[serde(default)]
    bios_uuid: Option<String>,
}

#[derive(Deserialize)]
struct RestSnapshot {
    snapshot: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parent: Option<String>,
}

#[derive(Deserialize)]
struct RestTask {
    status: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Map a CIS task document onto [`TaskInfo`].
///
/// Unknown statuses are a parse error rather than a pending state, so a
/// waiter never spins on a value it cannot interpret.
fn task_from_rest(task: RestTask) -> VCenterResult<TaskInfo> {
    let state = match task.status.as_str() {
        "PENDING" | "BLOCKED" => TaskState::Queued,
        "RUNNING" => TaskState::Running,
        "SUCCEEDED" => TaskState::Success,
        "FAILED" => TaskState::Error,
        other => {
            return Err(VCenterError::parse(format!("Unknown task status: {}", other)));
        }
    };
    let result = task.result.and_then(|value| match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    });
    let error = task.error.map(|value| {
        value
            .pointer("/messages/0/default_message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string())
    });
    Ok(TaskInfo {
        state,
        result,
        error,
    })
}

impl VSphereApi for VsphereRestApi {
    fn login(&mut self) -> VCenterResult<()> {
        let response = self
            .http
            .post(self.url("/api/session"))
            .basic_auth(&self.username, Some(&self.password))
            .send()?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(VCenterError::auth("Invalid vCenter credentials"));
        }
        let session: String = parse_body(check_status(response)?)?;
        debug!(base_url = %self.base_url, "vCenter session created");
        self.session_id = Some(session);
        Ok(())
    }

    fn logout(&mut self) -> VCenterResult<()> {
        if let Some(session) = self.session_id.take() {
            let result = self
                .http
                .delete(self.url("/api/session"))
                .header(SESSION_HEADER, session)
                .send();
            if let Err(e) = result {
                warn!("Failed to close vCenter session cleanly: {}", e);
            }
        }
        Ok(())
    }

    fn list_vms(&self) -> VCenterResult<Vec<VmSummary>> {
        let vms: Vec<RestVmSummary> = self.get("/api/vcenter/vm")?;
        Ok(vms
            .into_iter()
            .map(|vm| VmSummary {
                name: vm.name,
                power_state: vm.power_state,
                guest_os: "Unknown".to_string(),
                vm_id: vm.vm,
            })
            .collect())
    }

    fn find_vm(&self, name: &str) -> VCenterResult<Option<String>> {
        let request = self
            .http
            .get(self.url("/api/vcenter/vm"))
            .query(&[("names", name)]);
        let vms: Vec<RestVmSummary> = parse_body(self.send(request)?)?;
        Ok(vms.into_iter().find(|vm| vm.name == name).map(|vm| vm.vm))
    }

    fn vm_details(&self, vm_id: &str) -> VCenterResult<VmInfo> {
        let vm: RestVmInfo = self.get(&format!("/api/vcenter/vm/{}", vm_id))?;
        let uuid = vm
            .identity
            .and_then(|id| id.instance_uuid.or(id.bios_uuid))
            .unwrap_or_default();
        Ok(VmInfo {
            name: vm.name,
            power_state: vm.power_state,
            guest_os: vm.guest_os.unwrap_or_else(|| "Unknown".to_string()),
            memory_mb: vm.memory.map(|m| m.size_mib).unwrap_or(0),
            num_cpu: vm.cpu.map(|c| c.count).unwrap_or(0),
            vm_id: vm_id.to_string(),
            uuid,
        })
    }

    fn snapshot_tree(&self, vm_id: &str) -> VCenterResult<Vec<SnapshotNode>> {
        let listed: Vec<RestSnapshot> =
            match self.get(&format!("/api/vcenter/vm/{}/snapshots", vm_id)) {
                Ok(listed) => listed,
                // A VM without snapshots may answer 404.
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e),
            };
        let flat = listed
            .into_iter()
            .map(|s| FlatSnapshot {
                name: s.name.unwrap_or_else(|| s.snapshot.clone()),
                id: s.snapshot,
                description: s.description,
                parent: s.parent,
            })
            .collect();
        Ok(build_tree(flat))
    }

    fn create_snapshot(&self, vm_id: &str, spec: &SnapshotSpec) -> VCenterResult<TaskHandle> {
        let body = json!({
            "name": spec.name,
            "description": spec.description,
            "memory": spec.memory,
            "quiesce": spec.quiesce,
        });
        let task: String = self.post(
            &format!("/api/vcenter/vm/{}/snapshots?vmw-task=true", vm_id),
            &body,
        )?;
        Ok(TaskHandle(task))
    }

    fn revert_snapshot(&self, vm_id: &str, snapshot_id: &str) -> VCenterResult<TaskHandle> {
        let task: String = self.post(
            &format!(
                "/api/vcenter/vm/{}/snapshots/{}?action=revert&vmw-task=true",
                vm_id, snapshot_id
            ),
            &json!({}),
        )?;
        Ok(TaskHandle(task))
    }

    fn task_info(&self, task: &TaskHandle) -> VCenterResult<TaskInfo> {
        let raw: RestTask = self.get(&format!("/api/cis/tasks/{}", task.as_str()))?;
        task_from_rest(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RestSettings {
        RestSettings {
            server: "vcenter.example.com".into(),
            port: 8443,
            username: "administrator@vsphere.local".into(),
            password: "secret".into(),
            ssl_verify: false,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn base_url_uses_port() {
        let api = VsphereRestApi::new(&settings()).unwrap();
        assert_eq!(api.base_url(), "https://vcenter.example.com:8443");
    }

    #[test]
    fn calls_before_login_are_not_connected() {
        let api = VsphereRestApi::new(&settings()).unwrap();
        let err = api.list_vms().unwrap_err();
        assert_eq!(err.kind, crate::error::VCenterErrorKind::NotConnected);
    }

    #[test]
    fn logout_without_session_is_noop() {
        let mut api = VsphereRestApi::new(&settings()).unwrap();
        assert!(api.logout().is_ok());
    }

    #[test]
    fn task_states_map() {
        let task = |status: &str| RestTask {
            status: status.into(),
            result: None,
            error: None,
        };
        let state = |status: &str| task_from_rest(task(status)).unwrap().state;
        assert_eq!(state("PENDING"), TaskState::Queued);
        assert_eq!(state("BLOCKED"), TaskState::Queued);
        assert_eq!(state("RUNNING"), TaskState::Running);
        assert_eq!(state("SUCCEEDED"), TaskState::Success);
        assert_eq!(state("FAILED"), TaskState::Error);
    }

    #[test]
    fn unknown_task_status_is_a_parse_error() {
        for status in ["CANCELLED", "", "running"] {
            let err = task_from_rest(RestTask {
                status: status.into(),
                result: None,
                error: None,
            })
            .unwrap_err();
            assert_eq!(err.kind, crate::error::VCenterErrorKind::Parse, "{:?}", status);
        }
    }

    #[test]
    fn task_payloads_are_extracted() {
        let done: RestTask = serde_json::from_value(json!({
            "status": "SUCCEEDED",
            "result": "snapshot-7"
        }))
        .unwrap();
        assert_eq!(task_from_rest(done).unwrap().result.as_deref(), Some("snapshot-7"));

        let failed: RestTask = serde_json::from_value(json!({
            "status": "FAILED",
            "error": {"messages": [{"id": "x", "default_message": "Disk <busy>"}]}
        }))
        .unwrap();
        assert_eq!(task_from_rest(failed).unwrap().error.as_deref(), Some("Disk <busy>"));
    }

    #[test]
    fn vm_detail_document_decodes() {
        let vm: RestVmInfo = serde_json::from_value(json!({
            "name": "web01",
            "power_state": "POWERED_ON",
            "guest_OS": "UBUNTU_64",
            "cpu": {"count": 4, "cores_per_socket": 1},
            "memory": {"size_MiB": 8192},
            "identity": {"name": "web01", "instance_uuid": "5012-ab"}
        }))
        .unwrap();
        assert_eq!(vm.cpu.unwrap().count, 4);
        assert_eq!(vm.memory.unwrap().size_mib, 8192);
        assert_eq!(vm.identity.unwrap().instance_uuid.as_deref(), Some("5012-ab"));
    }
}
