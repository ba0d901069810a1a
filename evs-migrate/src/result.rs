use serde::{Deserialize, Serialize};

/// Outcome of one `migrate_vm` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MigrationResult {
    Success {
        vm_name: String,
        target_cluster: String,
        snapshot_id: String,
        migrated_vm_id: String,
    },
    Failed {
        vm_name: String,
        error: String,
    },
}

impl MigrationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn vm_name(&self) -> &str {
        match self {
            Self::Success { vm_name, .. } | Self::Failed { vm_name, .. } => vm_name,
        }
    }

    /// Snapshot to roll back to, when the migration got that far and succeeded.
    pub fn snapshot_id(&self) -> Option<&str> {
        match self {
            Self::Success { snapshot_id, .. } => Some(snapshot_id),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_shape() {
        let result = MigrationResult::Success {
            vm_name: "web01".into(),
            target_cluster: "prod-cluster".into(),
            snapshot_id: "snapshot-1".into(),
            migrated_vm_id: "vm-abc".into(),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "status": "success",
                "vm_name": "web01",
                "target_cluster": "prod-cluster",
                "snapshot_id": "snapshot-1",
                "migrated_vm_id": "vm-abc"
            })
        );
    }

    #[test]
    fn failed_shape() {
        let result = MigrationResult::Failed {
            vm_name: "web01".into(),
            error: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "failed", "vm_name": "web01", "error": "boom"})
        );
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("boom"));
        assert!(result.snapshot_id().is_none());
    }
}
