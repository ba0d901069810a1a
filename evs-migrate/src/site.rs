//! The two ends of a migration.
//!
//! [`SourceSite`] is implemented by [`VCenterClient`] and [`TargetSite`] by
//! [`EvsClient`]; tests substitute recording fakes.

use std::path::{Path, PathBuf};

use evs_aws::{EvsClient, ImportTask, MigratedVm, S3Location};
use evs_core::{CancellationToken, PollConfig};
use evs_vcenter::{SnapshotId, VCenterClient, VmInfo};

use crate::error::Result;

pub trait SourceSite {
    fn vm_info(&self, vm_name: &str) -> Result<VmInfo>;

    fn create_snapshot(&self, vm_name: &str, description: &str) -> Result<SnapshotId>;

    /// Export the VM into `dir`, returning the image path.
    fn export_ovf(&self, vm_name: &str, dir: &Path) -> Result<PathBuf>;

    fn revert_to_snapshot(&self, vm_name: &str, snapshot_id: &str) -> Result<()>;
}

pub trait TargetSite {
    fn upload_image(&self, image: &Path) -> Result<S3Location>;

    fn start_import(&self, image: &S3Location, cluster: &str, vm_name: &str) -> Result<ImportTask>;

    fn wait_for_import(
        &self,
        task_id: &str,
        poll: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<ImportTask>;

    fn migrated_vm(&self, vm_name: &str, cluster: &str) -> Result<MigratedVm>;
}

impl SourceSite for VCenterClient {
    fn vm_info(&self, vm_name: &str) -> Result<VmInfo> {
        Ok(self.get_vm_info(vm_name)?)
    }

    fn create_snapshot(&self, vm_name: &str, description: &str) -> Result<SnapshotId> {
        Ok(VCenterClient::create_snapshot(self, vm_name, description)?)
    }

    fn export_ovf(&self, vm_name: &str, dir: &Path) -> Result<PathBuf> {
        Ok(self.export_vm_to_ovf(vm_name, dir)?)
    }

    fn revert_to_snapshot(&self, vm_name: &str, snapshot_id: &str) -> Result<()> {
        Ok(VCenterClient::revert_to_snapshot(self, vm_name, snapshot_id)?)
    }
}

impl TargetSite for EvsClient {
    fn upload_image(&self, image: &Path) -> Result<S3Location> {
        Ok(self.upload_image_to_s3(image)?)
    }

    fn start_import(&self, image: &S3Location, cluster: &str, vm_name: &str) -> Result<ImportTask> {
        Ok(self.import_vm_from_s3(image, cluster, vm_name)?)
    }

    fn wait_for_import(
        &self,
        task_id: &str,
        poll: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<ImportTask> {
        Ok(self.wait_for_import_completion(task_id, poll, cancel)?)
    }

    fn migrated_vm(&self, vm_name: &str, cluster: &str) -> Result<MigratedVm> {
        Ok(self.get_vm_info(vm_name, cluster)?)
    }
}
