//! Seven-step VM migration from vCenter to an EVS cluster.
//!
//! Steps run strictly in order and the first failure ends the run; nothing
//! after the failing step is attempted and nothing is rolled back
//! automatically. The pre-migration snapshot id in a successful result is
//! what [`VMigrator::rollback_migration`] needs later.

use std::path::PathBuf;
use tracing::{error, info};

use evs_aws::EvsClient;
use evs_config::{Config, MigrationConfig};
use evs_core::{CancellationToken, PollConfig};
use evs_logging::Logger;
use evs_vcenter::VCenterClient;

use crate::error::{MigrationError, Result};
use crate::result::MigrationResult;
use crate::site::{SourceSite, TargetSite};
use crate::step::MigrationStep;

/// Local settings for a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratorSettings {
    /// Directory that receives exported images.
    pub export_dir: PathBuf,
    /// Bounds for waiting on the EVS import task.
    pub import_poll: PollConfig,
}

impl MigratorSettings {
    pub fn from_config(migration: &MigrationConfig) -> Self {
        Self {
            export_dir: PathBuf::from(&migration.export_path),
            import_poll: PollConfig::with_timeout(migration.import_timeout())
                .initial_interval(migration.poll_initial())
                .max_interval(migration.poll_max()),
        }
    }
}

impl Default for MigratorSettings {
    fn default() -> Self {
        Self::from_config(&MigrationConfig::default())
    }
}

struct StepFailure {
    step: MigrationStep,
    error: MigrationError,
}

pub struct VMigrator<S, T> {
    source: S,
    target: T,
    settings: MigratorSettings,
    cancel: CancellationToken,
    log: Logger,
}

impl VMigrator<VCenterClient, EvsClient> {
    /// Connect to vCenter and build the AWS client from configuration.
    ///
    /// `cancel` aborts both vCenter task waits and the import wait.
    pub fn from_config(config: &Config, cancel: CancellationToken, log: &Logger) -> Result<Self> {
        let migration = &config.migration;
        let task_poll = PollConfig::with_timeout(migration.task_timeout())
            .initial_interval(migration.poll_initial())
            .max_interval(migration.poll_max());
        let mut source = VCenterClient::new(&config.vmware, log)?
            .with_task_poll(task_poll)
            .with_cancellation(cancel.clone());
        source.connect()?;
        let target = EvsClient::from_config(config, log)?;

        Ok(Self::new(
            source,
            target,
            MigratorSettings::from_config(migration),
            log,
        )
        .with_cancellation(cancel))
    }
}

impl<S: SourceSite, T: TargetSite> VMigrator<S, T> {
    pub fn new(source: S, target: T, settings: MigratorSettings, log: &Logger) -> Self {
        Self {
            source,
            target,
            settings,
            cancel: CancellationToken::new(),
            log: log.component("migrator"),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Move `vm_name` onto `target_cluster`. Never panics or propagates;
    /// failures come back as [`MigrationResult::Failed`].
    pub fn migrate_vm(&self, vm_name: &str, target_cluster: &str) -> MigrationResult {
        let _span = self.log.enter();
        info!(vm = vm_name, cluster = target_cluster, "Starting VM migration");

        match self.run(vm_name, target_cluster) {
            Ok((snapshot_id, migrated_vm_id)) => {
                info!(
                    vm = vm_name,
                    cluster = target_cluster,
                    migrated_vm_id = %migrated_vm_id,
                    "Migration completed"
                );
                MigrationResult::Success {
                    vm_name: vm_name.to_string(),
                    target_cluster: target_cluster.to_string(),
                    snapshot_id,
                    migrated_vm_id,
                }
            }
            Err(failure) => {
                error!(
                    vm = vm_name,
                    step = %failure.step,
                    "Migration failed: {}",
                    failure.error
                );
                MigrationResult::Failed {
                    vm_name: vm_name.to_string(),
                    error: failure.error.to_string(),
                }
            }
        }
    }

    fn run(
        &self,
        vm_name: &str,
        target_cluster: &str,
    ) -> std::result::Result<(String, String), StepFailure> {
        let vm = step(MigrationStep::FetchVmInfo, || self.source.vm_info(vm_name))?;
        info!(vm = %vm.name, power_state = %vm.power_state, guest_os = %vm.guest_os, "Source VM found");

        let snapshot_id = step(MigrationStep::Snapshot, || {
            self.source
                .create_snapshot(vm_name, &format!("Pre-migration snapshot for {}", vm_name))
        })?;

        let image = step(MigrationStep::Export, || {
            self.source.export_ovf(vm_name, &self.settings.export_dir)
        })?;

        let location = step(MigrationStep::Upload, || self.target.upload_image(&image))?;

        let task = step(MigrationStep::Import, || {
            self.target.start_import(&location, target_cluster, vm_name)
        })?;

        step(MigrationStep::WaitForImport, || {
            self.target
                .wait_for_import(&task.import_task_id, &self.settings.import_poll, &self.cancel)
        })?;

        let migrated = step(MigrationStep::Verify, || {
            self.target.migrated_vm(vm_name, target_cluster)
        })?;

        Ok((snapshot_id, migrated.vm_id))
    }

    /// Revert the source VM to `snapshot_id`. Faults are logged and reported
    /// as `false`.
    pub fn rollback_migration(&self, vm_name: &str, snapshot_id: &str) -> bool {
        let _span = self.log.enter();
        info!(vm = vm_name, snapshot_id, "Rolling back migration");
        match self.source.revert_to_snapshot(vm_name, snapshot_id) {
            Ok(()) => {
                info!(vm = vm_name, snapshot_id, "Rollback completed");
                true
            }
            Err(e) => {
                error!(vm = vm_name, snapshot_id, "Rollback failed: {}", e);
                false
            }
        }
    }
}

fn step<R>(
    step: MigrationStep,
    run: impl FnOnce() -> Result<R>,
) -> std::result::Result<R, StepFailure> {
    info!("{}", step);
    run().map_err(|error| StepFailure { step, error })
}
