// Migration and rollback commands

use anyhow::Result;
use tracing::error;

use evs_core::{evs_error, evs_error_hint, evs_println};
use evs_messages::{msg, MESSAGES};
use evs_migrate::{MigrationResult, VMigrator};
use vcf_evs::progress;

use super::{AppContext, Outcome};

pub fn handle_migrate(ctx: &AppContext, source: &str, target: &str) -> Result<Outcome> {
    evs_println!("{}", msg!(MESSAGES.migrate_starting, vm = source, cluster = target));

    let migrator = match VMigrator::from_config(ctx.config.config(), ctx.cancel.clone(), &ctx.log)
    {
        Ok(migrator) => migrator,
        Err(e) => {
            error!(vm = source, "Migrator setup failed: {}", e);
            evs_error!("{}", msg!(MESSAGES.migrate_failed, vm = source, error = e));
            return Ok(Outcome::Failed);
        }
    };

    let pb = progress::spinner(format!("Migrating {} to {}...", source, target));
    let result = migrator.migrate_vm(source, target);
    pb.finish_and_clear();

    match result {
        MigrationResult::Success {
            snapshot_id,
            migrated_vm_id,
            ..
        } => {
            evs_println!("{}", msg!(MESSAGES.migrate_success, vm = source, cluster = target));
            evs_println!("{}", msg!(MESSAGES.migrate_snapshot, snapshot_id = &snapshot_id));
            evs_println!("{}", msg!(MESSAGES.migrate_migrated_vm, vm_id = &migrated_vm_id));
            Ok(Outcome::Success)
        }
        MigrationResult::Failed { error, .. } => {
            evs_error!("{}", msg!(MESSAGES.migrate_failed, vm = source, error = &error));
            evs_error_hint!("{}", msg!(MESSAGES.migrate_rollback_hint, vm = source));
            Ok(Outcome::Failed)
        }
    }
}

pub fn handle_rollback(ctx: &AppContext, vm: &str, snapshot_id: &str) -> Result<Outcome> {
    evs_println!(
        "{}",
        msg!(MESSAGES.rollback_starting, vm = vm, snapshot_id = snapshot_id)
    );

    let migrator = match VMigrator::from_config(ctx.config.config(), ctx.cancel.clone(), &ctx.log)
    {
        Ok(migrator) => migrator,
        Err(e) => {
            error!(vm, "Migrator setup failed: {}", e);
            evs_error!("{}", msg!(MESSAGES.rollback_failed, vm = vm, snapshot_id = snapshot_id));
            evs_error!("   {}", e);
            return Ok(Outcome::Failed);
        }
    };

    let pb = progress::spinner(format!("Reverting {}...", vm));
    let reverted = migrator.rollback_migration(vm, snapshot_id);
    pb.finish_and_clear();

    if reverted {
        evs_println!(
            "{}",
            msg!(MESSAGES.rollback_success, vm = vm, snapshot_id = snapshot_id)
        );
    } else {
        evs_error!(
            "{}",
            msg!(MESSAGES.rollback_failed, vm = vm, snapshot_id = snapshot_id)
        );
    }
    Ok(Outcome::from_success(reverted))
}
