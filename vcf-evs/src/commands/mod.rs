// Command handlers

use anyhow::Result;
use tracing::debug;

use evs_config::ConfigManager;
use evs_core::CancellationToken;
use evs_logging::Logger;
use vcf_evs::bootstrap;

use crate::cli::{Args, Command};

mod cluster;
mod metrics;
mod migrate;
mod vms;

/// How a command ended once it has reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    pub fn from_success(ok: bool) -> Self {
        if ok {
            Outcome::Success
        } else {
            Outcome::Failed
        }
    }
}

/// Shared state handed to every command handler.
pub struct AppContext {
    pub config: ConfigManager,
    pub log: Logger,
    pub cancel: CancellationToken,
}

/// Dispatches a parsed command.
///
/// Failures a handler has already explained to the user come back as
/// [`Outcome::Failed`]; anything else propagates as an error.
pub fn execute_command(args: Args, log: &Logger) -> Result<Outcome> {
    let config = bootstrap::load_config(args.config.as_deref())?;
    let ctx = AppContext {
        config,
        log: log.clone(),
        cancel: CancellationToken::new(),
    };

    match args.command {
        Command::Status => {
            debug!("Calling cluster::handle_status");
            cluster::handle_status(&ctx)
        }
        Command::Create {
            name,
            instance_type,
            size,
            subnet_ids,
            environment,
        } => {
            debug!(name = %name, "Calling cluster::handle_create");
            cluster::handle_create(&ctx, name, instance_type, size, subnet_ids, environment)
        }
        Command::Delete { cluster_id } => {
            debug!(cluster_id = %cluster_id, "Calling cluster::handle_delete");
            cluster::handle_delete(&ctx, &cluster_id)
        }
        Command::Describe { cluster_id } => {
            debug!(cluster_id = %cluster_id, "Calling cluster::handle_describe");
            cluster::handle_describe(&ctx, &cluster_id)
        }
        Command::Metrics { name } => {
            debug!(name = %name, "Calling metrics::handle_metrics");
            metrics::handle_metrics(&ctx, &name)
        }
        Command::Vms => {
            debug!("Calling vms::handle_vms");
            vms::handle_vms(&ctx)
        }
        Command::Migrate { source, target } => {
            debug!(source = %source, target = %target, "Calling migrate::handle_migrate");
            migrate::handle_migrate(&ctx, &source, &target)
        }
        Command::Rollback { vm, snapshot_id } => {
            debug!(vm = %vm, snapshot_id = %snapshot_id, "Calling migrate::handle_rollback");
            migrate::handle_rollback(&ctx, &vm, &snapshot_id)
        }
    }
}
