//! Single-VM migration script.
//!
//! Prints the structured migration result as JSON on stdout and exits 0 on
//! success, 1 otherwise. With `--rollback` it reverts the VM to the given
//! snapshot instead.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info_span};

use evs_config::DEFAULT_CONFIG_PATH;
use evs_core::{evs_error, evs_warning, CancellationToken};
use evs_logging::Logger;
use evs_messages::{msg, MESSAGES};
use evs_migrate::VMigrator;
use vcf_evs::bootstrap;

#[derive(Debug, Parser)]
#[command(name = "migrate-vm")]
#[command(about = "Migrate a VM from VCF to EVS")]
#[command(version)]
struct Args {
    /// Name of the VM to migrate
    #[arg(long)]
    vm_name: String,

    /// Target EVS cluster
    #[arg(long, required_unless_present = "rollback")]
    target_cluster: Option<String>,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Roll back using this snapshot id instead of migrating
    #[arg(long, value_name = "SNAPSHOT_ID")]
    rollback: Option<String>,

    /// Upper bound on the EVS import wait, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Write logs to this file under the logs directory
    #[arg(long, value_name = "NAME")]
    log_file: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn run(args: &Args, log: &Logger) -> Result<bool> {
    let manager = bootstrap::load_config(Some(&args.config))?;
    let mut config = manager.config().clone();
    if let Some(secs) = args.timeout {
        config.migration.import_timeout_secs = secs;
    }

    let migrator = VMigrator::from_config(&config, CancellationToken::new(), log)
        .context("Failed to set up the migrator")?;

    if let Some(snapshot_id) = &args.rollback {
        return Ok(migrator.rollback_migration(&args.vm_name, snapshot_id));
    }

    let target = args
        .target_cluster
        .as_deref()
        .context("--target-cluster is required unless --rollback is given")?;
    let result = migrator.migrate_vm(&args.vm_name, target);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.is_success())
}

fn main() {
    let args = Args::parse();

    let log_guard = match bootstrap::init_logging(args.debug, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            evs_warning!("Failed to initialize logging: {}", e);
            None
        }
    };

    let request = info_span!("request", request_id = bootstrap::request_id()).entered();
    let log = Logger::root("migrate-vm");

    let code = match run(&args, &log) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("Script failed: {:#}", e);
            evs_error!("{}", msg!(MESSAGES.common_error, error = format!("{:#}", e)));
            1
        }
    };

    drop(request);
    drop(log_guard);
    std::process::exit(code);
}
