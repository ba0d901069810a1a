// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "vcf-evs")]
#[command(about = "Manage AWS EVS clusters and migrate VMware VCF workloads onto them")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file (default: config/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file under the logs directory
    #[arg(long, global = true, value_name = "NAME")]
    pub log_file: Option<String>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show EVS cluster status
    Status,

    /// Create a new EVS cluster
    Create {
        /// Cluster name
        #[arg(short, long)]
        name: String,

        /// EC2 bare-metal instance type (default from evs.instance_type)
        #[arg(short = 't', long)]
        instance_type: Option<String>,

        /// Number of hosts (default from evs.node_count)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        size: Option<u32>,

        /// Subnet to place hosts in; repeat for several. Defaults to the
        /// region's default subnets
        #[arg(long = "subnet-id", value_name = "SUBNET_ID")]
        subnet_ids: Vec<String>,

        /// Environment tag value (default from evs.environment)
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Request deletion of an EVS cluster
    Delete {
        #[arg(long)]
        cluster_id: String,
    },

    /// Show details of one EVS cluster
    Describe {
        #[arg(long)]
        cluster_id: String,
    },

    /// Show CloudWatch metrics for a cluster
    Metrics {
        /// Cluster name
        #[arg(short, long)]
        name: String,
    },

    /// List virtual machines on the configured vCenter
    Vms,

    /// Migrate a VM from VCF to EVS
    Migrate {
        /// Source VM name
        #[arg(short, long)]
        source: String,

        /// Target cluster name
        #[arg(short, long)]
        target: String,
    },

    /// Revert a source VM to its pre-migration snapshot
    Rollback {
        /// Source VM name
        #[arg(long)]
        vm: String,

        #[arg(long)]
        snapshot_id: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Create { .. } => "create",
            Command::Delete { .. } => "delete",
            Command::Describe { .. } => "describe",
            Command::Metrics { .. } => "metrics",
            Command::Vms => "vms",
            Command::Migrate { .. } => "migrate",
            Command::Rollback { .. } => "rollback",
        }
    }
}
