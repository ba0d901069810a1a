// EVS cluster lifecycle commands

use anyhow::{Context, Result};
use tracing::error;

use evs_aws::{ClusterSpec, EvsClient};
use evs_core::{evs_error, evs_info, evs_println};
use evs_messages::{msg, MESSAGES};
use vcf_evs::{progress, table};

use super::{AppContext, Outcome};

fn evs_client(ctx: &AppContext) -> Result<EvsClient> {
    EvsClient::from_config(ctx.config.config(), &ctx.log)
        .context("Failed to initialize the EVS client")
}

pub fn handle_status(ctx: &AppContext) -> Result<Outcome> {
    let client = evs_client(ctx)?;

    let clusters = match client.list_clusters() {
        Ok(clusters) => clusters,
        Err(e) => {
            error!("Listing clusters failed: {}", e);
            evs_error!("{}", msg!(MESSAGES.cluster_status_failed, error = e));
            return Ok(Outcome::Failed);
        }
    };

    if clusters.is_empty() {
        evs_info!("{}", msg!(MESSAGES.cluster_status_empty, region = client.region()));
        return Ok(Outcome::Success);
    }

    evs_println!("{}", msg!(MESSAGES.cluster_status_header, region = client.region()));
    evs_println!();
    print!("{}", table::cluster_table(&clusters));
    Ok(Outcome::Success)
}

pub fn handle_create(
    ctx: &AppContext,
    name: String,
    instance_type: Option<String>,
    size: Option<u32>,
    subnet_ids: Vec<String>,
    environment: Option<String>,
) -> Result<Outcome> {
    let client = evs_client(ctx)?;
    let defaults = ctx.config.evs();

    let instance_type = instance_type.unwrap_or_else(|| defaults.instance_type.clone());
    let size = size.unwrap_or(defaults.node_count);
    let mut spec = ClusterSpec::named(name.as_str())
        .instance_type(instance_type.as_str())
        .node_count(size)
        .subnet_ids(subnet_ids);
    if let Some(environment) = environment {
        spec = spec.environment(environment);
    }

    evs_println!(
        "{}",
        msg!(
            MESSAGES.cluster_create_starting,
            name = &name,
            size = size,
            instance_type = &instance_type
        )
    );
    let pb = progress::spinner(format!("Creating cluster {}...", name));
    let created = client.create_cluster(&spec);
    pb.finish_and_clear();

    match created {
        Ok(created) => {
            evs_println!(
                "{}",
                msg!(
                    MESSAGES.cluster_create_success,
                    name = &name,
                    cluster_id = &created.cluster_id,
                    status = &created.cluster_status
                )
            );
            Ok(Outcome::Success)
        }
        Err(e) => {
            error!(name = %name, "Cluster creation failed: {}", e);
            evs_error!("{}", msg!(MESSAGES.cluster_create_failed, name = &name, error = e));
            Ok(Outcome::Failed)
        }
    }
}

pub fn handle_delete(ctx: &AppContext, cluster_id: &str) -> Result<Outcome> {
    let client = evs_client(ctx)?;

    evs_println!("{}", msg!(MESSAGES.cluster_delete_starting, cluster_id = cluster_id));
    match client.delete_cluster(cluster_id) {
        Ok(_) => {
            evs_println!("{}", msg!(MESSAGES.cluster_delete_success, cluster_id = cluster_id));
            Ok(Outcome::Success)
        }
        Err(e) => {
            error!(cluster_id, "Cluster deletion failed: {}", e);
            evs_error!(
                "{}",
                msg!(MESSAGES.cluster_delete_failed, cluster_id = cluster_id, error = e)
            );
            Ok(Outcome::Failed)
        }
    }
}

pub fn handle_describe(ctx: &AppContext, cluster_id: &str) -> Result<Outcome> {
    let client = evs_client(ctx)?;

    match client.get_cluster_status(cluster_id) {
        Ok(info) => {
            evs_println!("{}", msg!(MESSAGES.cluster_describe_header, cluster_id = cluster_id));
            print!("{}", table::cluster_details(&info));
            Ok(Outcome::Success)
        }
        Err(e) => {
            error!(cluster_id, "Describing cluster failed: {}", e);
            evs_error!("{}", msg!(MESSAGES.cluster_status_failed, error = e));
            Ok(Outcome::Failed)
        }
    }
}
