use anyhow::{Context, Result};
use tracing::error;

use evs_aws::CloudWatchMonitor;
use evs_core::{evs_error, evs_info, evs_println};
use evs_messages::{msg, MESSAGES};

use super::{AppContext, Outcome};

pub fn handle_metrics(ctx: &AppContext, name: &str) -> Result<Outcome> {
    let monitor = CloudWatchMonitor::from_config(ctx.config.config(), &ctx.log)
        .context("Failed to initialize the CloudWatch client")?;

    let metrics = match monitor.get_cluster_metrics(name) {
        Ok(metrics) => metrics,
        Err(e) => {
            error!(cluster = name, "Fetching metrics failed: {}", e);
            evs_error!("{}", msg!(MESSAGES.metrics_failed, name = name, error = e));
            return Ok(Outcome::Failed);
        }
    };

    if metrics.datapoints.is_empty() {
        evs_info!("{}", msg!(MESSAGES.metrics_empty, name = name));
        return Ok(Outcome::Success);
    }

    evs_println!(
        "{}",
        msg!(
            MESSAGES.metrics_header,
            metric = &metrics.metric_name,
            namespace = &metrics.namespace,
            name = name
        )
    );
    for point in &metrics.datapoints {
        let value = point
            .value
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "-".to_string());
        let unit = point.unit.as_deref().unwrap_or("");
        evs_println!(
            "  {}  {} {}",
            point.timestamp.format("%Y-%m-%d %H:%M:%S"),
            value,
            unit
        );
    }
    Ok(Outcome::Success)
}
