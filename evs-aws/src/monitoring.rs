use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::AwsClient;
use crate::cloudwatch::{Datapoint, MetricQuery, MetricsApi};
use crate::error::AwsResult;
use evs_config::{Config, MonitoringConfig};
use evs_logging::Logger;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMetrics {
    pub cluster_name: String,
    pub namespace: String,
    pub metric_name: String,
    pub datapoints: Vec<Datapoint>,
}

/// Reads cluster health metrics from CloudWatch.
pub struct CloudWatchMonitor {
    metrics: Box<dyn MetricsApi>,
    settings: MonitoringConfig,
    log: Logger,
}

impl CloudWatchMonitor {
    pub fn new(metrics: Box<dyn MetricsApi>, settings: MonitoringConfig, log: Logger) -> Self {
        Self {
            metrics,
            settings,
            log,
        }
    }

    pub fn from_config(config: &Config, log: &Logger) -> AwsResult<Self> {
        let client = AwsClient::from_config(&config.aws)?;
        Ok(Self::new(
            Box::new(client),
            config.monitoring.clone(),
            log.component("cloudwatch"),
        ))
    }

    /// Datapoints for the configured metric over the lookback window, oldest first.
    pub fn get_cluster_metrics(&self, cluster_name: &str) -> AwsResult<ClusterMetrics> {
        let _span = self.log.enter();
        let end_time = Utc::now();
        let start_time = end_time - Duration::minutes(i64::from(self.settings.lookback_minutes));
        let query = MetricQuery {
            namespace: self.settings.namespace.clone(),
            metric_name: self.settings.metric_name.clone(),
            dimensions: vec![("ClusterName".to_string(), cluster_name.to_string())],
            start_time,
            end_time,
            period_secs: self.settings.period_secs,
            statistic: self.settings.statistic.clone(),
        };

        let datapoints = self.metrics.get_metric_statistics(&query).map_err(|e| {
            warn!("Error getting cluster metrics for {}: {}", cluster_name, e);
            e
        })?;
        debug!(cluster = cluster_name, count = datapoints.len(), "Fetched cluster metrics");

        Ok(ClusterMetrics {
            cluster_name: cluster_name.to_string(),
            namespace: query.namespace,
            metric_name: query.metric_name,
            datapoints,
        })
    }
}
