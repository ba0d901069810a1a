//! CloudWatch `GetMetricStatistics` (Query protocol).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{build_query_params, AwsClient, CLOUDWATCH};
use crate::error::{AwsError, AwsResult};

pub const CLOUDWATCH_API_VERSION: &str = "2010-08-01";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<(String, String)>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub period_secs: u32,
    pub statistic: String,
}

/// One aggregated sample. `value` is the requested statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
    pub unit: Option<String>,
}

pub trait MetricsApi: Send + Sync {
    fn get_metric_statistics(&self, query: &MetricQuery) -> AwsResult<Vec<Datapoint>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetMetricStatisticsResponse {
    get_metric_statistics_result: GetMetricStatisticsResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetMetricStatisticsResult {
    #[serde(default)]
    datapoints: Members,
}

#[derive(Debug, Default, Deserialize)]
struct Members {
    #[serde(rename = "member", default)]
    members: Vec<RawDatapoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDatapoint {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    average: Option<f64>,
    #[serde(default)]
    sum: Option<f64>,
    #[serde(default)]
    minimum: Option<f64>,
    #[serde(default)]
    maximum: Option<f64>,
    #[serde(default)]
    sample_count: Option<f64>,
}

impl RawDatapoint {
    fn into_datapoint(self, statistic: &str) -> Datapoint {
        let value = match statistic {
            "Sum" => self.sum,
            "Minimum" => self.minimum,
            "Maximum" => self.maximum,
            "SampleCount" => self.sample_count,
            _ => self.average,
        };
        Datapoint {
            timestamp: self.timestamp,
            value,
            unit: self.unit,
        }
    }
}

/// Decode a response, sorted by timestamp (CloudWatch returns no order).
pub fn parse_metric_statistics(xml: &str, statistic: &str) -> AwsResult<Vec<Datapoint>> {
    let response: GetMetricStatisticsResponse = quick_xml::de::from_str(xml).map_err(|e| {
        AwsError::parse(
            "monitoring",
            format!("Invalid GetMetricStatistics response: {}", e),
        )
    })?;
    let mut points: Vec<Datapoint> = response
        .get_metric_statistics_result
        .datapoints
        .members
        .into_iter()
        .map(|raw| raw.into_datapoint(statistic))
        .collect();
    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

impl MetricsApi for AwsClient {
    fn get_metric_statistics(&self, query: &MetricQuery) -> AwsResult<Vec<Datapoint>> {
        let mut params = build_query_params("GetMetricStatistics", CLOUDWATCH_API_VERSION);
        params.insert("Namespace".to_string(), query.namespace.clone());
        params.insert("MetricName".to_string(), query.metric_name.clone());
        params.insert(
            "StartTime".to_string(),
            query.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        params.insert(
            "EndTime".to_string(),
            query.end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        params.insert("Period".to_string(), query.period_secs.to_string());
        params.insert("Statistics.member.1".to_string(), query.statistic.clone());
        for (i, (name, value)) in query.dimensions.iter().enumerate() {
            params.insert(format!("Dimensions.member.{}.Name", i + 1), name.clone());
            params.insert(format!("Dimensions.member.{}.Value", i + 1), value.clone());
        }

        let body = self.query_request(CLOUDWATCH, &params)?;
        parse_metric_statistics(&body, &query.statistic)
    }
}
