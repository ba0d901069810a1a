//! EC2 subnet discovery (Query protocol, XML responses).

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::client::{build_query_params, AwsClient, EC2};
use crate::error::{AwsError, AwsResult};

pub const EC2_API_VERSION: &str = "2016-11-15";

/// EC2 `Filter.N` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

pub trait SubnetApi: Send + Sync {
    /// Subnet ids matching all `filters`, in the order EC2 returns them.
    fn describe_subnets(&self, filters: &[Filter]) -> AwsResult<Vec<String>>;
}

/// Append `Filter.N.Name` / `Filter.N.Value.M` parameters.
pub fn add_filters(params: &mut BTreeMap<String, String>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        let idx = i + 1;
        params.insert(format!("Filter.{}.Name", idx), filter.name.clone());
        for (j, value) in filter.values.iter().enumerate() {
            params.insert(format!("Filter.{}.Value.{}", idx, j + 1), value.clone());
        }
    }
}

#[derive(Debug, Deserialize)]
struct DescribeSubnetsResponse {
    #[serde(rename = "subnetSet", default)]
    subnet_set: ItemSet,
    #[serde(rename = "nextToken", default)]
    next_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ItemSet {
    #[serde(rename = "item", default)]
    items: Vec<SubnetItem>,
}

#[derive(Debug, Deserialize)]
struct SubnetItem {
    #[serde(rename = "subnetId")]
    subnet_id: String,
}

/// Decode one `DescribeSubnets` page into (ids, next token).
pub fn parse_describe_subnets(xml: &str) -> AwsResult<(Vec<String>, Option<String>)> {
    let response: DescribeSubnetsResponse = quick_xml::de::from_str(xml)
        .map_err(|e| AwsError::parse("ec2", format!("Invalid DescribeSubnets response: {}", e)))?;
    let ids = response
        .subnet_set
        .items
        .into_iter()
        .map(|item| item.subnet_id)
        .collect();
    Ok((ids, response.next_token.filter(|t| !t.is_empty())))
}

impl SubnetApi for AwsClient {
    fn describe_subnets(&self, filters: &[Filter]) -> AwsResult<Vec<String>> {
        let mut subnets = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut params = build_query_params("DescribeSubnets", EC2_API_VERSION);
            add_filters(&mut params, filters);
            if let Some(token) = &next_token {
                params.insert("NextToken".to_string(), token.clone());
            }
            let body = self.query_request(EC2, &params)?;
            let (page, token) = parse_describe_subnets(&body)?;
            subnets.extend(page);
            match token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(subnets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_are_numbered_from_one() {
        let mut params = BTreeMap::new();
        add_filters(
            &mut params,
            &[
                Filter::new("default-for-az", &["true"]),
                Filter::new("state", &["available"]),
            ],
        );
        assert_eq!(params["Filter.1.Name"], "default-for-az");
        assert_eq!(params["Filter.1.Value.1"], "true");
        assert_eq!(params["Filter.2.Name"], "state");
        assert_eq!(params["Filter.2.Value.1"], "available");
    }

    #[test]
    fn parses_subnet_ids_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<DescribeSubnetsResponse xmlns="http://ec2.amazonaws.com/doc/2016-11-15/">
    <requestId>7a62c49f-347e-4fc4-9331-6e8eEXAMPLE</requestId>
    <subnetSet>
        <item>
            <subnetId>subnet-0c</subnetId>
            <state>available</state>
            <vpcId>vpc-1</vpcId>
            <defaultForAz>true</defaultForAz>
            <tagSet/>
        </item>
        <item>
            <subnetId>subnet-0a</subnetId>
            <state>available</state>
            <vpcId>vpc-1</vpcId>
            <defaultForAz>true</defaultForAz>
        </item>
    </subnetSet>
</DescribeSubnetsResponse>"#;
        let (ids, token) = parse_describe_subnets(xml).unwrap();
        assert_eq!(ids, vec!["subnet-0c", "subnet-0a"]);
        assert!(token.is_none());
    }

    #[test]
    fn empty_subnet_set() {
        let xml = r#"<DescribeSubnetsResponse xmlns="http://ec2.amazonaws.com/doc/2016-11-15/">
    <requestId>r</requestId>
    <subnetSet/>
</DescribeSubnetsResponse>"#;
        let (ids, _) = parse_describe_subnets(xml).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn next_token_is_returned() {
        let xml = r#"<DescribeSubnetsResponse>
    <subnetSet><item><subnetId>subnet-1</subnetId></item></subnetSet>
    <nextToken>page-2</nextToken>
</DescribeSubnetsResponse>"#;
        let (ids, token) = parse_describe_subnets(xml).unwrap();
        assert_eq!(ids, vec!["subnet-1"]);
        assert_eq!(token.as_deref(), Some("page-2"));
    }
}
