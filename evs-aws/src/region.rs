//! Region to endpoint mapping.

/// DNS suffix for the partition a region belongs to.
pub fn dns_suffix(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    }
}

/// Default HTTPS endpoint for `endpoint_prefix` in `region`.
///
/// `endpoint_prefix` is the DNS label of the service, which differs from the
/// signing name for some services (CloudWatch is `monitoring`).
pub fn endpoint(endpoint_prefix: &str, region: &str) -> String {
    format!("https://{}.{}.{}", endpoint_prefix, region, dns_suffix(region))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_partition() {
        assert_eq!(endpoint("evs", "us-west-2"), "https://evs.us-west-2.amazonaws.com");
        assert_eq!(
            endpoint("monitoring", "eu-central-1"),
            "https://monitoring.eu-central-1.amazonaws.com"
        );
    }

    #[test]
    fn china_partition() {
        assert_eq!(endpoint("ec2", "cn-north-1"), "https://ec2.cn-north-1.amazonaws.com.cn");
    }
}
