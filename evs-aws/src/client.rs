//! Blocking AWS HTTP client with SigV4 signing.
//!
//! Supports the three wire styles the toolkit needs: JSON 1.0 (EVS),
//! Query (EC2, CloudWatch) and REST (S3). There is no retry layer; a failed
//! call returns its error to the caller unchanged.

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::credentials::AwsCredentials;
use crate::error::{AwsError, AwsResult};
use crate::region;
use crate::signing::{build_query_string, SigV4Signer};
use evs_config::{AwsConfig, EndpointOverrides};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How a service is addressed and signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Service {
    /// Name in the credential scope.
    pub signing_name: &'static str,
    /// DNS label of the regional endpoint.
    pub endpoint_prefix: &'static str,
}

pub const EVS: Service = Service {
    signing_name: "evs",
    endpoint_prefix: "evs",
};
pub const EC2: Service = Service {
    signing_name: "ec2",
    endpoint_prefix: "ec2",
};
pub const S3: Service = Service {
    signing_name: "s3",
    endpoint_prefix: "s3",
};
pub const CLOUDWATCH: Service = Service {
    signing_name: "monitoring",
    endpoint_prefix: "monitoring",
};

#[derive(Debug, Clone)]
pub struct AwsResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub request_id: Option<String>,
}

impl AwsResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct AwsClient {
    http: Client,
    credentials: AwsCredentials,
    region: String,
    endpoints: EndpointOverrides,
    user_agent: String,
}

impl AwsClient {
    pub fn new(
        credentials: AwsCredentials,
        region: &str,
        endpoints: EndpointOverrides,
        timeout: Duration,
    ) -> AwsResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(AwsError::from)?;

        Ok(Self {
            http,
            credentials,
            region: region.to_string(),
            endpoints,
            user_agent: format!("vcf-evs/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Resolve credentials for the configured profile and build a client.
    pub fn from_config(aws: &AwsConfig) -> AwsResult<Self> {
        let credentials = AwsCredentials::resolve(aws.profile.as_deref())?;
        Self::new(credentials, &aws.region, aws.endpoints.clone(), DEFAULT_TIMEOUT)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Base URL for `service`, honoring configured overrides.
    pub fn endpoint(&self, service: Service) -> String {
        let override_url = match service.signing_name {
            "evs" => self.endpoints.evs.as_ref(),
            "ec2" => self.endpoints.ec2.as_ref(),
            "s3" => self.endpoints.s3.as_ref(),
            "monitoring" => self.endpoints.cloudwatch.as_ref(),
            _ => None,
        };
        match override_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => region::endpoint(service.endpoint_prefix, &self.region),
        }
    }

    /// AWS Query protocol: form-encoded POST, XML response body.
    pub fn query_request(
        &self,
        service: Service,
        params: &BTreeMap<String, String>,
    ) -> AwsResult<String> {
        let url = format!("{}/", self.endpoint(service));
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded; charset=utf-8".to_string(),
        );
        let body = build_query_string(params).into_bytes();
        let response = self.execute_signed(service, Method::POST, &url, headers, body)?;
        Ok(response.text())
    }

    /// AWS JSON 1.0 protocol: POST with `x-amz-target`, JSON both ways.
    pub fn json_request(
        &self,
        service: Service,
        target: &str,
        payload: &serde_json::Value,
    ) -> AwsResult<serde_json::Value> {
        let url = format!("{}/", self.endpoint(service));
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-amz-json-1.0".to_string(),
        );
        headers.insert("x-amz-target".to_string(), target.to_string());
        let body = serde_json::to_vec(payload)
            .map_err(|e| AwsError::parse(service.signing_name, e.to_string()))?;

        let response = self.execute_signed(service, Method::POST, &url, headers, body)?;
        if response.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|e| {
            AwsError::parse(service.signing_name, format!("Invalid JSON from {}: {}", target, e))
        })
    }

    /// REST style request against `path` (already escaped) under the endpoint.
    pub fn rest_request(
        &self,
        service: Service,
        method: Method,
        path: &str,
        headers: BTreeMap<String, String>,
        body: Vec<u8>,
    ) -> AwsResult<AwsResponse> {
        let url = format!("{}/{}", self.endpoint(service), path.trim_start_matches('/'));
        self.execute_signed(service, method, &url, headers, body)
    }

    fn execute_signed(
        &self,
        service: Service,
        method: Method,
        url: &str,
        mut headers: BTreeMap<String, String>,
        body: Vec<u8>,
    ) -> AwsResult<AwsResponse> {
        headers.insert("host".to_string(), host_header(url));

        let signer = SigV4Signer::new(
            &self.credentials.access_key_id,
            &self.credentials.secret_access_key,
            self.credentials.session_token.as_deref(),
            &self.region,
            service.signing_name,
        )
        .with_payload_header(service == S3);
        let signed = signer.sign_request(method.as_str(), url, &headers, &body, Utc::now());

        debug!(service = service.signing_name, %method, url, "Sending AWS request");
        let mut request = self
            .http
            .request(method, url)
            .header("user-agent", &self.user_agent);
        for (key, value) in &signed.headers {
            // reqwest derives Host from the URL.
            if key != "host" {
                request = request.header(key.as_str(), value.as_str());
            }
        }
        let response = request.body(body).send()?;

        let status = response.status().as_u16();
        let mut response_headers = BTreeMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                response_headers.insert(key.as_str().to_string(), v.to_string());
            }
        }
        let request_id = response_headers
            .get("x-amzn-requestid")
            .or_else(|| response_headers.get("x-amz-request-id"))
            .cloned();
        let body = response.bytes()?.to_vec();

        if !(200..300).contains(&status) {
            let text = String::from_utf8_lossy(&body);
            let err = if text.trim_start().starts_with('<') {
                AwsError::from_xml_body(service.signing_name, status, &text)
            } else {
                AwsError::from_json_body(service.signing_name, status, &text)
            };
            return Err(err.with_request_id(request_id));
        }

        Ok(AwsResponse {
            status,
            headers: response_headers,
            body,
            request_id,
        })
    }
}

/// `host[:port]` as it must appear in the signed `host` header.
fn host_header(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("amazonaws.com").to_string();
            match parsed.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            }
        }
        Err(_) => "amazonaws.com".to_string(),
    }
}

/// Query API parameters with `Action` and `Version` filled in.
pub fn build_query_params(action: &str, version: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("Action".to_string(), action.to_string());
    params.insert("Version".to_string(), version.to_string());
    params
}
