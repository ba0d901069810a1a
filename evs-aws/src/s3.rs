//! S3 staging for exported images.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::client::{AwsClient, S3};
use crate::error::AwsResult;
use crate::signing::uri_encode;

/// Object address, displayed as `s3://bucket/key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSideEncryption {
    /// SSE-S3.
    Aes256,
    /// SSE-KMS with the given key id or ARN.
    Kms(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub encryption: Option<ServerSideEncryption>,
}

pub trait ObjectStore: Send + Sync {
    /// Store `body` at `bucket/key`; returns the object's ETag when provided.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> AwsResult<Option<String>>;
}

/// Escape each `/`-separated key segment for use in a path-style URL.
pub fn object_path(bucket: &str, key: &str) -> String {
    let escaped_key = key
        .split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", uri_encode(bucket), escaped_key)
}

impl ObjectStore for AwsClient {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> AwsResult<Option<String>> {
        let mut headers = BTreeMap::new();
        if let Some(content_type) = &options.content_type {
            headers.insert("content-type".to_string(), content_type.clone());
        }
        match &options.encryption {
            Some(ServerSideEncryption::Aes256) => {
                headers.insert(
                    "x-amz-server-side-encryption".to_string(),
                    "AES256".to_string(),
                );
            }
            Some(ServerSideEncryption::Kms(key_id)) => {
                headers.insert(
                    "x-amz-server-side-encryption".to_string(),
                    "aws:kms".to_string(),
                );
                headers.insert(
                    "x-amz-server-side-encryption-aws-kms-key-id".to_string(),
                    key_id.clone(),
                );
            }
            None => {}
        }

        let response = self.rest_request(S3, Method::PUT, &object_path(bucket, key), headers, body)?;
        Ok(response
            .headers
            .get("etag")
            .map(|etag| etag.trim_matches('"').to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display() {
        let loc = S3Location {
            bucket: "corp-imports".into(),
            key: "vm-imports/web01.ovf".into(),
        };
        assert_eq!(loc.to_string(), "s3://corp-imports/vm-imports/web01.ovf");
    }

    #[test]
    fn object_path_escapes_segments_but_not_separators() {
        assert_eq!(
            object_path("corp-imports", "vm-imports/my vm.ovf"),
            "corp-imports/vm-imports/my%20vm.ovf"
        );
    }
}
