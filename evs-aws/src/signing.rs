//! AWS Signature Version 4.
//!
//! <https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html>
//!
//! 1. Create a canonical request
//! 2. Create the string to sign
//! 3. Derive the signing key
//! 4. Add the signature to the request

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Hash of an empty payload.
pub const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Everything except RFC 3986 unreserved characters.
const AWS_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct SigV4Signer {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    region: String,
    service: String,
    /// S3 requires `x-amz-content-sha256`; other services accept it but the
    /// reference test suite signs without it.
    payload_header: bool,
}

/// Headers to send, including `authorization`.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: BTreeMap<String, String>,
    pub signature: String,
}

impl SigV4Signer {
    pub fn new(
        access_key_id: &str,
        secret_access_key: &str,
        session_token: Option<&str>,
        region: &str,
        service: &str,
    ) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: session_token.map(str::to_string),
            region: region.to_string(),
            service: service.to_string(),
            payload_header: false,
        }
    }

    pub fn with_payload_header(mut self, enabled: bool) -> Self {
        self.payload_header = enabled;
        self
    }

    /// Sign a request. `headers` must contain `host`.
    pub fn sign_request(
        &self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &[u8],
        timestamp: DateTime<Utc>,
    ) -> SignedRequest {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        let mut signed_headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        signed_headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(ref token) = self.session_token {
            signed_headers.insert("x-amz-security-token".to_string(), token.clone());
        }

        let payload_hash = sha256_hex(body);
        if self.payload_header {
            signed_headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        }

        let (canonical_uri, canonical_query) = parse_url_components(url);

        // Step 1
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method,
            canonical_uri,
            canonical_query,
            canonical_headers(&signed_headers),
            signed_header_names(&signed_headers),
            payload_hash
        );

        // Step 2
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            sha256_hex(canonical_request.as_bytes())
        );

        // Step 3
        let signing_key = self.derive_signing_key(&date_stamp);

        // Step 4
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));
        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.access_key_id,
            credential_scope,
            signed_header_names(&signed_headers),
            signature
        );
        signed_headers.insert("authorization".to_string(), authorization);

        SignedRequest {
            headers: signed_headers,
            signature,
        }
    }

    fn derive_signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_secret = format!("AWS4{}", self.secret_access_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        hmac_sha256(&k_service, b"aws4_request")
    }
}

fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect()
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Split a URL into (canonical URI, canonical query string).
///
/// Path segments are decoded and re-encoded once, so already-escaped S3 keys
/// are not double-encoded. Query pairs are sorted by key, then value.
fn parse_url_components(url: &str) -> (String, String) {
    let Ok(parsed) = url::Url::parse(url) else {
        return ("/".to_string(), String::new());
    };

    let path = if parsed.path().is_empty() {
        "/".to_string()
    } else {
        parsed
            .path()
            .split('/')
            .map(|segment| uri_encode(&percent_decode_str(segment).decode_utf8_lossy()))
            .collect::<Vec<_>>()
            .join("/")
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    (path, query)
}

/// URI-encode per SigV4 (RFC 3986 unreserved characters pass through).
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, AWS_ENCODE_SET).to_string()
}

/// Form-encode parameters in key order, as the Query protocol expects.
pub fn build_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn test_suite_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    fn host_headers() -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Host".to_string(), "example.amazonaws.com".to_string());
        headers
    }

    #[test]
    fn empty_payload_hash() {
        assert_eq!(sha256_hex(b""), EMPTY_PAYLOAD_HASH);
    }

    #[test]
    fn signing_key_matches_reference() {
        let signer = SigV4Signer::new("AKIDEXAMPLE", SECRET, None, "us-east-1", "iam");
        assert_eq!(
            hex::encode(signer.derive_signing_key("20150830")),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn get_vanilla_matches_test_suite() {
        let signer = SigV4Signer::new("AKIDEXAMPLE", SECRET, None, "us-east-1", "service");
        let signed = signer.sign_request(
            "GET",
            "https://example.amazonaws.com/",
            &host_headers(),
            b"",
            test_suite_time(),
        );
        assert_eq!(
            signed.signature,
            "5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(
            signed.headers["authorization"],
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn get_vanilla_query_matches_test_suite() {
        let signer = SigV4Signer::new("AKIDEXAMPLE", SECRET, None, "us-east-1", "service");
        let signed = signer.sign_request(
            "GET",
            "https://example.amazonaws.com/?Param1=value1",
            &host_headers(),
            b"",
            test_suite_time(),
        );
        assert_eq!(
            signed.signature,
            "a67d582fa61cc504c4bae71f336f98b97f1ea3c7a6bfe1b6e45aec72011b9aeb"
        );
    }

    #[test]
    fn session_token_and_payload_header_are_signed() {
        let signer = SigV4Signer::new("ASIA", "secret", Some("token-1"), "us-west-2", "s3")
            .with_payload_header(true);
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "s3.us-west-2.amazonaws.com".to_string());
        let signed = signer.sign_request(
            "PUT",
            "https://s3.us-west-2.amazonaws.com/bucket/web01.ovf",
            &headers,
            b"<Envelope/>",
            test_suite_time(),
        );
        assert_eq!(signed.headers["x-amz-security-token"], "token-1");
        assert_eq!(signed.headers["x-amz-content-sha256"], sha256_hex(b"<Envelope/>"));
        assert!(signed.headers["authorization"]
            .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn query_is_sorted_and_encoded() {
        let (path, query) =
            parse_url_components("https://example.com/?Z=1&A=b%20c&M=3");
        assert_eq!(path, "/");
        assert_eq!(query, "A=b%20c&M=3&Z=1");
    }

    #[test]
    fn escaped_path_is_not_double_encoded() {
        let (path, _) =
            parse_url_components("https://s3.amazonaws.com/bucket/vm-imports/my%20vm.ovf");
        assert_eq!(path, "/bucket/vm-imports/my%20vm.ovf");
    }

    #[test]
    fn uri_encode_keeps_unreserved() {
        assert_eq!(uri_encode("abcABC123-_.~"), "abcABC123-_.~");
        assert_eq!(uri_encode("a b/c=d"), "a%20b%2Fc%3Dd");
    }
}
