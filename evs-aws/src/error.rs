//! Error model shared by every AWS binding in this crate.
//!
//! Service faults keep the code and message AWS returned so they can be
//! propagated to the caller unchanged. Local conditions (missing
//! credentials, a failed import task, an expired wait) get their own kinds.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwsErrorKind {
    /// The service answered with an error document.
    Service,
    /// The request never produced an HTTP response.
    Transport,
    /// No usable credentials were found.
    Credentials,
    /// The request was rejected locally before being sent.
    Validation,
    /// The addressed resource does not exist.
    NotFound,
    /// A remote task reached a failed or cancelled terminal state.
    TaskFailed,
    Timeout,
    Cancelled,
    /// The response body could not be decoded.
    Parse,
}

#[derive(Error, Debug, Clone)]
#[error("AWS {service} error [{code}]: {message}")]
pub struct AwsError {
    pub kind: AwsErrorKind,
    /// AWS error code (e.g. `ValidationException`) or a local code.
    pub code: String,
    pub message: String,
    /// HTTP status, when a response was received.
    pub status_code: Option<u16>,
    pub service: String,
    pub request_id: Option<String>,
}

pub type AwsResult<T> = std::result::Result<T, AwsError>;

impl AwsError {
    pub fn new(kind: AwsErrorKind, service: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.to_string(),
            message: message.into(),
            status_code: None,
            service: service.to_string(),
            request_id: None,
        }
    }

    /// Service fault decoded from an HTTP error response.
    pub fn service(service: &str, status: u16, code: &str, message: impl Into<String>) -> Self {
        let kind = if status == 404 || code.contains("NotFound") {
            AwsErrorKind::NotFound
        } else {
            AwsErrorKind::Service
        };
        Self {
            status_code: Some(status),
            ..Self::new(kind, service, code, message)
        }
    }

    pub fn validation(service: &str, message: impl Into<String>) -> Self {
        Self::new(AwsErrorKind::Validation, service, "ValidationError", message)
    }

    pub fn credentials(message: impl Into<String>) -> Self {
        Self::new(AwsErrorKind::Credentials, "sts", "CredentialError", message)
    }

    pub fn not_found(service: &str, message: impl Into<String>) -> Self {
        Self::new(AwsErrorKind::NotFound, service, "ResourceNotFoundException", message)
    }

    pub fn parse(service: &str, message: impl Into<String>) -> Self {
        Self::new(AwsErrorKind::Parse, service, "ParseError", message)
    }

    pub fn task_failed(service: &str, message: impl Into<String>) -> Self {
        Self::new(AwsErrorKind::TaskFailed, service, "TaskFailed", message)
    }

    pub fn timeout(service: &str, message: impl Into<String>) -> Self {
        Self::new(AwsErrorKind::Timeout, service, "Timeout", message)
    }

    pub fn cancelled(service: &str, message: impl Into<String>) -> Self {
        Self::new(AwsErrorKind::Cancelled, service, "Cancelled", message)
    }

    pub fn with_request_id(mut self, id: Option<String>) -> Self {
        self.request_id = id;
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == AwsErrorKind::NotFound
    }

    /// Parse an AWS Query/REST XML error body.
    ///
    /// ```xml
    /// <Response><Errors><Error>
    ///   <Code>InvalidParameterValue</Code><Message>...</Message>
    /// </Error></Errors><RequestID>abc</RequestID></Response>
    /// ```
    pub fn from_xml_body(service: &str, status: u16, body: &str) -> Self {
        let code = xml_tag(body, "Code").unwrap_or_else(|| "UnknownError".to_string());
        let message = xml_tag(body, "Message")
            .unwrap_or_else(|| format!("HTTP {} from {}", status, service));
        let request_id = xml_tag(body, "RequestId").or_else(|| xml_tag(body, "RequestID"));
        Self::service(service, status, &code, message).with_request_id(request_id)
    }

    /// Parse an AWS JSON protocol error body.
    ///
    /// The `__type` field may carry a namespace prefix
    /// (`com.amazonaws.evs#ResourceNotFoundException`); only the shape name
    /// after `#` is kept.
    pub fn from_json_body(service: &str, status: u16, body: &str) -> Self {
        let parsed: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
        let code = parsed
            .get("__type")
            .or_else(|| parsed.get("code"))
            .and_then(|v| v.as_str())
            .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
            .unwrap_or_else(|| format!("HTTP{}", status));
        let message = parsed
            .get("message")
            .or_else(|| parsed.get("Message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {} from {}", status, service));
        Self::service(service, status, &code, message)
    }
}

impl From<reqwest::Error> for AwsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout("http", format!("HTTP timeout: {e}"))
        } else {
            Self::new(AwsErrorKind::Transport, "http", "TransportError", e.to_string())
        }
    }
}

/// Text of the first `<tag>...</tag>` in `xml`, if any.
pub(crate) fn xml_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}
