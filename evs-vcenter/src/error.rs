//! Error type for vCenter operations.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VCenterErrorKind {
    /// Missing or invalid `vmware` configuration.
    Config,
    /// An operation was attempted before `connect`.
    NotConnected,
    /// VM or snapshot does not exist.
    NotFound,
    /// Login rejected or session expired (401).
    Auth,
    /// vCenter unreachable.
    Connection,
    /// HTTP error with status code.
    Api(u16),
    /// Response body could not be decoded.
    Parse,
    /// A vCenter task ended in the error state.
    TaskFailed,
    Timeout,
    Cancelled,
    /// Local filesystem failure, e.g. writing an export.
    Io,
}

impl fmt::Display for VCenterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => f.write_str("configuration"),
            Self::NotConnected => f.write_str("not connected"),
            Self::NotFound => f.write_str("not found"),
            Self::Auth => f.write_str("authentication"),
            Self::Connection => f.write_str("connection"),
            Self::Api(status) => write!(f, "api {}", status),
            Self::Parse => f.write_str("parse"),
            Self::TaskFailed => f.write_str("task failed"),
            Self::Timeout => f.write_str("timeout"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Io => f.write_str("io"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("vCenter {kind} error: {message}")]
pub struct VCenterError {
    pub kind: VCenterErrorKind,
    pub message: String,
}

pub type VCenterResult<T> = std::result::Result<T, VCenterError>;

impl VCenterError {
    pub fn new(kind: VCenterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Config, message)
    }

    pub fn not_connected() -> Self {
        Self::new(
            VCenterErrorKind::NotConnected,
            "Not connected to vCenter; call connect() first",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::NotFound, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Auth, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Connection, message)
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Api(status), message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Parse, message)
    }

    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::TaskFailed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Cancelled, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(VCenterErrorKind::Io, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == VCenterErrorKind::NotFound
    }
}

impl From<reqwest::Error> for VCenterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {}", e))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {}", e))
        } else if e.is_decode() {
            Self::parse(format!("Invalid response body: {}", e))
        } else {
            Self::connection(format!("HTTP error: {}", e))
        }
    }
}

impl From<serde_json::Error> for VCenterError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", e))
    }
}
