pub use anyhow::bail;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvsError {
    Config(String),
    Validation(String),
    Io(#[from] std::io::Error),
    NotFound(String),
    Serialization(String),
    Internal(String),
    Other(#[from] anyhow::Error),
}

impl Display for EvsError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            EvsError::Config(s) => write!(f, "Configuration error: {}", s),
            EvsError::Validation(s) => write!(f, "Validation error: {}", s),
            EvsError::Io(e) => write!(f, "I/O error: {}", e),
            EvsError::NotFound(s) => write!(f, "Not found: {}", s),
            EvsError::Serialization(s) => write!(f, "Serialization error: {}", s),
            EvsError::Internal(s) => write!(f, "Internal error: {}", s),
            EvsError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl From<serde_yaml_ng::Error> for EvsError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        EvsError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for EvsError {
    fn from(err: serde_json::Error) -> Self {
        EvsError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EvsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_is_prefixed() {
        let err = EvsError::Config("missing vcenter_server".into());
        assert_eq!(err.to_string(), "Configuration error: missing vcenter_server");
    }

    #[test]
    fn yaml_errors_map_to_serialization() {
        let parse: std::result::Result<serde_yaml_ng::Value, _> = serde_yaml_ng::from_str("a: [");
        let err: EvsError = parse.unwrap_err().into();
        assert!(matches!(err, EvsError::Serialization(_)));
    }
}
