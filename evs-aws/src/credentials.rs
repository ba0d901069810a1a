//! Static AWS credentials from the environment or the shared credentials file.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AwsError, AwsResult};

#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(access_key_id: &str, secret_access_key: &str, session_token: Option<&str>) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: session_token.map(str::to_string),
        }
    }

    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`.
    pub fn from_environment() -> Option<Self> {
        let access_key_id = env::var("AWS_ACCESS_KEY_ID").ok().filter(|v| !v.is_empty())?;
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
            .ok()
            .filter(|v| !v.is_empty())?;
        let session_token = env::var("AWS_SESSION_TOKEN").ok().filter(|v| !v.is_empty());
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }

    /// Read `[profile]` from an INI-style shared credentials file.
    pub fn from_profile_file(path: &Path, profile: &str) -> AwsResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AwsError::credentials(format!(
                "Cannot read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        parse_profile(&contents, profile).ok_or_else(|| {
            AwsError::credentials(format!(
                "Profile '{}' not found or incomplete in {}",
                profile,
                path.display()
            ))
        })
    }

    /// Resolve credentials the way the AWS CLI does for static keys.
    ///
    /// An explicit profile always reads the shared credentials file.
    /// Otherwise environment keys win, then the `default` profile.
    pub fn resolve(profile: Option<&str>) -> AwsResult<Self> {
        if let Some(profile) = profile {
            return Self::from_profile_file(&shared_credentials_path()?, profile);
        }
        if let Some(creds) = Self::from_environment() {
            return Ok(creds);
        }
        let path = shared_credentials_path()?;
        if path.is_file() {
            return Self::from_profile_file(&path, "default");
        }
        Err(AwsError::credentials(
            "No AWS credentials found: set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY or configure a profile",
        ))
    }
}

/// `AWS_SHARED_CREDENTIALS_FILE` or `~/.aws/credentials`.
pub fn shared_credentials_path() -> AwsResult<PathBuf> {
    if let Ok(path) = env::var("AWS_SHARED_CREDENTIALS_FILE") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".aws").join("credentials"))
        .ok_or_else(|| AwsError::credentials("Could not find home directory"))
}

fn parse_profile(contents: &str, profile: &str) -> Option<AwsCredentials> {
    let mut in_section = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let name = section.trim();
            let name = name.strip_prefix("profile ").unwrap_or(name).trim();
            in_section = name == profile;
            continue;
        }
        if !in_section {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "aws_access_key_id" => access_key_id = Some(value),
            "aws_secret_access_key" => secret_access_key = Some(value),
            "aws_session_token" => session_token = Some(value),
            _ => {}
        }
    }

    Some(AwsCredentials {
        access_key_id: access_key_id?,
        secret_access_key: secret_access_key?,
        session_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    const FILE: &str = "\
# shared credentials
[default]
aws_access_key_id = AKIADEFAULT
aws_secret_access_key = default-secret

[migration]
aws_access_key_id=AKIAMIGRATION
aws_secret_access_key=migration-secret
aws_session_token = token-123
region = us-west-2

[broken]
aws_access_key_id = AKIAONLY
";

    #[test]
    fn parses_named_profile() {
        let creds = parse_profile(FILE, "migration").unwrap();
        assert_eq!(creds.access_key_id, "AKIAMIGRATION");
        assert_eq!(creds.secret_access_key, "migration-secret");
        assert_eq!(creds.session_token.as_deref(), Some("token-123"));
    }

    #[test]
    fn incomplete_or_missing_profile_is_none() {
        assert!(parse_profile(FILE, "broken").is_none());
        assert!(parse_profile(FILE, "absent").is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = AwsCredentials::new("AKIA", "super-secret", Some("tok"));
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("tok\""));
    }

    #[test]
    #[serial]
    fn explicit_profile_reads_shared_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), FILE).unwrap();
        std::env::set_var("AWS_SHARED_CREDENTIALS_FILE", file.path());
        let result = AwsCredentials::resolve(Some("default"));
        std::env::remove_var("AWS_SHARED_CREDENTIALS_FILE");

        assert_eq!(result.unwrap().access_key_id, "AKIADEFAULT");
    }

    #[test]
    #[serial]
    fn environment_keys_win_without_profile() {
        std::env::set_var("AWS_ACCESS_KEY_ID", "AKIAENV");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "env-secret");
        std::env::remove_var("AWS_SESSION_TOKEN");
        let result = AwsCredentials::resolve(None);
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");

        let creds = result.unwrap();
        assert_eq!(creds.access_key_id, "AKIAENV");
        assert!(creds.session_token.is_none());
    }
}
