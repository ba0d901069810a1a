use std::fs;
use std::path::{Path, PathBuf};

use crate::LogSetupError;

/// Directory all log files are confined to, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Turn a user-supplied log file name into a path inside `log_dir`.
///
/// Only the final path component is kept, reduced to `[A-Za-z0-9._-]`, with
/// leading dots stripped and a `.log` suffix enforced. Inputs with nothing
/// usable left (such as `..` or `/`) are rejected, as is any result that is
/// itself a symlink, dangling or not, or resolves outside `log_dir`.
pub fn sanitize_log_path(input: &str, log_dir: &Path) -> Result<PathBuf, LogSetupError> {
    let base = Path::new(input)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let filtered: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = filtered.trim_start_matches('.');
    if trimmed.is_empty() {
        return Err(LogSetupError::InvalidName(input.to_string()));
    }

    let file_name = if trimmed.ends_with(".log") {
        trimmed.to_string()
    } else {
        format!("{}.log", trimmed)
    };
    let candidate = log_dir.join(&file_name);

    if candidate.parent() != Some(log_dir) {
        return Err(LogSetupError::OutsideLogDir(candidate));
    }

    // The appender opens with create+append, which follows a dangling link.
    if let Ok(meta) = fs::symlink_metadata(&candidate) {
        if meta.file_type().is_symlink() {
            return Err(LogSetupError::OutsideLogDir(candidate));
        }
    }

    if let Ok(dir) = log_dir.canonicalize() {
        if let Ok(resolved) = candidate.canonicalize() {
            if !resolved.starts_with(&dir) {
                return Err(LogSetupError::OutsideLogDir(resolved));
            }
        }
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn logs() -> &'static Path {
        Path::new(DEFAULT_LOG_DIR)
    }

    #[test]
    fn plain_name_gets_log_suffix() {
        let path = sanitize_log_path("migration", logs()).unwrap();
        assert_eq!(path, Path::new("logs/migration.log"));
    }

    #[test]
    fn existing_suffix_is_not_doubled() {
        let path = sanitize_log_path("run-01.log", logs()).unwrap();
        assert_eq!(path, Path::new("logs/run-01.log"));
    }

    #[test]
    fn traversal_is_reduced_to_basename() {
        let path = sanitize_log_path("../../etc/passwd", logs()).unwrap();
        assert_eq!(path, Path::new("logs/passwd.log"));
    }

    #[test]
    fn absolute_path_is_reduced_to_basename() {
        let path = sanitize_log_path("/var/log/evs.log", logs()).unwrap();
        assert_eq!(path, Path::new("logs/evs.log"));
    }

    #[test]
    fn disallowed_characters_are_removed() {
        let path = sanitize_log_path("my log;rm -rf$.txt", logs()).unwrap();
        assert_eq!(path, Path::new("logs/mylogrm-rf.txt.log"));
    }

    #[test]
    fn hidden_names_lose_leading_dots() {
        let path = sanitize_log_path(".bashrc", logs()).unwrap();
        assert_eq!(path, Path::new("logs/bashrc.log"));
    }

    #[test]
    fn windows_style_traversal_stays_inside() {
        let path = sanitize_log_path("..\\..\\secret", logs()).unwrap();
        assert_eq!(path.parent(), Some(logs()));
        assert!(!path.to_string_lossy().contains(".."));
    }

    #[test]
    fn nothing_usable_is_rejected() {
        for input in ["..", "/", "", "...", "$$$"] {
            assert!(
                matches!(
                    sanitize_log_path(input, logs()),
                    Err(LogSetupError::InvalidName(_))
                ),
                "input {:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn output_never_escapes_log_dir() {
        let inputs = [
            "a/../../b",
            "../..",
            "./x",
            "~/.ssh/id_rsa",
            "logs/../../../tmp/evil",
            "C:\\Windows\\system32",
        ];
        for input in inputs {
            if let Ok(path) = sanitize_log_path(input, logs()) {
                assert_eq!(path.parent(), Some(logs()), "input {:?}", input);
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_pointing_outside_is_rejected() {
        let outside = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let log_dir = root.path().join("logs");
        std::fs::create_dir_all(&log_dir).unwrap();
        let target = outside.path().join("stolen.log");
        std::fs::write(&target, "").unwrap();
        std::os::unix::fs::symlink(&target, log_dir.join("trap.log")).unwrap();

        let result = sanitize_log_path("trap.log", &log_dir);
        assert!(matches!(result, Err(LogSetupError::OutsideLogDir(_))));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_rejected_and_nothing_is_created() {
        let outside = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let log_dir = root.path().join("logs");
        std::fs::create_dir_all(&log_dir).unwrap();
        let target = outside.path().join("planted.log");
        std::os::unix::fs::symlink(&target, log_dir.join("trap.log")).unwrap();

        let result = sanitize_log_path("trap.log", &log_dir);
        assert!(matches!(result, Err(LogSetupError::OutsideLogDir(_))));
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_inside_log_dir_is_rejected_too() {
        let root = TempDir::new().unwrap();
        let log_dir = root.path().join("logs");
        std::fs::create_dir_all(&log_dir).unwrap();
        std::fs::write(log_dir.join("real.log"), "").unwrap();
        std::os::unix::fs::symlink(log_dir.join("real.log"), log_dir.join("alias.log")).unwrap();

        let result = sanitize_log_path("alias.log", &log_dir);
        assert!(matches!(result, Err(LogSetupError::OutsideLogDir(_))));
    }

    #[test]
    fn existing_directory_accepts_regular_file() {
        let root = TempDir::new().unwrap();
        let log_dir = root.path().join("logs");
        std::fs::create_dir_all(&log_dir).unwrap();
        std::fs::write(log_dir.join("ok.log"), "").unwrap();

        let path = sanitize_log_path("ok.log", &log_dir).unwrap();
        assert_eq!(path, log_dir.join("ok.log"));
    }
}
