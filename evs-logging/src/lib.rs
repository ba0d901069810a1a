use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
};
use thiserror::Error;
use tracing_subscriber::{fmt::MakeWriter, prelude::*, registry, EnvFilter};

mod handle;
mod path;

pub use handle::Logger;
pub use path::{sanitize_log_path, DEFAULT_LOG_DIR};
pub use tracing_appender::non_blocking::WorkerGuard;

#[derive(Error, Debug)]
pub enum LogSetupError {
    #[error("Invalid log file name '{0}': no usable characters remain after sanitizing")]
    InvalidName(String),

    #[error("Log file '{0}' resolves outside the logs directory")]
    OutsideLogDir(PathBuf),

    #[error("Failed to prepare log directory: {0}")]
    Io(#[from] io::Error),
}

// --- Custom "Tee" Writer ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Write for Tee<A, B>
where
    A: Write,
    B: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B, W1, W2> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a, Writer = W1>,
    B: MakeWriter<'a, Writer = W2>,
    W1: Write + 'a,
    W2: Write + 'a,
{
    type Writer = Tee<W1, W2>;
    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    Off,
}

/// Subscriber settings, seeded from `LOG_*` environment variables and
/// refined by command-line flags.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Requested log file name; sanitized before use.
    pub file: Option<String>,
    pub log_dir: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
            output: LogOutput::Console,
            file: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl LogSettings {
    /// Reads `LOG_LEVEL`, `LOG_FORMAT` (human|json), `LOG_OUTPUT`
    /// (console|file|both|off) and `LOG_FILE`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(level) = env::var("LOG_LEVEL") {
            settings.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            settings.format = match format.as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Human,
            };
        }
        if let Ok(output) = env::var("LOG_OUTPUT") {
            settings.output = match output.as_str() {
                "file" => LogOutput::File,
                "both" => LogOutput::Both,
                "off" | "none" => LogOutput::Off,
                _ => LogOutput::Console,
            };
        }
        if let Ok(file) = env::var("LOG_FILE") {
            settings = settings.with_log_file(file);
        }
        settings
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Adds file output next to whatever console output is configured.
    pub fn with_log_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        if self.output == LogOutput::Console {
            self.output = LogOutput::Both;
        }
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }
}

/// Initializes the global tracing subscriber.
///
/// Returns the appender guard when file output is active; keep it alive for
/// the lifetime of the process so buffered lines are flushed on exit.
pub fn init_subscriber(settings: &LogSettings) -> Result<Option<WorkerGuard>, LogSetupError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level))
        .add_directive("reqwest=warn".parse().expect("static directive"))
        .add_directive("rustls=warn".parse().expect("static directive"));

    let use_console = matches!(settings.output, LogOutput::Console | LogOutput::Both);
    let use_file = matches!(settings.output, LogOutput::File | LogOutput::Both);
    let is_json = settings.format == LogFormat::Json;

    let subscriber = registry().with(env_filter);
    let mut guard: Option<WorkerGuard> = None;

    let file_writer = if use_file {
        let requested = settings.file.as_deref().unwrap_or("vcf-evs.log");
        fs::create_dir_all(&settings.log_dir)?;
        let log_path = sanitize_log_path(requested, &settings.log_dir)?;
        let file_name = log_path
            .file_name()
            .ok_or_else(|| LogSetupError::InvalidName(requested.to_string()))?;
        let appender = tracing_appender::rolling::never(&settings.log_dir, file_name);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        Some(non_blocking)
    } else {
        None
    };

    match (use_console, file_writer) {
        (true, Some(file)) => {
            let tee_writer = MakeTee {
                make_a: std::io::stderr,
                make_b: file,
            };
            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(tee_writer);
            if is_json {
                subscriber.with(fmt_layer.json()).init();
            } else {
                subscriber.with(fmt_layer.pretty()).init();
            }
        }
        (true, None) => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if is_json {
                subscriber.with(fmt_layer.json()).init();
            } else {
                subscriber.with(fmt_layer.pretty()).init();
            }
        }
        (false, Some(file)) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false);
            if is_json {
                subscriber.with(fmt_layer.json()).init();
            } else {
                subscriber.with(fmt_layer).init();
            }
        }
        (false, None) => subscriber.init(),
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_log_env() {
        for key in ["LOG_LEVEL", "LOG_FORMAT", "LOG_OUTPUT", "LOG_FILE"] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_to_human_console_info() {
        clear_log_env();
        let settings = LogSettings::from_env();
        assert_eq!(settings.level, "info");
        assert_eq!(settings.format, LogFormat::Human);
        assert_eq!(settings.output, LogOutput::Console);
        assert!(settings.file.is_none());
    }

    #[test]
    #[serial]
    fn env_selects_json_file_output() {
        clear_log_env();
        env::set_var("LOG_FORMAT", "json");
        env::set_var("LOG_OUTPUT", "file");
        env::set_var("LOG_LEVEL", "debug");
        let settings = LogSettings::from_env();
        clear_log_env();

        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.output, LogOutput::File);
        assert_eq!(settings.level, "debug");
    }

    #[test]
    fn log_file_flag_adds_file_output() {
        let settings = LogSettings::default().with_log_file("migration.log");
        assert_eq!(settings.output, LogOutput::Both);
        assert_eq!(settings.file.as_deref(), Some("migration.log"));

        let file_only = LogSettings {
            output: LogOutput::File,
            ..LogSettings::default()
        }
        .with_log_file("x.log");
        assert_eq!(file_only.output, LogOutput::File);
    }

    #[test]
    fn log_dir_defaults_to_logs() {
        assert_eq!(LogSettings::default().log_dir, PathBuf::from(DEFAULT_LOG_DIR));
        let custom = LogSettings::default().with_log_dir("/var/log/vcf-evs");
        assert_eq!(custom.log_dir, PathBuf::from("/var/log/vcf-evs"));
    }
}
