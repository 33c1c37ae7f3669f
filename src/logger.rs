use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::RwLock;
use std::time::{Duration, Instant};

static CONSOLE_LOGGER: Lazy<ConsoleLogger> = Lazy::new(ConsoleLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::default())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let filter = config.min_level.to_level_filter();
    CONSOLE_LOGGER.update_config(config);

    log::set_logger(&*CONSOLE_LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    log::set_max_level(filter);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }

    pub fn from_log_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }

    /// Parses `RUST_LOG`-style names, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// One rendered log line. `job_id` is lifted out of a leading `[job <id>]`
/// tag so JSON consumers can group lines per video job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LogLine {
    pub fn new(level: LogLevel, target: &str, message: String) -> Self {
        let job_id = job_tag(&message).map(String::from);
        Self {
            timestamp: Utc::now(),
            level,
            target: target.to_string(),
            message,
            job_id,
            location: None,
        }
    }

    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        self.location = Some(format!("{}:{}", file, line));
        self
    }
}

fn job_tag(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("[job ")?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_target: bool,
    pub show_file_location: bool,
    pub include_timestamp: bool,
    pub timestamp_format: String,
    pub output_json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_target: true,
            show_file_location: false,
            include_timestamp: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level from `LUMINA_LOG` (falls back to `RUST_LOG`), JSON lines when
    /// `LUMINA_LOG_JSON` is set to anything but `0`/`false`.
    pub fn from_env() -> Self {
        let level = std::env::var("LUMINA_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .and_then(|v| LogLevel::parse(&v));
        let json = std::env::var("LUMINA_LOG_JSON")
            .map(|v| !matches!(v.trim(), "" | "0" | "false"))
            .unwrap_or(false);

        let config = if json {
            Self::production()
        } else {
            Self::default()
        };
        match level {
            Some(level) => config.with_level(level),
            None => config,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_colors: true,
            show_file_location: true,
            ..Default::default()
        }
    }
}

/// Writes records to stderr, coloured for terminals or as JSON lines.
pub struct ConsoleLogger {
    config: RwLock<LoggerConfig>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            config: RwLock::new(LoggerConfig::default()),
        }
    }

    pub fn update_config(&self, new_config: LoggerConfig) {
        match self.config.write() {
            Ok(mut config) => *config = new_config,
            Err(poisoned) => *poisoned.into_inner() = new_config,
        }
    }

    fn format_console(&self, line: &LogLine, config: &LoggerConfig) -> String {
        let mut output = String::new();

        if config.include_timestamp {
            let timestamp = line.timestamp.format(&config.timestamp_format).to_string();
            if config.show_colors {
                output.push_str(&format!("{} ", timestamp.bright_black()));
            } else {
                output.push_str(&format!("{} ", timestamp));
            }
        }

        if config.show_colors {
            output.push_str(&format!(
                "[{}] ",
                line.level.as_str().color(line.level.color()).bold()
            ));
        } else {
            output.push_str(&format!("[{}] ", line.level.as_str()));
        }

        if config.show_target && !line.target.is_empty() {
            if config.show_colors {
                output.push_str(&format!("{}: ", line.target.bright_blue()));
            } else {
                output.push_str(&format!("{}: ", line.target));
            }
        }

        output.push_str(&line.message);

        if let Some(location) = &line.location {
            if config.show_colors {
                output.push_str(&format!(" ({})", location.bright_black()));
            } else {
                output.push_str(&format!(" ({})", location));
            }
        }

        output
    }

    fn render(&self, record: &Record, config: &LoggerConfig) -> String {
        let mut line = LogLine::new(
            LogLevel::from_log_level(record.level()),
            record.target(),
            record.args().to_string(),
        );
        if config.show_file_location {
            if let (Some(file), Some(no)) = (record.file(), record.line()) {
                line = line.with_location(file, no);
            }
        }

        if config.output_json {
            serde_json::to_string(&line).unwrap_or_default()
        } else {
            self.format_console(&line, config)
        }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.read() {
            Ok(config) => LogLevel::from_log_level(metadata.level()) >= config.min_level,
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(config) = self.config.read() {
            let rendered = self.render(record, &config);
            let _ = writeln!(io::stderr().lock(), "{}", rendered);
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Logs how long a scope took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "Timer '{}' completed in {:.2}s",
            self.name,
            self.elapsed().as_secs_f64()
        );
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering_matches_severity() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Info > LogLevel::Debug);
        assert_eq!(LogLevel::from_log_level(Level::Warn), LogLevel::Warn);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_job_tag_extracted() {
        let line = LogLine::new(LogLevel::Info, "lumina", "[job abc-123] submitted".into());
        assert_eq!(line.job_id.as_deref(), Some("abc-123"));

        let line = LogLine::new(LogLevel::Info, "lumina", "plain message".into());
        assert!(line.job_id.is_none());
    }

    #[test]
    fn test_json_line_shape() {
        let line = LogLine::new(LogLevel::Warn, "lumina::gemini", "[job j1] slow".into())
            .with_location("src/gemini/poller.rs", 42);
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["job_id"], "j1");
        assert_eq!(value["location"], "src/gemini/poller.rs:42");
    }

    #[test]
    fn test_plain_console_format() {
        let logger = ConsoleLogger::new();
        let config = LoggerConfig::new()
            .with_colors(false)
            .with_level(LogLevel::Debug);
        let config = LoggerConfig {
            include_timestamp: false,
            ..config
        };
        let line = LogLine::new(LogLevel::Info, "lumina", "hello".into());
        assert_eq!(logger.format_console(&line, &config), "[INFO] lumina: hello");
    }

    #[test]
    fn test_presets() {
        assert!(LoggerConfig::production().output_json);
        assert!(!LoggerConfig::production().show_colors);
        assert_eq!(LoggerConfig::development().min_level, LogLevel::Debug);
    }
}
