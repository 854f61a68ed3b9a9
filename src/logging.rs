use crate::config::{LogFormat, LogLevel, LoggingConfig};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::io::Write;

/// Initialize the process-wide logger from configuration. Built on
/// env_logger so `RUST_LOG` still wins over the configured level; the JSON
/// format emits one structured object per line for log shippers.
pub fn init(config: Option<&LoggingConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let level = config
        .and_then(|c| c.level.clone())
        .unwrap_or_default();
    let format = config
        .and_then(|c| c.format.clone())
        .unwrap_or_default();

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.to_string()),
    );

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let timestamp: DateTime<Utc> = Utc::now();
                let entry = json!({
                    "timestamp": timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                    "level": record.level().to_string().to_lowercase(),
                    "target": record.target(),
                    "message": record.args().to_string(),
                });
                writeln!(buf, "{}", entry)
            });
        }
        LogFormat::Text => {
            builder.format(|buf, record| {
                let timestamp: DateTime<Utc> = Utc::now();
                writeln!(
                    buf,
                    "{} [{}] [{}] {}",
                    timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level().to_string().to_uppercase(),
                    record.target(),
                    record.args()
                )
            });
        }
    }

    builder.try_init()?;
    Ok(())
}

pub fn parse_log_level(s: &str) -> Result<LogLevel, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "trace" => Ok(LogLevel::Trace),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        _ => Err(format!(
            "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
            s
        )
        .into()),
    }
}

pub fn parse_log_format(s: &str) -> Result<LogFormat, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(format!("Invalid log format: {}. Must be one of: text, json", s).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("DEBUG"), Ok(LogLevel::Debug)));
        assert!(matches!(parse_log_level("warn"), Ok(LogLevel::Warn)));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_parse_log_format() {
        assert!(matches!(parse_log_format("json"), Ok(LogFormat::Json)));
        assert!(matches!(parse_log_format("Text"), Ok(LogFormat::Text)));
        assert!(parse_log_format("xml").is_err());
    }
}
