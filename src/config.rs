use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub report_format: ReportFormat,
    pub vehicle_count: usize,
    pub passenger_count: usize,
    pub grid_max: i32,
    pub seed: Option<u64>,
    pub time_unit_ms: u64,
    pub mailbox_size: usize,
    pub average_speed: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_log_format(env::var("LOG_FORMAT").ok().as_deref())?,
            report_format: parse_report_format(env::var("REPORT_FORMAT").ok().as_deref())?,
            vehicle_count: parse_or_default("VEHICLE_COUNT", 3)?,
            passenger_count: parse_or_default("PASSENGER_COUNT", 3)?,
            grid_max: parse_or_default("GRID_MAX", 100)?,
            seed: parse_optional("SEED")?,
            time_unit_ms: parse_or_default("TIME_UNIT_MS", 1000)?,
            mailbox_size: parse_or_default("MAILBOX_SIZE", 64)?,
            average_speed: parse_or_default("AVERAGE_SPEED", crate::geo::AVERAGE_SPEED)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.grid_max < 0 {
            return Err(AppError::Config("GRID_MAX must not be negative".to_string()));
        }
        if self.time_unit_ms == 0 {
            return Err(AppError::Config("TIME_UNIT_MS must be positive".to_string()));
        }
        if self.mailbox_size == 0 {
            return Err(AppError::Config("MAILBOX_SIZE must be positive".to_string()));
        }
        if !(self.average_speed.is_finite() && self.average_speed > 0.0) {
            return Err(AppError::Config(
                "AVERAGE_SPEED must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn parse_log_format(raw: Option<&str>) -> Result<LogFormat, AppError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("compact") => Ok(LogFormat::Compact),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(AppError::Config(format!("invalid LOG_FORMAT: {other}"))),
    }
}

fn parse_report_format(raw: Option<&str>) -> Result<ReportFormat, AppError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("text") => Ok(ReportFormat::Text),
        Some("json") => Ok(ReportFormat::Json),
        Some(other) => Err(AppError::Config(format!("invalid REPORT_FORMAT: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_log_format, parse_report_format, LogFormat, ReportFormat};

    #[test]
    fn formats_default_when_unset() {
        assert_eq!(parse_log_format(None).unwrap(), LogFormat::Compact);
        assert_eq!(parse_report_format(None).unwrap(), ReportFormat::Text);
    }

    #[test]
    fn formats_are_case_insensitive() {
        assert_eq!(parse_log_format(Some("JSON")).unwrap(), LogFormat::Json);
        assert_eq!(parse_report_format(Some("Json")).unwrap(), ReportFormat::Json);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(parse_log_format(Some("pretty")).is_err());
        assert!(parse_report_format(Some("table")).is_err());
    }
}
