use std::env;
use std::net::SocketAddr;

use chrono::NaiveTime;

use crate::error::AppError;
use crate::vle::VleConfig;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://programmes.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_SYNC_TIMES: &str = "22:00,06:00";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub vle: VleConfig,
    /// Local times of day at which the full sync runs.
    pub sync_times: Vec<NaiveTime>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let sync_times = parse_sync_times(
            &env::var("SYNC_TIMES").unwrap_or_else(|_| DEFAULT_SYNC_TIMES.to_string()),
        )?;

        Ok(Self {
            database_url,
            bind_addr,
            vle: VleConfig::new_from_env()?,
            sync_times,
        })
    }
}

/// Parses a comma separated list of `HH:MM` times, sorted and deduplicated.
pub fn parse_sync_times(raw: &str) -> Result<Vec<NaiveTime>, AppError> {
    let mut times = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .map_err(|_| AppError::Config(format!("SYNC_TIMES entry '{}' is not HH:MM", s)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if times.is_empty() {
        return Err(AppError::Config("SYNC_TIMES is empty".to_string()));
    }

    times.sort();
    times.dedup();
    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_times_sorts() {
        let times = parse_sync_times("22:00, 06:00,22:00").expect("Failed to parse");
        assert_eq!(
            times,
            vec![
                NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_sync_times_rejects_garbage() {
        assert!(matches!(parse_sync_times("noon"), Err(AppError::Config(_))));
        assert!(matches!(parse_sync_times(" , "), Err(AppError::Config(_))));
    }
}
