//! Environment-driven dashboard configuration.
//!
//! # Design
//! - `from_lookup` is pure so tests never touch process environment.
//! - Every invalid value fails with `AppError::InvalidConfig` naming the field.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use storewatch_telemetry::LogFormat;

use crate::error::{AppError, AppResult};

/// Status service base URL.
pub const ENV_STATUS_URL: &str = "STOREWATCH_STATUS_URL";
/// Listener address.
pub const ENV_BIND_ADDR: &str = "STOREWATCH_BIND_ADDR";
/// Listener port.
pub const ENV_HTTP_PORT: &str = "STOREWATCH_HTTP_PORT";
/// Page refresh period in seconds.
pub const ENV_REFRESH_SECS: &str = "STOREWATCH_REFRESH_SECS";
/// Chart query window in seconds.
pub const ENV_QUERY_WINDOW_SECS: &str = "STOREWATCH_QUERY_WINDOW_SECS";
/// Status request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "STOREWATCH_REQUEST_TIMEOUT_SECS";
/// Idle time before the mounted page is unloaded; `0` disables.
pub const ENV_IDLE_UNMOUNT_SECS: &str = "STOREWATCH_IDLE_UNMOUNT_SECS";
/// Log output format, `json` or `pretty`.
pub const ENV_LOG_FORMAT: &str = "STOREWATCH_LOG_FORMAT";

const DEFAULT_STATUS_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_HTTP_PORT: u16 = 7070;

/// Resolved dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Base URL of the status service.
    pub status_url: String,
    /// Address the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the HTTP listener binds to.
    pub http_port: u16,
    /// Period of the page refresh timer.
    pub refresh_interval: Duration,
    /// Trailing window covered by chart queries.
    pub query_window: Duration,
    /// Per-request timeout for the status client.
    pub request_timeout: Duration,
    /// Idle time before the mounted page is unloaded.
    pub idle_unmount: Option<Duration>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            status_url: DEFAULT_STATUS_URL.to_string(),
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: DEFAULT_HTTP_PORT,
            refresh_interval: Duration::from_secs(10),
            query_window: Duration::from_secs(600),
            request_timeout: Duration::from_secs(5),
            idle_unmount: Some(Duration::from_secs(300)),
            log_format: LogFormat::infer(),
        }
    }
}

impl DashboardConfig {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidConfig` when a variable is set to an invalid value.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidConfig` when a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let defaults = Self::default();
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let status_url = value(ENV_STATUS_URL).unwrap_or(defaults.status_url);
        if !(status_url.starts_with("http://") || status_url.starts_with("https://")) {
            return Err(AppError::invalid_config(
                "status_url",
                "unsupported_scheme",
                status_url,
            ));
        }

        let bind_addr = parse_or(value(ENV_BIND_ADDR), "bind_addr", defaults.bind_addr)?;
        let http_port = parse_or(value(ENV_HTTP_PORT), "http_port", defaults.http_port)?;
        if http_port == 0 {
            return Err(AppError::invalid_config("http_port", "zero", "0"));
        }

        let refresh_interval = seconds(value(ENV_REFRESH_SECS), "refresh_secs")?
            .unwrap_or(defaults.refresh_interval);
        if refresh_interval.is_zero() {
            return Err(AppError::invalid_config("refresh_secs", "zero", "0"));
        }
        let query_window = seconds(value(ENV_QUERY_WINDOW_SECS), "query_window_secs")?
            .unwrap_or(defaults.query_window);
        if query_window.is_zero() {
            return Err(AppError::invalid_config("query_window_secs", "zero", "0"));
        }
        let request_timeout = seconds(value(ENV_REQUEST_TIMEOUT_SECS), "request_timeout_secs")?
            .unwrap_or(defaults.request_timeout);
        if request_timeout.is_zero() {
            return Err(AppError::invalid_config("request_timeout_secs", "zero", "0"));
        }
        let idle_unmount = match seconds(value(ENV_IDLE_UNMOUNT_SECS), "idle_unmount_secs")? {
            Some(idle) if idle.is_zero() => None,
            Some(idle) => Some(idle),
            None => defaults.idle_unmount,
        };

        let log_format = match value(ENV_LOG_FORMAT) {
            None => defaults.log_format,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "json" | "pretty" => LogFormat::from_name(Some(&raw)),
                _ => return Err(AppError::invalid_config("log_format", "unknown_format", raw)),
            },
        };

        Ok(Self {
            status_url,
            bind_addr,
            http_port,
            refresh_interval,
            query_window,
            request_timeout,
            idle_unmount,
            log_format,
        })
    }

    /// Listener socket address.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, field: &'static str, default: T) -> AppResult<T> {
    raw.map_or(Ok(default), |raw| {
        raw.parse::<T>()
            .map_err(|_| AppError::invalid_config(field, "unparsable", raw))
    })
}

fn seconds(raw: Option<String>, field: &'static str) -> AppResult<Option<Duration>> {
    raw.map(|raw| {
        raw.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::invalid_config(field, "unparsable", raw))
    })
    .transpose()
}
