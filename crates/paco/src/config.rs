//! Process-wide fetch defaults.
//!
//! Built once, then shared read-only (usually behind an `Arc`) by every
//! fetch of every test. Environment variables override the built-in
//! defaults; a value that does not parse leaves the default in place.

use std::path::PathBuf;

use crate::spec::{Protocol, ProxySpec};

/// Default referrer sent when a declaration names none.
const DEFAULT_REFERRER: &str = "https://www.google.com";

/// Default per-attempt timeout.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default number of retries after a timed-out attempt.
const DEFAULT_RETRIES_ON_TIMEOUT: u32 = 2;

/// Default root for stored page bodies.
const DEFAULT_OUTPUT_DIR: &str = "target/paco";

/// Resolved configuration consumed as defaults by every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub referrer: String,
    pub timeout_ms: u64,
    pub retries_on_timeout: u32,
    pub protocol: Protocol,
    pub url_prefix: String,
    pub port: String,
    /// Replaces the desktop profile's user agent for declarations that
    /// name no device.
    pub user_agent: Option<String>,
    pub proxy: Option<ProxySpec>,
    /// Accept any response content type instead of only text, HTML, XML
    /// and JSON.
    pub ignore_content_type: bool,
    /// Root directory for stored and diagnostic page bodies.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            referrer: DEFAULT_REFERRER.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries_on_timeout: DEFAULT_RETRIES_ON_TIMEOUT,
            protocol: Protocol::Http,
            url_prefix: String::new(),
            port: String::new(),
            user_agent: None,
            proxy: None,
            ignore_content_type: false,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    /// Defaults overridden by `PACO_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string());
        let defaults = Self::default();

        let proxy = match (read("PACO_PROXY_HOST"), read("PACO_PROXY_PORT")) {
            (Some(host), Some(port)) if !host.is_empty() => {
                port.parse::<u16>().ok().map(|port| ProxySpec { host, port })
            }
            _ => None,
        };

        Self {
            referrer: read("PACO_REFERRER").unwrap_or(defaults.referrer),
            timeout_ms: read("PACO_TIMEOUT_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.timeout_ms),
            retries_on_timeout: parse_or(
                read("PACO_TIMEOUT_RETRIES"),
                defaults.retries_on_timeout,
            ),
            protocol: parse_or(read("PACO_PROTOCOL"), defaults.protocol),
            url_prefix: read("PACO_URL_PREFIX").unwrap_or(defaults.url_prefix),
            port: read("PACO_PORT").unwrap_or(defaults.port),
            user_agent: read("PACO_USER_AGENT").filter(|ua| !ua.is_empty()),
            proxy,
            ignore_content_type: parse_or(
                read("PACO_IGNORE_CONTENT_TYPE"),
                defaults.ignore_content_type,
            ),
            output_dir: read("PACO_OUTPUT_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default_value: T) -> T {
    value
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default_value)
}
