//! Configuration module for UpTrail.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::history::RetentionPolicies;
use crate::probe::ProbeKind;

use chrono::Duration as ChronoDuration;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid target {entry:?}: {reason}")]
    InvalidTarget { entry: String, reason: String },
    #[error("invalid retention: {0}")]
    InvalidRetention(String),
}

/// A monitored target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub kind: ProbeKind,
    pub address: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the read-only web surface; 0 disables it (default: 8080)
    pub http_port: u16,
    /// Path to the history file (default: "data.json")
    pub data_path: String,
    /// Targets to probe each cycle (default: none)
    pub targets: Vec<Target>,
    /// Per-probe timeout (default: 5s)
    pub probe_timeout: Duration,
    /// Run a single cycle and exit, for cron-driven deployments
    pub run_once: bool,
    pub retention: RetentionPolicies,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            data_path: "data.json".to_string(),
            targets: Vec::new(),
            probe_timeout: Duration::from_secs(5),
            run_once: false,
            retention: RetentionPolicies::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPTRAIL_HTTP_PORT`: HTTP port (default: 8080, 0 disables)
    /// - `UPTRAIL_DATA_PATH`: history file path (default: "data.json")
    /// - `UPTRAIL_TARGETS`: comma-separated `Name=kind:address` entries
    /// - `UPTRAIL_PROBE_TIMEOUT_SECS`: probe timeout (default: 5)
    /// - `UPTRAIL_RUN_ONCE`: `1` or `true` to run one cycle and exit
    /// - `UPTRAIL_HOURLY_RETENTION_HOURS`: hourly summary retention (default: 25)
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Unparseable numbers keep their defaults.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("UPTRAIL_HTTP_PORT").and_then(|v| v.parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(data_path) = lookup("UPTRAIL_DATA_PATH") {
            cfg.data_path = data_path;
        }

        if let Some(targets) = lookup("UPTRAIL_TARGETS") {
            cfg.targets = parse_targets(&targets)?;
        }

        if let Some(secs) = lookup("UPTRAIL_PROBE_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            if secs > 0 {
                cfg.probe_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(run_once) = lookup("UPTRAIL_RUN_ONCE") {
            cfg.run_once = matches!(run_once.trim(), "1" | "true" | "yes");
        }

        if let Some(hours) = lookup("UPTRAIL_HOURLY_RETENTION_HOURS").and_then(|v| v.parse::<i64>().ok()) {
            cfg.retention.hourly = ChronoDuration::try_hours(hours).ok_or_else(|| {
                ConfigError::InvalidRetention(format!("{} hours is out of range", hours))
            })?;
        }

        cfg.retention.validate().map_err(ConfigError::InvalidRetention)?;
        Ok(cfg)
    }
}

/// Parse `Name=kind:address` entries separated by commas.
///
/// Blank entries are skipped; the first `=` splits the name and the first
/// `:` after it splits the kind, so addresses may carry ports or URLs.
pub fn parse_targets(entries: &str) -> Result<Vec<Target>, ConfigError> {
    let mut targets: Vec<Target> = Vec::new();

    for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = |reason: &str| ConfigError::InvalidTarget {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (name, probe) = entry.split_once('=').ok_or_else(|| invalid("expected Name=kind:address"))?;
        let (kind, address) = probe.split_once(':').ok_or_else(|| invalid("expected kind:address"))?;
        let (name, address) = (name.trim(), address.trim());

        if name.is_empty() || address.is_empty() {
            return Err(invalid("name and address must not be empty"));
        }
        if targets.iter().any(|t| t.name == name) {
            return Err(invalid("duplicate target name"));
        }

        let kind = kind.trim().parse::<ProbeKind>().map_err(|e| invalid(&e.to_string()))?;
        targets.push(Target {
            name: name.to_string(),
            kind,
            address: address.to_string(),
        });
    }

    Ok(targets)
}
