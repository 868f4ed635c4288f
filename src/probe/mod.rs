//! Probe module for availability checks.
//!
//! Supports Ping and HTTP probes.

mod http;
mod ping;

pub use http::*;
pub use ping::*;

use crate::config::Target;
use crate::history::{Sample, Status};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("command failed: {0}")]
    Command(String),
}

impl ProbeError {
    /// Whether the error says something about the target rather than the prober.
    ///
    /// Timeouts and network failures mean the target is down; a probe that
    /// could not run at all tells us nothing.
    pub fn is_outage(&self) -> bool {
        matches!(self, ProbeError::Timeout(_) | ProbeError::Network(_))
    }
}

/// Kind of availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Ping,
    Http,
}

impl FromStr for ProbeKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ping" => Ok(ProbeKind::Ping),
            "http" => Ok(ProbeKind::Http),
            other => Err(ProbeError::Config(format!("unknown probe type: {}", other))),
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Ping => f.write_str("ping"),
            ProbeKind::Http => f.write_str("http"),
        }
    }
}

/// Probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub kind: ProbeKind,
    pub address: String,
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(kind: ProbeKind, address: &str, timeout: Duration) -> Self {
        Self {
            kind,
            address: address.to_string(),
            timeout,
        }
    }
}

/// Run a probe with the given configuration.
///
/// Returns latency in nanoseconds on success.
pub async fn run_probe(config: &ProbeConfig) -> Result<f64, ProbeError> {
    // Spread probes out so targets on one host aren't hit at the same instant
    let jitter = rand::random::<u64>() % 100;
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    match config.kind {
        ProbeKind::Http => run_http_probe(&config.address, config.timeout).await,
        ProbeKind::Ping => run_ping_probe(&config.address, config.timeout).await,
    }
}

/// Probe a target and turn the outcome into a sample.
///
/// Returns `None` when the probe itself failed, so that the cycle records
/// nothing for the target instead of a false outage.
pub async fn check_target(target: &Target, timeout: Duration) -> Option<Sample> {
    let config = ProbeConfig::new(target.kind, &target.address, timeout);

    let status = match run_probe(&config).await {
        Ok(latency) => {
            tracing::debug!(
                "Probe {} ({} {}): up in {:.3} ms",
                target.name,
                target.kind,
                target.address,
                latency / 1_000_000.0
            );
            Status::Available
        }
        Err(e) if e.is_outage() => {
            tracing::info!("Probe {} ({} {}): down: {}", target.name, target.kind, target.address, e);
            Status::Unavailable
        }
        Err(e) => {
            tracing::error!("Probe failed for {}: {}", target.name, e);
            return None;
        }
    };

    Some(Sample::new(target.name.clone(), status))
}
