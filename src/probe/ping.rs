//! Ping probe using the system `ping` command.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::process::Command;

use super::ProbeError;

/// Run a ping probe against the given address.
///
/// Returns latency in nanoseconds, taken from the command's output when it
/// reports one and from wall-clock time otherwise.
pub async fn run_ping_probe(address: &str, timeout: Duration) -> Result<f64, ProbeError> {
    let timeout_secs = timeout.as_secs().max(1);
    let start = Instant::now();

    let output = Command::new("ping")
        .args(["-c", "1", "-W", &timeout_secs.to_string(), address])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProbeError::Command(format!("failed to execute ping: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("timeout")
            || stdout.contains("100% packet loss")
            || stdout.contains("100.0% packet loss")
        {
            return Err(ProbeError::Timeout(timeout));
        }
        let reason = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
        return Err(ProbeError::Network(format!("ping {} failed: {}", address, reason)));
    }

    Ok(parse_ping_output(&stdout).unwrap_or_else(|| start.elapsed().as_nanos() as f64))
}

/// Parse ping command output for latency in nanoseconds.
fn parse_ping_output(output: &str) -> Option<f64> {
    // Per-packet response "time=X.XXX ms" (Linux, macOS)
    static PER_PACKET: OnceLock<Option<Regex>> = OnceLock::new();
    // Summary line "rtt min/avg/max/mdev = ..." (Linux) or "round-trip min/avg/max/stddev = ..." (macOS)
    static SUMMARY: OnceLock<Option<Regex>> = OnceLock::new();

    let per_packet = PER_PACKET
        .get_or_init(|| Regex::new(r"time[=<](?P<val>[0-9.]+)\s*ms").ok())
        .as_ref()?;
    if let Some(ms) = per_packet
        .captures(output)
        .and_then(|caps| caps.name("val"))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return Some(ms * 1_000_000.0);
    }

    let summary = SUMMARY
        .get_or_init(|| {
            Regex::new(r"(?:rtt|round-trip)\s+min/avg/max/(?:mdev|stddev)\s*=\s*([0-9.]+)/([0-9.]+)/([0-9.]+)").ok()
        })
        .as_ref()?;
    summary
        .captures(output)
        .and_then(|caps| caps.get(2))
        .and_then(|avg| avg.as_str().parse::<f64>().ok())
        .map(|ms| ms * 1_000_000.0)
}
