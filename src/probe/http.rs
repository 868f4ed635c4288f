//! HTTP probe implementation.

use std::time::{Duration, Instant};
use super::ProbeError;

/// Run an HTTP probe against the given address.
///
/// Any response below 500 counts as the service being up. Returns latency in
/// nanoseconds.
pub async fn run_http_probe(address: &str, timeout: Duration) -> Result<f64, ProbeError> {
    let url = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProbeError::Config(e.to_string()))?;

    let start = Instant::now();

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(timeout)
            } else if e.is_builder() {
                ProbeError::Config(e.to_string())
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

    let status = response.status();
    if status.is_server_error() {
        return Err(ProbeError::Network(format!("{} answered {}", url, status)));
    }

    Ok(start.elapsed().as_nanos() as f64)
}
