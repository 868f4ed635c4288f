//! UpTrail - availability history for a set of monitored targets.
//!
//! Each cycle probes every target, records one sample per target on the
//! current 5-minute slot, and normalizes the stored history into gap-filled
//! fine-grained samples plus hourly and daily uptime summaries.

pub mod config;
pub mod history;
pub mod probe;
pub mod scheduler;
pub mod store;
pub mod web;
