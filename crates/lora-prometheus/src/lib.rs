//! Prometheus metrics backend for the reconciliation daemon.
//!
//! [`PrometheusMetrics`] implements [`lora_core::MetricsBackend`] on top of a
//! private [`Registry`]. Serving `/metrics` is left to the binary:
//!
//! ```rust,ignore
//! let families = metrics.gather();
//! let mut buf = Vec::new();
//! TextEncoder::new().encode(&families, &mut buf)?;
//! ```
//!
//! ## Metrics
//! - `lora_polls_total{signal}` - Counter
//! - `lora_transitions_total{from, to}` - Counter
//! - `lora_notifications_total{outcome}` - Counter
//! - `lora_submissions_total{outcome}` - Counter
//! - `lora_cycle_duration_seconds` - Histogram
//! - `lora_cycle_tasks` - Gauge, tasks loaded by the last cycle

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
