use std::time::Duration;

use lora_model::{RemoteSignal, TaskStatus};

/// Sink for reconciliation and submission metrics.
pub trait MetricsBackend: Send + Sync + 'static {
    fn record_poll(&self, signal: RemoteSignal);
    fn record_transition(&self, from: TaskStatus, to: TaskStatus);
    fn record_notification(&self, delivered: bool);
    fn record_submission(&self, outcome: &'static str);
    fn record_cycle(&self, loaded: usize, elapsed: Duration);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {
    fn record_poll(&self, _signal: RemoteSignal) {}
    fn record_transition(&self, _from: TaskStatus, _to: TaskStatus) {}
    fn record_notification(&self, _delivered: bool) {}
    fn record_submission(&self, _outcome: &'static str) {}
    fn record_cycle(&self, _loaded: usize, _elapsed: Duration) {}
}
