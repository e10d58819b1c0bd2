use std::time::Duration;

use lora_core::MetricsBackend;
use lora_model::{RemoteSignal, TaskStatus};
use prometheus::{
    Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, proto::MetricFamily,
};

const CYCLE_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    polls: IntCounterVec,
    transitions: IntCounterVec,
    notifications: IntCounterVec,
    submissions: IntCounterVec,
    cycle_duration: Histogram,
    cycle_tasks: IntGauge,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors into an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let polls = IntCounterVec::new(
            Opts::new("lora_polls_total", "Toolkit status polls by signal"),
            &["signal"],
        )?;
        let transitions = IntCounterVec::new(
            Opts::new("lora_transitions_total", "Persisted task status transitions"),
            &["from", "to"],
        )?;
        let notifications = IntCounterVec::new(
            Opts::new(
                "lora_notifications_total",
                "Artifact fetch notifications by outcome",
            ),
            &["outcome"],
        )?;
        let submissions = IntCounterVec::new(
            Opts::new("lora_submissions_total", "Training submissions by outcome"),
            &["outcome"],
        )?;
        let cycle_duration = Histogram::with_opts(
            HistogramOpts::new(
                "lora_cycle_duration_seconds",
                "Wall time of one reconciliation cycle",
            )
            .buckets(CYCLE_BUCKETS.to_vec()),
        )?;
        let cycle_tasks = IntGauge::new("lora_cycle_tasks", "Tasks loaded by the last cycle")?;

        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(transitions.clone()))?;
        registry.register(Box::new(notifications.clone()))?;
        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;
        registry.register(Box::new(cycle_tasks.clone()))?;

        Ok(Self {
            registry,
            polls,
            transitions,
            notifications,
            submissions,
            cycle_duration,
            cycle_tasks,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_poll(&self, signal: RemoteSignal) {
        self.polls.with_label_values(&[signal.as_str()]).inc();
    }

    fn record_transition(&self, from: TaskStatus, to: TaskStatus) {
        self.transitions
            .with_label_values(&[from.as_str(), to.as_str()])
            .inc();
    }

    fn record_notification(&self, delivered: bool) {
        let outcome = if delivered { "delivered" } else { "failed" };
        self.notifications.with_label_values(&[outcome]).inc();
    }

    fn record_submission(&self, outcome: &'static str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    fn record_cycle(&self, loaded: usize, elapsed: Duration) {
        self.cycle_duration.observe(elapsed.as_secs_f64());
        self.cycle_tasks.set(loaded as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn render(metrics: &PrometheusMetrics) -> String {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&metrics.gather(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn counts_polls_and_transitions() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_poll(RemoteSignal::Accepted);
        m.record_poll(RemoteSignal::Accepted);
        m.record_poll(RemoteSignal::Other);
        m.record_transition(TaskStatus::Pending, TaskStatus::Training);

        assert_eq!(m.polls.with_label_values(&["accepted"]).get(), 2);
        assert_eq!(m.polls.with_label_values(&["other"]).get(), 1);
        assert_eq!(
            m.transitions
                .with_label_values(&["pending", "training"])
                .get(),
            1
        );
    }

    #[test]
    fn exposition_contains_every_family() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_poll(RemoteSignal::Ok);
        m.record_transition(TaskStatus::Training, TaskStatus::RunBefore);
        m.record_notification(false);
        m.record_submission("created");
        m.record_cycle(3, Duration::from_millis(120));

        let text = render(&m);
        for name in [
            "lora_polls_total",
            "lora_transitions_total",
            "lora_notifications_total",
            "lora_submissions_total",
            "lora_cycle_duration_seconds",
            "lora_cycle_tasks 3",
        ] {
            assert!(text.contains(name), "missing {name} in:\n{text}");
        }
        assert!(text.contains(r#"lora_notifications_total{outcome="failed"} 1"#));
    }

    #[test]
    fn shared_registry_rejects_double_registration() {
        let registry = Registry::new();
        PrometheusMetrics::with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::with_registry(registry).is_err());
    }
}
