use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Reaction pipeline counters, shared between the bridge and `/metrics`.
#[derive(Debug)]
pub struct BridgeMetrics {
    started_at: Instant,
    reactions_received: AtomicU64,
    reactions_recorded: AtomicU64,
    reactions_ignored: AtomicU64,
    reactions_failed: AtomicU64,
    reactions_dropped: AtomicU64,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub received: u64,
    pub recorded: u64,
    pub ignored: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            reactions_received: AtomicU64::new(0),
            reactions_recorded: AtomicU64::new(0),
            reactions_ignored: AtomicU64::new(0),
            reactions_failed: AtomicU64::new(0),
            reactions_dropped: AtomicU64::new(0),
        }
    }

    pub fn reaction_received(&self) {
        self.reactions_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reaction_recorded(&self) {
        self.reactions_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reaction_ignored(&self) {
        self.reactions_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reaction_failed(&self) {
        self.reactions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reaction_dropped(&self) {
        self.reactions_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.started_at.elapsed().as_secs(),
            received: self.reactions_received.load(Ordering::Relaxed),
            recorded: self.reactions_recorded.load(Ordering::Relaxed),
            ignored: self.reactions_ignored.load(Ordering::Relaxed),
            failed: self.reactions_failed.load(Ordering::Relaxed),
            dropped: self.reactions_dropped.load(Ordering::Relaxed),
        }
    }

    pub fn format_prometheus(&self) -> String {
        let s = self.snapshot();

        format!(
            r#"# HELP fc_uptime_seconds Number of seconds the service has been running
# TYPE fc_uptime_seconds gauge
fc_uptime_seconds {}

# HELP rsvp_reactions_received_total Reactions delivered by the Discord gateway
# TYPE rsvp_reactions_received_total counter
rsvp_reactions_received_total {}

# HELP rsvp_reactions_recorded_total Reactions that produced an RSVP upsert
# TYPE rsvp_reactions_recorded_total counter
rsvp_reactions_recorded_total {}

# HELP rsvp_reactions_ignored_total Reactions skipped as routine noise
# TYPE rsvp_reactions_ignored_total counter
rsvp_reactions_ignored_total {}

# HELP rsvp_reactions_failed_total Reactions dropped after a storage fault
# TYPE rsvp_reactions_failed_total counter
rsvp_reactions_failed_total {}

# HELP rsvp_reactions_dropped_total Reactions dropped because the queue was full
# TYPE rsvp_reactions_dropped_total counter
rsvp_reactions_dropped_total {}
"#,
            s.uptime_seconds, s.received, s.recorded, s.ignored, s.failed, s.dropped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_independently() {
        let metrics = BridgeMetrics::new();
        metrics.reaction_received();
        metrics.reaction_received();
        metrics.reaction_recorded();
        metrics.reaction_ignored();
        metrics.reaction_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.recorded, 1);
        assert_eq!(snapshot.ignored, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.dropped, 0);
    }

    #[test]
    fn format_prometheus_includes_all_metrics() {
        let metrics = BridgeMetrics::new();
        metrics.reaction_dropped();
        let output = metrics.format_prometheus();
        assert!(output.contains("fc_uptime_seconds"));
        assert!(output.contains("rsvp_reactions_received_total 0"));
        assert!(output.contains("rsvp_reactions_recorded_total"));
        assert!(output.contains("rsvp_reactions_ignored_total"));
        assert!(output.contains("rsvp_reactions_failed_total"));
        assert!(output.contains("rsvp_reactions_dropped_total 1"));
    }
}
