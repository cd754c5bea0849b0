use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct TelemetryState {
    queries_total: u64,
    blocked_total: HashMap<String, u64>,
    approved_total: u64,
    error_total: u64,
    ledger_failures_total: HashMap<String, u64>,
    archive_failures_total: u64,
}

/// Process-wide counters, shared by value. Everything here is advisory:
/// the pipeline's behavior never depends on a counter.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self) {
        self.state.lock().queries_total += 1;
    }

    pub fn record_blocked(&self, rule: &str) {
        let mut guard = self.state.lock();
        *guard.blocked_total.entry(rule.to_string()).or_insert(0) += 1;
    }

    pub fn record_approved(&self) {
        self.state.lock().approved_total += 1;
    }

    pub fn record_error(&self) {
        self.state.lock().error_total += 1;
    }

    pub fn record_ledger_failure(&self, op: &str) {
        let mut guard = self.state.lock();
        *guard
            .ledger_failures_total
            .entry(op.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_archive_failure(&self) {
        self.state.lock().archive_failures_total += 1;
    }

    /// Text exposition of all counters.
    pub fn render(&self) -> String {
        let guard = self.state.lock();
        let mut out = String::new();
        let _ = writeln!(out, "querygate_queries_total {}", guard.queries_total);
        let _ = writeln!(out, "querygate_approved_total {}", guard.approved_total);
        let _ = writeln!(out, "querygate_error_total {}", guard.error_total);
        let mut blocked: Vec<_> = guard.blocked_total.iter().collect();
        blocked.sort();
        for (rule, count) in blocked {
            let _ = writeln!(out, "querygate_blocked_total{{rule=\"{rule}\"}} {count}");
        }
        let mut ledger: Vec<_> = guard.ledger_failures_total.iter().collect();
        ledger.sort();
        for (op, count) in ledger {
            let _ = writeln!(out, "querygate_ledger_failures_total{{op=\"{op}\"}} {count}");
        }
        let _ = writeln!(
            out,
            "querygate_archive_failures_total {}",
            guard.archive_failures_total
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_render() {
        let telemetry = Telemetry::new();
        telemetry.record_query();
        telemetry.record_query();
        telemetry.record_blocked("dictionary");
        telemetry.record_ledger_failure("validateQuery");
        telemetry.record_archive_failure();
        telemetry.record_approved();

        let rendered = telemetry.render();
        assert!(rendered.contains("querygate_queries_total 2"));
        assert!(rendered.contains("querygate_blocked_total{rule=\"dictionary\"} 1"));
        assert!(rendered.contains("querygate_ledger_failures_total{op=\"validateQuery\"} 1"));
        assert!(rendered.contains("querygate_archive_failures_total 1"));
    }

    #[test]
    fn clones_share_state() {
        let telemetry = Telemetry::new();
        let clone = telemetry.clone();
        clone.record_approved();
        assert!(telemetry.render().contains("querygate_approved_total 1"));
    }
}
