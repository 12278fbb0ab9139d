//! Lightweight Prometheus-compatible metrics using atomic counters.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Application-wide metrics collected via atomic counters.
pub struct Metrics {
    sign_ins_total: AtomicU64,
    sign_in_failures_total: AtomicU64,
    sign_ups_total: AtomicU64,
    comments_total: AtomicU64,
    comments_rate_limited_total: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            sign_ins_total: AtomicU64::new(0),
            sign_in_failures_total: AtomicU64::new(0),
            sign_ups_total: AtomicU64::new(0),
            comments_total: AtomicU64::new(0),
            comments_rate_limited_total: AtomicU64::new(0),
        }
    }

    /// Record a sign-in attempt.
    pub fn record_sign_in(&self, success: bool) {
        self.sign_ins_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.sign_in_failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sign_up(&self) {
        self.sign_ups_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_comment(&self) {
        self.comments_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_comment_rate_limited(&self) {
        self.comments_rate_limited_total
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self, active_sessions: usize, uptime_seconds: u64) -> String {
        let mut out = String::with_capacity(1024);

        gauge(
            &mut out,
            "inkboard_active_sessions",
            "Number of live sign-in sessions",
            active_sessions,
        );
        gauge(
            &mut out,
            "inkboard_uptime_seconds",
            "Server uptime in seconds",
            uptime_seconds,
        );

        counter(
            &mut out,
            "inkboard_sign_ins_total",
            "Total sign-in attempts.",
            &self.sign_ins_total,
        );
        counter(
            &mut out,
            "inkboard_sign_in_failures_total",
            "Sign-in attempts rejected for bad credentials.",
            &self.sign_in_failures_total,
        );
        counter(
            &mut out,
            "inkboard_sign_ups_total",
            "Accounts created through sign-up.",
            &self.sign_ups_total,
        );
        counter(
            &mut out,
            "inkboard_comments_total",
            "Comments accepted for moderation.",
            &self.comments_total,
        );
        counter(
            &mut out,
            "inkboard_comments_rate_limited_total",
            "Comment submissions rejected by the rate limiter.",
            &self.comments_rate_limited_total,
        );

        out
    }
}

fn gauge(out: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    writeln!(out, "# HELP {name} {help}").unwrap();
    writeln!(out, "# TYPE {name} gauge").unwrap();
    writeln!(out, "{name} {value}").unwrap();
}

fn counter(out: &mut String, name: &str, help: &str, value: &AtomicU64) {
    writeln!(out, "# HELP {name} {help}").unwrap();
    writeln!(out, "# TYPE {name} counter").unwrap();
    writeln!(out, "{name} {}", value.load(Ordering::Relaxed)).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_counts() {
        let metrics = Metrics::new();
        metrics.record_sign_in(true);
        metrics.record_sign_in(false);
        metrics.record_comment();
        metrics.record_comment_rate_limited();
        metrics.record_comment_rate_limited();

        let out = metrics.render(3, 42);
        assert!(out.contains("inkboard_active_sessions 3\n"));
        assert!(out.contains("inkboard_uptime_seconds 42\n"));
        assert!(out.contains("inkboard_sign_ins_total 2\n"));
        assert!(out.contains("inkboard_sign_in_failures_total 1\n"));
        assert!(out.contains("inkboard_sign_ups_total 0\n"));
        assert!(out.contains("inkboard_comments_total 1\n"));
        assert!(out.contains("inkboard_comments_rate_limited_total 2\n"));
        assert!(out.contains("# TYPE inkboard_comments_total counter\n"));
    }
}
