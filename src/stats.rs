use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::state::ConnectionState;

/// Number of latency samples kept for the rolling average.
pub const LATENCY_SAMPLES: usize = 100;

const MAX_HEALTHY_RECONNECTIONS: u64 = 10;
const MAX_HEALTHY_ERRORS: u64 = 5;
const MAX_HEALTHY_LATENCY_MS: f64 = 1_000.0;
const MIN_HEALTHY_UPTIME_PERCENT: f64 = 90.0;

/// Connection counters accumulated over the lifetime of a client.
#[derive(Debug, Clone)]
pub struct ConnectionStats {
    total_connections: u64,
    total_disconnections: u64,
    total_reconnections: u64,
    total_errors: u64,
    /// Uptime of finished connections.
    uptime: Duration,
    connected_since: Option<Instant>,
    /// Start of the period the uptime percentage is measured over.
    tracked_since: Option<Instant>,
    last_connected_at: Option<DateTime<Utc>>,
    last_disconnected_at: Option<DateTime<Utc>>,
    latencies: VecDeque<Duration>,
    latency_sum: Duration,
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self {
            total_connections: 0,
            total_disconnections: 0,
            total_reconnections: 0,
            total_errors: 0,
            uptime: Duration::ZERO,
            connected_since: None,
            tracked_since: None,
            last_connected_at: None,
            last_disconnected_at: None,
            latencies: VecDeque::with_capacity(LATENCY_SAMPLES),
            latency_sum: Duration::ZERO,
        }
    }
}

impl ConnectionStats {
    pub fn record_connect(&mut self) {
        let now = Instant::now();
        self.total_connections += 1;
        self.last_connected_at = Some(Utc::now());
        self.tracked_since.get_or_insert(now);
        // A connect without a matching disconnect folds the open period in.
        if let Some(since) = self.connected_since.replace(now) {
            self.uptime += now.saturating_duration_since(since);
        }
    }

    /// Close the current connected period. No-op while not connected.
    pub fn record_disconnect(&mut self) {
        let Some(since) = self.connected_since.take() else {
            return;
        };
        self.total_disconnections += 1;
        self.last_disconnected_at = Some(Utc::now());
        self.uptime += Instant::now().saturating_duration_since(since);
    }

    pub fn record_reconnect(&mut self) {
        self.total_reconnections += 1;
    }

    pub fn record_error(&mut self) {
        self.total_errors += 1;
    }

    pub fn record_latency(&mut self, sample: Duration) {
        if self.latencies.len() == LATENCY_SAMPLES {
            if let Some(oldest) = self.latencies.pop_front() {
                self.latency_sum = self.latency_sum.saturating_sub(oldest);
            }
        }
        self.latencies.push_back(sample);
        self.latency_sum += sample;
    }

    /// Forget everything, keeping only an open connection (if any) as the
    /// start of the new accounting period.
    pub fn reset(&mut self) {
        let connected = self.connected_since.is_some();
        *self = Self::default();
        if connected {
            let now = Instant::now();
            self.connected_since = Some(now);
            self.tracked_since = Some(now);
        }
    }

    pub fn average_latency(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        Some(self.latency_sum / self.latencies.len() as u32)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let now = Instant::now();
        let current = self
            .connected_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or(Duration::ZERO);
        let total_uptime = self.uptime + current;
        let uptime_percentage = self.tracked_since.map(|since| {
            let tracked = now.saturating_duration_since(since);
            if tracked.is_zero() {
                100.0
            } else {
                (total_uptime.as_secs_f64() / tracked.as_secs_f64() * 100.0).min(100.0)
            }
        });

        StatsSnapshot {
            total_connections: self.total_connections,
            total_disconnections: self.total_disconnections,
            total_reconnections: self.total_reconnections,
            total_errors: self.total_errors,
            total_uptime_ms: total_uptime.as_millis() as u64,
            current_uptime_ms: current.as_millis() as u64,
            uptime_percentage,
            last_connected_at: self.last_connected_at,
            last_disconnected_at: self.last_disconnected_at,
            latency_samples: self.latencies.len(),
            last_latency_ms: self.latencies.back().map(|d| d.as_millis() as u64),
            average_latency_ms: self.average_latency().map(|d| d.as_secs_f64() * 1_000.0),
        }
    }
}

/// Copy of the counters at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_connections: u64,
    pub total_disconnections: u64,
    pub total_reconnections: u64,
    pub total_errors: u64,
    pub total_uptime_ms: u64,
    pub current_uptime_ms: u64,
    /// `None` until the first connection.
    pub uptime_percentage: Option<f64>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_disconnected_at: Option<DateTime<Utc>>,
    pub latency_samples: usize,
    pub last_latency_ms: Option<u64>,
    pub average_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Judge connection health from a stats snapshot. Diagnostic only.
pub fn check_health(stats: &StatsSnapshot, state: ConnectionState) -> HealthReport {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if state == ConnectionState::Failed {
        issues.push("connection is in the failed state".to_string());
        recommendations
            .push("check the token and intents, then call connect() again".to_string());
    }

    if stats.total_reconnections > MAX_HEALTHY_RECONNECTIONS {
        issues.push(format!(
            "high reconnection count: {}",
            stats.total_reconnections
        ));
        recommendations.push("check network stability and gateway availability".to_string());
    }

    if stats.total_errors > MAX_HEALTHY_ERRORS {
        issues.push(format!("high error count: {}", stats.total_errors));
        recommendations.push("inspect error events for a recurring cause".to_string());
    }

    if let Some(avg) = stats.average_latency_ms {
        if avg > MAX_HEALTHY_LATENCY_MS {
            issues.push(format!("high average latency: {avg:.0}ms"));
            recommendations
                .push("check network latency to the gateway host".to_string());
        }
    }

    if let Some(uptime) = stats.uptime_percentage {
        if uptime < MIN_HEALTHY_UPTIME_PERCENT {
            issues.push(format!("low uptime: {uptime:.1}%"));
            recommendations.push("investigate frequent or long disconnections".to_string());
        }
    }

    HealthReport {
        healthy: issues.is_empty(),
        issues,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_connect_disconnect_accumulates_uptime() {
        let mut stats = ConnectionStats::default();
        stats.record_connect();
        tokio::time::advance(Duration::from_secs(30)).await;
        stats.record_disconnect();
        tokio::time::advance(Duration::from_secs(10)).await;
        stats.record_connect();
        tokio::time::advance(Duration::from_secs(20)).await;

        let snap = stats.snapshot();
        assert_eq!(snap.total_connections, 2);
        assert_eq!(snap.total_disconnections, 1);
        assert_eq!(snap.total_uptime_ms, 50_000);
        assert_eq!(snap.current_uptime_ms, 20_000);
        let pct = snap.uptime_percentage.unwrap();
        assert!((pct - 83.33).abs() < 0.01, "got {pct}");
        assert!(snap.last_connected_at.is_some());
        assert!(snap.last_disconnected_at.is_some());
    }

    #[test]
    fn test_disconnect_without_connect_is_ignored() {
        let mut stats = ConnectionStats::default();
        stats.record_disconnect();
        let snap = stats.snapshot();
        assert_eq!(snap.total_disconnections, 0);
        assert!(snap.uptime_percentage.is_none());
    }

    #[test]
    fn test_latency_ring_buffer_drops_oldest() {
        let mut stats = ConnectionStats::default();
        stats.record_latency(Duration::from_millis(10_000));
        for _ in 0..LATENCY_SAMPLES {
            stats.record_latency(Duration::from_millis(100));
        }
        let snap = stats.snapshot();
        assert_eq!(snap.latency_samples, LATENCY_SAMPLES);
        assert_eq!(snap.average_latency_ms, Some(100.0));
        assert_eq!(snap.last_latency_ms, Some(100));
    }

    #[test]
    fn test_average_latency() {
        let mut stats = ConnectionStats::default();
        assert!(stats.average_latency().is_none());
        stats.record_latency(Duration::from_millis(40));
        stats.record_latency(Duration::from_millis(60));
        assert_eq!(stats.average_latency(), Some(Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_keeps_open_connection() {
        let mut stats = ConnectionStats::default();
        stats.record_connect();
        stats.record_error();
        stats.record_reconnect();
        tokio::time::advance(Duration::from_secs(5)).await;
        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.total_connections, 0);
        assert_eq!(snap.total_errors, 0);
        assert_eq!(snap.total_reconnections, 0);
        assert_eq!(snap.total_uptime_ms, 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        stats.record_disconnect();
        assert_eq!(stats.snapshot().total_uptime_ms, 5_000);
    }

    #[test]
    fn test_fresh_stats_are_healthy() {
        let stats = ConnectionStats::default();
        let report = check_health(&stats.snapshot(), ConnectionState::Disconnected);
        assert!(report.healthy);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_failed_state_is_unhealthy() {
        let stats = ConnectionStats::default();
        let report = check_health(&stats.snapshot(), ConnectionState::Failed);
        assert!(!report.healthy);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_thresholds_itemized() {
        let mut stats = ConnectionStats::default();
        for _ in 0..11 {
            stats.record_reconnect();
        }
        for _ in 0..6 {
            stats.record_error();
        }
        stats.record_latency(Duration::from_millis(1_500));

        let report = check_health(&stats.snapshot(), ConnectionState::Connected);
        assert!(!report.healthy);
        assert_eq!(report.issues.len(), 3);
        assert!(report.issues[0].contains("reconnection"));
        assert!(report.issues[1].contains("error"));
        assert!(report.issues[2].contains("latency"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_uptime_flagged() {
        let mut stats = ConnectionStats::default();
        stats.record_connect();
        tokio::time::advance(Duration::from_secs(1)).await;
        stats.record_disconnect();
        tokio::time::advance(Duration::from_secs(9)).await;

        let report = check_health(&stats.snapshot(), ConnectionState::Reconnecting);
        assert!(!report.healthy);
        assert!(report.issues[0].contains("uptime"));
    }
}
