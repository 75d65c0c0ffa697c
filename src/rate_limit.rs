use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::GatewayError;

/// Outbound message classes with their own send budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitClass {
    Identify,
    PresenceUpdate,
    RequestMembers,
    /// Every other client command shares this bucket.
    Other,
}

impl RateLimitClass {
    pub const ALL: [RateLimitClass; 4] = [
        RateLimitClass::Identify,
        RateLimitClass::PresenceUpdate,
        RateLimitClass::RequestMembers,
        RateLimitClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitClass::Identify => "identify",
            RateLimitClass::PresenceUpdate => "presence_update",
            RateLimitClass::RequestMembers => "request_members",
            RateLimitClass::Other => "other",
        }
    }

    /// Default budget per window.
    pub fn default_rule(&self) -> RateLimitRule {
        match self {
            RateLimitClass::Identify => RateLimitRule::new(1, Duration::from_millis(5_000)),
            RateLimitClass::PresenceUpdate => RateLimitRule::new(5, Duration::from_millis(60_000)),
            RateLimitClass::RequestMembers => {
                RateLimitRule::new(120, Duration::from_millis(60_000))
            }
            RateLimitClass::Other => RateLimitRule::new(120, Duration::from_millis(60_000)),
        }
    }
}

impl fmt::Display for RateLimitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitRule {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// Fixed-window counter for one class.
#[derive(Debug, Clone)]
struct Bucket {
    rule: RateLimitRule,
    count: u32,
    /// `None` until the first send of a window.
    window_reset_at: Option<Instant>,
}

impl Bucket {
    fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            count: 0,
            window_reset_at: None,
        }
    }

    /// Drop the window if it has expired.
    fn roll(&mut self, now: Instant) {
        if matches!(self.window_reset_at, Some(reset_at) if now >= reset_at) {
            self.count = 0;
            self.window_reset_at = None;
        }
    }

    fn retry_after(&self, now: Instant) -> Duration {
        self.window_reset_at
            .map(|reset_at| reset_at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

/// Point-in-time usage of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    pub class: RateLimitClass,
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
    pub window_ms: u64,
    /// Milliseconds until the current window rolls over, if one is open.
    pub resets_in_ms: Option<u64>,
}

/// Per-class outbound rate limiter.
///
/// Windows open on the first send and are rolled lazily on the next check,
/// so there is no background timer to cancel.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: HashMap<RateLimitClass, Bucket>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

impl RateLimiter {
    /// Build a limiter from the defaults, replacing any class present in
    /// `overrides`.
    pub fn new(overrides: &HashMap<RateLimitClass, RateLimitRule>) -> Self {
        let buckets = RateLimitClass::ALL
            .iter()
            .map(|class| {
                let rule = overrides
                    .get(class)
                    .copied()
                    .unwrap_or_else(|| class.default_rule());
                (*class, Bucket::new(rule))
            })
            .collect();
        Self { buckets }
    }

    pub fn can_send(&mut self, class: RateLimitClass) -> bool {
        self.can_send_at(class, Instant::now())
    }

    pub fn record_send(&mut self, class: RateLimitClass) {
        self.record_send_at(class, Instant::now())
    }

    /// `Ok` if a send of `class` is allowed right now, otherwise the
    /// refusal with the time left in the window.
    pub fn check(&mut self, class: RateLimitClass) -> Result<(), GatewayError> {
        let now = Instant::now();
        if self.can_send_at(class, now) {
            return Ok(());
        }
        let retry_after = self.bucket(class).retry_after(now);
        tracing::debug!("rate limit refused {class}, retry after {retry_after:?}");
        Err(GatewayError::RateLimited { class, retry_after })
    }

    /// How long until `class` accepts another send; zero when it already does.
    pub fn retry_after(&mut self, class: RateLimitClass) -> Duration {
        let now = Instant::now();
        if self.can_send_at(class, now) {
            return Duration::ZERO;
        }
        self.bucket(class).retry_after(now)
    }

    fn can_send_at(&mut self, class: RateLimitClass, now: Instant) -> bool {
        let bucket = self.bucket(class);
        bucket.roll(now);
        bucket.count < bucket.rule.limit
    }

    fn record_send_at(&mut self, class: RateLimitClass, now: Instant) {
        let bucket = self.bucket(class);
        bucket.roll(now);
        if bucket.window_reset_at.is_none() {
            bucket.window_reset_at = Some(now + bucket.rule.window);
        }
        bucket.count = bucket.count.saturating_add(1);
    }

    /// Clear every counter and open window.
    pub fn reset(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.count = 0;
            bucket.window_reset_at = None;
        }
    }

    pub fn status(&self) -> Vec<RateLimitStatus> {
        let now = Instant::now();
        RateLimitClass::ALL
            .iter()
            .filter_map(|class| self.buckets.get(class).map(|b| (*class, b)))
            .map(|(class, bucket)| {
                let mut bucket = bucket.clone();
                bucket.roll(now);
                RateLimitStatus {
                    class,
                    count: bucket.count,
                    limit: bucket.rule.limit,
                    remaining: bucket.rule.limit.saturating_sub(bucket.count),
                    window_ms: bucket.rule.window.as_millis() as u64,
                    resets_in_ms: bucket
                        .window_reset_at
                        .map(|at| at.saturating_duration_since(now).as_millis() as u64),
                }
            })
            .collect()
    }

    fn bucket(&mut self, class: RateLimitClass) -> &mut Bucket {
        self.buckets
            .entry(class)
            .or_insert_with(|| Bucket::new(class.default_rule()))
    }
}
