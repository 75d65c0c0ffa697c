use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Consecutive unacknowledged heartbeats before the connection is declared dead.
pub const MAX_MISSED_HEARTBEATS: u32 = 3;

/// What the owner must do after a heartbeat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Send a heartbeat carrying the last sequence number.
    Probe,
    /// Too many heartbeats went unacknowledged; the timer has stopped.
    TimedOut,
    /// The monitor is not running; ignore.
    Idle,
}

/// Heartbeat bookkeeping plus the repeating timer that drives it.
///
/// The timer only signals through `on_tick`; the owner calls [`tick`] in its
/// own context and performs the send or close the result asks for.
///
/// [`tick`]: HeartbeatMonitor::tick
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    interval: Duration,
    last_acked: bool,
    last_sent_at: Option<Instant>,
    missed_count: u32,
    timer: Option<JoinHandle<()>>,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counters and start ticking every `interval`. Returns
    /// [`HeartbeatTick::Probe`]: the first heartbeat goes out immediately.
    ///
    /// `on_tick` runs on the timer task; returning `false` stops the timer.
    pub fn start<F>(&mut self, interval: Duration, mut on_tick: F) -> HeartbeatTick
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.stop();
        self.interval = interval;
        self.missed_count = 0;
        self.last_acked = true;

        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick() {
                    break;
                }
            }
        }));

        self.mark_sent();
        HeartbeatTick::Probe
    }

    pub fn tick(&mut self) -> HeartbeatTick {
        if !self.is_running() {
            return HeartbeatTick::Idle;
        }

        if !self.last_acked {
            self.missed_count += 1;
            tracing::debug!(
                "heartbeat not acknowledged ({}/{MAX_MISSED_HEARTBEATS})",
                self.missed_count
            );
            if self.missed_count >= MAX_MISSED_HEARTBEATS {
                self.stop();
                return HeartbeatTick::TimedOut;
            }
        }

        self.mark_sent();
        HeartbeatTick::Probe
    }

    /// Heartbeat requested by the server; goes out now without counting
    /// against the missed budget.
    pub fn request(&mut self) -> HeartbeatTick {
        if !self.is_running() {
            return HeartbeatTick::Idle;
        }
        self.mark_sent();
        HeartbeatTick::Probe
    }

    /// Record an acknowledgement. Returns the round-trip time of the
    /// outstanding heartbeat, if there was one.
    pub fn ack(&mut self) -> Option<Duration> {
        let latency = if self.last_acked {
            None
        } else {
            self.last_sent_at.map(|sent| sent.elapsed())
        };
        self.last_acked = true;
        self.missed_count = 0;
        latency
    }

    /// Cancel the timer. Safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn missed_count(&self) -> u32 {
        self.missed_count
    }

    pub fn last_acked(&self) -> bool {
        self.last_acked
    }

    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    fn mark_sent(&mut self) {
        self.last_acked = false;
        self.last_sent_at = Some(Instant::now());
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
