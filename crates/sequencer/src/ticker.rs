//! Epoch tick generation.
//!
//! The ticker emits a boolean every `min_interval`: `true` when
//! `max_interval` has elapsed since the last epoch (forced, publish even if
//! empty), `false` otherwise (publish only if mutations are pending). The
//! contract is the emitted sequence, not the mechanism.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Decides, for each firing of the clock, whether the epoch is forced.
#[derive(Clone, Copy, Debug)]
pub struct TickPolicy {
    last: Instant,
    min_interval: Duration,
    max_interval: Duration,
}

impl TickPolicy {
    pub fn new(last: Instant, min_interval: Duration, max_interval: Duration) -> Self {
        Self { last, min_interval, max_interval }
    }

    /// `true` iff the max bound would lapse before the next firing; advances
    /// `last` when it fires.
    pub fn observe(&mut self, now: Instant) -> bool {
        let since_last = now.saturating_duration_since(self.last);
        if since_last + self.min_interval >= self.max_interval {
            self.last = now;
            return true;
        }
        false
    }
}

/// Spawn the ticker task. `last` is when the latest epoch was created; a
/// single-shot forced tick is emitted immediately when the max bound already
/// lapsed at startup. The channel is bounded at one so the ticker never runs
/// ahead of the epoch loop.
pub fn spawn_epoch_ticks(
    last: Instant,
    min_interval: Duration,
    max_interval: Duration,
) -> mpsc::Receiver<bool> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut policy = TickPolicy::new(last, min_interval, max_interval);
        if policy.observe(Instant::now()) {
            if tx.send(true).await.is_err() {
                return;
            }
        }
        let mut clock = time::interval_at(Instant::now() + min_interval, min_interval);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let fired_at = clock.tick().await;
            let force = policy.observe(fired_at);
            if tx.send(force).await.is_err() {
                return;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(3);

    #[test]
    fn policy_forces_once_the_max_bound_lapses() {
        let start = Instant::now();
        let mut policy = TickPolicy::new(start, MIN, MAX);
        assert!(!policy.observe(start + MIN));
        assert!(policy.observe(start + 2 * MIN));
        // last advanced to start + 2s; the cycle repeats
        assert!(!policy.observe(start + 3 * MIN));
        assert!(policy.observe(start + 4 * MIN));
    }

    #[test]
    fn policy_forces_immediately_when_already_stale() {
        let start = Instant::now();
        let mut policy = TickPolicy::new(start, MIN, MAX);
        assert!(policy.observe(start + 10 * MIN));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_emits_the_documented_sequence() {
        let mut ticks = spawn_epoch_ticks(Instant::now(), MIN, MAX);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(ticks.recv().await.unwrap());
        }
        assert_eq!(seen, vec![false, true, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_fires_a_startup_tick_when_stale() {
        let last = Instant::now();
        tokio::time::advance(10 * MIN).await;
        let mut ticks = spawn_epoch_ticks(last, MIN, MAX);
        assert_eq!(ticks.recv().await, Some(true));
    }
}
