//! Room timers
//!
//! The coordinator never sleeps. It asks a [`Scheduler`] for a timer and keeps
//! the returned [`TimerGuard`] inside the room; the timer delivers
//! [`TimerTick`]s back through the coordinator's queue until the guard drops.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tetris_battle_core::TimerGuard;

/// Shortest period an interval timer runs at; tokio panics on zero
pub const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Starting phase gave up waiting for page-loaded reports
    StartGrace,
    /// Periodic target re-roll during a round
    Retarget,
}

/// Delivered when a room timer fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTick {
    pub room_id: String,
    /// Room epoch at scheduling time; a tick from an older epoch is stale
    pub epoch: u64,
    pub kind: TimerKind,
}

pub trait Scheduler {
    /// Fire `tick` once after `delay`
    fn after(&self, delay: Duration, tick: TimerTick) -> TimerGuard;

    /// Fire `tick` every `period`, first after one full period
    fn every(&self, period: Duration, tick: TimerTick) -> TimerGuard;
}

/// Scheduler backed by tokio tasks; the guard aborts the task
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerTick>,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::UnboundedSender<TimerTick>) -> Self {
        Self { tx }
    }

    fn guard(handle: JoinHandle<()>) -> TimerGuard {
        TimerGuard::new(move || handle.abort())
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, tick: TimerTick) -> TimerGuard {
        let tx = self.tx.clone();
        Self::guard(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(tick);
        }))
    }

    fn every(&self, period: Duration, tick: TimerTick) -> TimerGuard {
        let period = period.max(MIN_TIMER_PERIOD);
        let tx = self.tx.clone();
        Self::guard(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(tick.clone()).is_err() {
                    break;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(kind: TimerKind) -> TimerTick {
        TimerTick {
            room_id: "r".into(),
            epoch: 1,
            kind,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn after_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        let _guard = scheduler.after(Duration::from_millis(100), tick(TimerKind::StartGrace));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().ok(), Some(tick(TimerKind::StartGrace)));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_guard_stops_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        let guard = scheduler.every(Duration::from_millis(100), tick(TimerKind::Retarget));

        tokio::time::sleep(Duration::from_millis(250)).await;
        let mut fired = 0;
        while rx.try_recv().is_ok() {
            fired += 1;
        }
        assert_eq!(fired, 2);

        drop(guard);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_interval_still_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        let _guard = scheduler.every(Duration::ZERO, tick(TimerKind::Retarget));

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(rx.try_recv().ok(), Some(tick(TimerKind::Retarget)));
    }
}
