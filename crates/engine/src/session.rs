//! Async driver for a [`LocalEngine`]
//!
//! One task owns the engine and runs the fixed-step simulation; inputs arrive
//! on a channel and are applied inside the same step loop. A second task, the
//! wall clock, only exists while the round is live and unpaused. Its guard is
//! dropped on pause, game end, restart and teardown, and every tick carries the
//! epoch it was started in so ticks queued before a stop are ignored.

use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use tetris_battle_core::{BoardSnapshot, TimerGuard};
use tetris_battle_types::{GameAction, TICK_MS};

use crate::local::{EngineEvent, LocalEngine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Simulation step
    pub tick: Duration,
    /// Wall-clock cadence for elapsed time, level-ups and hazards
    pub clock_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(u64::from(TICK_MS)),
            clock_period: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Action(GameAction),
    /// Garbage rows received from an opponent
    Garbage { lines: u32 },
    /// New round, same mode and hazards
    Restart { seed: u32 },
}

#[derive(Debug, Clone, Copy)]
struct ClockTick {
    epoch: u64,
}

/// The wall-clock task and the epoch it runs in
struct WallClock {
    tx: mpsc::UnboundedSender<ClockTick>,
    period: Duration,
    epoch: u64,
    guard: Option<TimerGuard>,
}

impl WallClock {
    fn sync(&mut self, running: bool) {
        match (running, self.guard.is_some()) {
            (true, false) => self.start(),
            (false, true) => self.stop(),
            _ => {}
        }
    }

    fn start(&mut self) {
        let tx = self.tx.clone();
        let epoch = self.epoch;
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(ClockTick { epoch }).is_err() {
                    break;
                }
            }
        });
        self.guard = Some(TimerGuard::new(move || handle.abort()));
    }

    fn stop(&mut self) {
        self.guard = None;
        self.epoch += 1;
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Handle to a running engine task; dropping it stops the task
pub struct EngineSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<BoardSnapshot>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    task: Option<JoinHandle<()>>,
}

impl EngineSession {
    pub fn spawn(engine: LocalEngine, config: SessionConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(engine, config, cmd_rx, snapshot_tx, event_tx));
        Self {
            commands: cmd_tx,
            snapshots: snapshot_rx,
            events: event_rx,
            task: Some(task),
        }
    }

    pub fn send(&self, command: SessionCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("engine session stopped"))
    }

    pub fn act(&self, action: GameAction) -> anyhow::Result<()> {
        self.send(SessionCommand::Action(action))
    }

    /// Watch of the latest snapshot, for renderers and the sync channel
    pub fn snapshots(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> BoardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<EngineEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the engine and wait for its task to end
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn drive(
    mut engine: LocalEngine,
    config: SessionConfig,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    snapshots: watch::Sender<BoardSnapshot>,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    let step = config.tick.max(Duration::from_millis(1));
    let period = config.clock_period.max(Duration::from_millis(1));
    let (step_ms, clock_ms) = (millis(step), millis(period));

    let (clock_tx, mut clock_rx) = mpsc::unbounded_channel();
    let mut clock = WallClock {
        tx: clock_tx,
        period,
        epoch: 0,
        guard: None,
    };
    clock.sync(engine.clock_running());

    let mut sim = time::interval(step);
    sim.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sim.tick() => engine.tick(step_ms),
            command = commands.recv() => match command {
                Some(SessionCommand::Action(action)) => engine.act(action),
                Some(SessionCommand::Garbage { lines }) => engine.receive_garbage(lines),
                Some(SessionCommand::Restart { seed }) => {
                    engine.restart(seed);
                    clock.stop();
                }
                None => break,
            },
            Some(tick) = clock_rx.recv() => {
                if tick.epoch == clock.epoch {
                    engine.clock(clock_ms);
                } else {
                    tracing::trace!(epoch = tick.epoch, current = clock.epoch, "stale clock tick");
                }
            }
        }

        clock.sync(engine.clock_running());
        for event in engine.drain_events() {
            let _ = events.send(event);
        }
        let latest = engine.snapshot();
        snapshots.send_if_modified(|current| {
            if *current == latest {
                return false;
            }
            *current = latest;
            true
        });
    }
    tracing::debug!("engine session stopped");
}
