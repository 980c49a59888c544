// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tokio-backed interval timer.

use cueline::{Result, Snapshot, TickFn, Timeline, Timer};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Timer that ticks on a tokio interval
///
/// Missed ticks are delivered in a burst, so simulated progress keeps pace
/// with wall-clock time even when the thread stalls.
///
/// # Panics
///
/// [`Timer::arm`] must be called from within a [`tokio::task::LocalSet`].
#[derive(Debug, Default)]
pub struct IntervalTimer {
    task: Option<JoinHandle<()>>,
    generation: Rc<Cell<u64>>,
}

impl IntervalTimer {
    /// Create an unarmed timer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for IntervalTimer {
    fn arm(&mut self, period: Duration, mut tick: TickFn) {
        self.cancel();

        let generation = self.generation.clone();
        let armed_at = generation.get();
        self.task = Some(tokio::task::spawn_local(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                interval.tick().await;
                // A burst may resume after cancel before the abort lands
                if generation.get() != armed_at {
                    break;
                }
                tick();
            }
        }));
        tracing::trace!(period_ms = period.as_millis() as u64, "Interval timer armed");
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            self.generation.set(self.generation.get() + 1);
            task.abort();
            tracing::trace!("Interval timer cancelled");
        }
    }

    fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Wait until the timeline stops ticking, returning the last snapshot
///
/// Returns on completion, pause, or stop. Polls once per tick interval.
pub async fn wait_finished(timeline: &Timeline) -> Snapshot {
    let period = timeline.config().tick();
    loop {
        if timeline.is_finished() || !timeline.is_ticking() {
            return timeline.snapshot();
        }
        time::sleep(period).await;
    }
}

/// Play a timeline from the start and wait for it to finish
pub async fn play_to_end(timeline: &Timeline) -> Result<Snapshot> {
    timeline.play()?;
    Ok(wait_finished(timeline).await)
}
