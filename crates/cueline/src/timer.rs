// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timer capability injected into a [`Timeline`](crate::Timeline).
//!
//! A timer invokes a tick function every period until cancelled. Arming a
//! timer that is already armed replaces the previous tick function, so a
//! timer never holds more than one active handle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Tick function handed to a timer
pub type TickFn = Box<dyn FnMut()>;

/// Periodic tick source
pub trait Timer {
    /// Start invoking `tick` every `period`, replacing any active handle
    fn arm(&mut self, period: Duration, tick: TickFn);

    /// Stop ticking; a no-op when not armed
    fn cancel(&mut self);

    /// Whether a tick function is currently scheduled
    fn is_armed(&self) -> bool;
}

impl<T: Timer + ?Sized> Timer for Box<T> {
    fn arm(&mut self, period: Duration, tick: TickFn) {
        (**self).arm(period, tick);
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }

    fn is_armed(&self) -> bool {
        (**self).is_armed()
    }
}

#[derive(Default)]
struct ManualState {
    tick: Option<TickFn>,
    armed: bool,
    period: Duration,
    generation: u64,
    ticks: u64,
}

/// Offline timer stepped explicitly by the caller
///
/// Clones share state, so a test can keep one handle and give another to
/// the timeline.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Rc<RefCell<ManualState>>,
}

impl ManualTimer {
    /// Create an unarmed timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one tick; returns false when the timer is not armed
    pub fn step(&self) -> bool {
        let (mut tick, generation) = {
            let mut state = self.state.borrow_mut();
            if !state.armed {
                return false;
            }
            match state.tick.take() {
                Some(tick) => (tick, state.generation),
                None => return false,
            }
        };

        // Run without holding the borrow so the tick may cancel or re-arm
        tick();

        let mut state = self.state.borrow_mut();
        state.ticks += 1;
        if state.generation == generation {
            state.tick = Some(tick);
        }
        true
    }

    /// Fire up to `n` ticks, stopping early if the timer is cancelled
    pub fn advance(&self, n: usize) -> usize {
        let mut fired = 0;
        while fired < n && self.step() {
            fired += 1;
        }
        fired
    }

    /// Advance by wall-clock time, one tick per elapsed period
    pub fn advance_by(&self, elapsed: Duration) -> usize {
        let period = self.period();
        if period.is_zero() {
            return 0;
        }
        let n = (elapsed.as_nanos() / period.as_nanos()) as usize;
        self.advance(n)
    }

    /// Tick until cancelled, with an upper bound to guard against runaway loops
    pub fn run_to_end(&self, max_ticks: usize) -> usize {
        self.advance(max_ticks)
    }

    /// Period of the current (or last) arming
    pub fn period(&self) -> Duration {
        self.state.borrow().period
    }

    /// Total ticks fired across all armings
    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    /// How many times the timer has been armed or cancelled
    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }
}

impl Timer for ManualTimer {
    fn arm(&mut self, period: Duration, tick: TickFn) {
        let mut state = self.state.borrow_mut();
        state.generation += 1;
        state.armed = true;
        state.period = period;
        state.tick = Some(tick);
    }

    fn cancel(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.armed {
            state.generation += 1;
            state.armed = false;
            state.tick = None;
        }
    }

    fn is_armed(&self) -> bool {
        self.state.borrow().armed
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ManualTimer")
            .field("armed", &state.armed)
            .field("period", &state.period)
            .field("ticks", &state.ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_step_requires_arm() {
        let timer = ManualTimer::new();
        assert!(!timer.is_armed());
        assert!(!timer.step());
    }

    #[test]
    fn test_arm_and_advance() {
        let count = Rc::new(Cell::new(0));
        let mut timer = ManualTimer::new();
        let c = count.clone();
        timer.arm(Duration::from_millis(5), Box::new(move || c.set(c.get() + 1)));

        assert_eq!(timer.advance(3), 3);
        assert_eq!(count.get(), 3);
        assert_eq!(timer.advance_by(Duration::from_millis(20)), 4);
        assert_eq!(count.get(), 7);
    }

    #[test]
    fn test_rearm_replaces_handle() {
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let mut timer = ManualTimer::new();

        let f = first.clone();
        timer.arm(Duration::from_millis(5), Box::new(move || f.set(f.get() + 1)));
        let s = second.clone();
        timer.arm(Duration::from_millis(5), Box::new(move || s.set(s.get() + 1)));

        timer.advance(2);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn test_tick_can_cancel_itself() {
        let mut timer = ManualTimer::new();
        let mut handle = timer.clone();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        timer.arm(
            Duration::from_millis(5),
            Box::new(move || {
                c.set(c.get() + 1);
                if c.get() == 2 {
                    handle.cancel();
                }
            }),
        );

        assert_eq!(timer.advance(10), 2);
        assert!(!timer.is_armed());
        assert_eq!(count.get(), 2);
    }
}
