//! Debounced "agent is working" indicator.
//!
//! Active iff `mark_active` was called within the last idle window without an
//! intervening `mark_inactive`. While active, an elapsed-seconds counter ticks.

use std::time::Duration;

use tracing::debug;

use crate::scheduler::{Scheduler, Timer, TimerHandle};
use crate::view::ChatView;

pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_millis(1500);
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThinkingState {
    pub active: bool,
    pub elapsed_secs: u64,
}

#[derive(Debug)]
pub struct ThinkingSignal {
    idle_window: Duration,
    tick: Duration,
    state: ThinkingState,
    idle_timer: Option<TimerHandle>,
    tick_timer: Option<TimerHandle>,
}

impl Default for ThinkingSignal {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_WINDOW, DEFAULT_TICK)
    }
}

impl ThinkingSignal {
    pub fn new(idle_window: Duration, tick: Duration) -> Self {
        Self {
            idle_window,
            tick,
            state: ThinkingState::default(),
            idle_timer: None,
            tick_timer: None,
        }
    }

    pub fn state(&self) -> ThinkingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Record activity. Starts the elapsed counter if it is not running and
    /// always restarts the idle window.
    pub fn mark_active(&mut self, sched: &mut dyn Scheduler, view: &mut dyn ChatView) {
        let was_active = self.state.active;
        self.state.active = true;

        if self.tick_timer.is_none() {
            self.state.elapsed_secs = 0;
            self.tick_timer = Some(sched.schedule(self.tick, Timer::ThinkingTick));
        }

        if let Some(old) = self.idle_timer.take() {
            sched.cancel(old);
        }
        self.idle_timer = Some(sched.schedule(self.idle_window, Timer::ThinkingIdle));

        if !was_active {
            debug!("agent busy");
            view.thinking_changed(self.state);
        }
    }

    /// Drop to idle immediately and stop all timers.
    pub fn mark_inactive(&mut self, sched: &mut dyn Scheduler, view: &mut dyn ChatView) {
        if let Some(h) = self.idle_timer.take() {
            sched.cancel(h);
        }
        if let Some(h) = self.tick_timer.take() {
            sched.cancel(h);
        }

        let was = self.state;
        self.state = ThinkingState::default();
        if was != self.state {
            debug!(elapsed_secs = was.elapsed_secs, "agent idle");
            view.thinking_changed(self.state);
        }
    }

    /// Handle a fired timer. Returns `false` if the handle is not one this
    /// signal currently owns (stale or foreign), in which case nothing happens.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        timer: Timer,
        sched: &mut dyn Scheduler,
        view: &mut dyn ChatView,
    ) -> bool {
        match timer {
            Timer::ThinkingIdle if self.idle_timer == Some(handle) => {
                self.idle_timer = None;
                self.mark_inactive(sched, view);
                true
            }
            Timer::ThinkingTick if self.tick_timer == Some(handle) => {
                self.state.elapsed_secs += 1;
                self.tick_timer = Some(sched.schedule(self.tick, Timer::ThinkingTick));
                view.thinking_changed(self.state);
                true
            }
            _ => false,
        }
    }
}
