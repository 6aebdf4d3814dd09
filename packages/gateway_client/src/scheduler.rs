//! Cancellable one-shot timers.
//!
//! Components never sleep themselves. They ask a [`Scheduler`] for a timer,
//! keep the returned handle, and are called back with that handle when it
//! fires. Cancelling forgets the handle, and owners compare any fired handle
//! against the one they hold, so a cancelled timer never runs its callback
//! even if its fire was already queued.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Identifies one scheduled timer. Never reused within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub(crate) u64);

impl std::fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// What a timer is for. Used to route the fire back to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Delay before the connection manager retries a dropped socket.
    Reconnect,
    /// Inactivity window after the last stream chunk.
    ThinkingIdle,
    /// One-second tick of the busy indicator's elapsed counter.
    ThinkingTick,
}

pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, timer: Timer) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

/// Timers backed by spawned `tokio::time::sleep` tasks.
///
/// Fires arrive on the receiver returned by [`TokioScheduler::new`]. The event
/// loop must call [`TokioScheduler::complete`] before dispatching a fire;
/// it returns `false` for handles that were cancelled in the meantime.
pub struct TokioScheduler {
    fired_tx: mpsc::UnboundedSender<(TimerHandle, Timer)>,
    next_id: u64,
    pending: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(TimerHandle, Timer)>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            fired_tx,
            next_id: 1,
            pending: HashMap::new(),
        };
        (scheduler, fired_rx)
    }

    /// Retire a fired handle. `false` means it was cancelled and must be ignored.
    pub fn complete(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(&handle).is_some()
    }

    /// Number of timers scheduled and neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, timer: Timer) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;

        let tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send((handle, timer));
        });
        trace!(%handle, ?timer, ?delay, "timer scheduled");
        self.pending.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.pending.remove(&handle) {
            task.abort();
            trace!(%handle, "timer cancelled");
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn fires_after_delay() {
        let (mut sched, mut rx) = TokioScheduler::new();
        let h = sched.schedule(Duration::from_millis(10), Timer::Reconnect);
        assert_eq!(sched.pending(), 1);

        let (fired, timer) = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timer should fire")
            .expect("channel open");
        assert_eq!(fired, h);
        assert_eq!(timer, Timer::Reconnect);
        assert!(sched.complete(fired));
        assert_eq!(sched.pending(), 0);
    }

    #[tokio::test]
    async fn cancelled_timer_never_fires() {
        let (mut sched, mut rx) = TokioScheduler::new();
        let h = sched.schedule(Duration::from_millis(20), Timer::ThinkingIdle);
        sched.cancel(h);
        assert_eq!(sched.pending(), 0);

        let res = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(res.is_err(), "cancelled timer delivered a fire");
    }

    #[tokio::test]
    async fn fire_racing_cancel_is_rejected() {
        let (mut sched, mut rx) = TokioScheduler::new();
        let h = sched.schedule(Duration::ZERO, Timer::ThinkingTick);
        let (fired, _) = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        // Cancelled after the fire was queued but before it was dispatched.
        sched.cancel(h);
        assert!(!sched.complete(fired));
    }

    #[tokio::test]
    async fn handles_are_unique() {
        let (mut sched, _rx) = TokioScheduler::new();
        let a = sched.schedule(Duration::from_secs(60), Timer::Reconnect);
        let b = sched.schedule(Duration::from_secs(60), Timer::Reconnect);
        assert_ne!(a, b);
        assert_eq!(sched.pending(), 2);
    }
}
