// Per-turn countdown.
//
// One timer instance serves one veto view. The remaining seconds are
// published through a watch channel for rendering; expiry is delivered at
// most once per run as a message, so the consumer decides whether to pass
// the turn or merely show that time ran out. Starting while a countdown is
// running cancels the old run first; two countdowns never tick at once.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Ban-phase countdown length used by the local demo flow, in seconds.
pub const DEFAULT_BAN_SECONDS: u32 = 20;

/// Emitted once when a countdown reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnExpired;

/// Owned countdown handle. All scheduling state lives inside; there is no
/// ambient timer to leak when a view goes away.
pub struct TurnTimer {
    duration_secs: u32,
    remaining_tx: watch::Sender<u32>,
    expired_tx: mpsc::Sender<TurnExpired>,
    task: Option<JoinHandle<()>>,
}

impl TurnTimer {
    /// Create a timer and the receiver its expirations arrive on. A
    /// duration of zero disables the countdown entirely.
    pub fn new(duration_secs: u32) -> (Self, mpsc::Receiver<TurnExpired>) {
        let (remaining_tx, _) = watch::channel(duration_secs);
        let (expired_tx, expired_rx) = mpsc::channel(4);
        (
            Self {
                duration_secs,
                remaining_tx,
                expired_tx,
                task: None,
            },
            expired_rx,
        )
    }

    /// Subscribe to the displayed remaining seconds.
    pub fn remaining(&self) -> watch::Receiver<u32> {
        self.remaining_tx.subscribe()
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Whether a countdown is currently ticking.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Begin a fresh countdown, cancelling any run already in flight. The
    /// display snaps to the full duration immediately; the first decrement
    /// lands one second later. On reaching zero the display snaps back to
    /// full and exactly one [`TurnExpired`] is sent, then the run ends.
    pub fn start(&mut self) {
        self.cancel_task();
        if self.duration_secs == 0 {
            debug!("turn timer disabled, not starting");
            return;
        }

        let full = self.duration_secs;
        let _ = self.remaining_tx.send(full);
        let remaining_tx = self.remaining_tx.clone();
        let expired_tx = self.expired_tx.clone();
        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            let mut remaining = full;
            loop {
                tick.tick().await;
                remaining -= 1;
                if remaining == 0 {
                    let _ = remaining_tx.send(full);
                    let _ = expired_tx.send(TurnExpired).await;
                    return;
                }
                let _ = remaining_tx.send(remaining);
            }
        }));
    }

    /// Cancel the current run, if any. The display keeps its last value.
    /// Safe to call repeatedly or when nothing is running.
    pub fn stop(&mut self) {
        self.cancel_task();
    }

    /// Cancel the current run and snap the display back to the full
    /// duration.
    pub fn reset(&mut self) {
        self.cancel_task();
        let _ = self.remaining_tx.send(self.duration_secs);
    }

    /// Change the countdown length. Cancels any running countdown and
    /// resets the display to the new duration; takes effect on the next
    /// [`start`](Self::start).
    pub fn set_duration(&mut self, duration_secs: u32) {
        self.cancel_task();
        self.duration_secs = duration_secs;
        let _ = self.remaining_tx.send(duration_secs);
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.cancel_task();
    }
}
