//! Labeled timer registry
//!
//! Every presentation wait is a named delay that can be cancelled by label
//! ("gamble-offer", "free-spins", ...) or all at once on teardown. A
//! cancelled delay resolves to [`TimerCancelled`] instead of hanging.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::TimerCancelled;

/// Label for reel-spin waits
pub const SPIN_TIMER: &str = "spin";
/// Label for cascade step waits
pub const CASCADE_TIMER: &str = "cascade";
/// Label for waits between free spins
pub const FREE_SPINS_TIMER: &str = "free-spins";
/// Label for the gamble auto-collect countdown
pub const GAMBLE_OFFER_TIMER: &str = "gamble-offer";
/// Label for waits between autoplay spins
pub const AUTOPLAY_TIMER: &str = "autoplay";

struct PendingTimer {
    label: String,
    cancel: oneshot::Sender<()>,
}

/// Tracks in-flight delays so they can be cancelled
#[derive(Default)]
pub struct TimerRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingTimer>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `duration` unless cancelled first. Zero durations resolve
    /// immediately without registering.
    pub async fn delay(&self, label: &str, duration: Duration) -> Result<(), TimerCancelled> {
        if duration.is_zero() {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().insert(
            id,
            PendingTimer {
                label: label.to_string(),
                cancel: tx,
            },
        );
        let _registration = Registration { registry: self, id };

        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = rx => Err(TimerCancelled { label: label.to_string() }),
        }
    }

    /// Cancel every pending delay with this label. Returns how many were cancelled.
    pub fn cancel(&self, label: &str) -> usize {
        let mut pending = self.pending.lock();
        let ids: Vec<u64> = pending
            .iter()
            .filter(|(_, t)| t.label == label)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(timer) = pending.remove(id) {
                let _ = timer.cancel.send(());
            }
        }
        if !ids.is_empty() {
            log::debug!("[Timers] cancelled {} '{}' timer(s)", ids.len(), label);
        }
        ids.len()
    }

    /// Cancel everything (teardown)
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingTimer> = self.pending.lock().drain().map(|(_, t)| t).collect();
        let count = drained.len();
        for timer in drained {
            let _ = timer.cancel.send(());
        }
        if count > 0 {
            log::debug!("[Timers] cancelled all ({count})");
        }
        count
    }

    /// Number of in-flight delays
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of in-flight delays with this label
    pub fn pending_with(&self, label: &str) -> usize {
        self.pending.lock().values().filter(|t| t.label == label).count()
    }
}

/// Removes the registry entry when the delay future finishes or is dropped
struct Registration<'a> {
    registry: &'a TimerRegistry,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.pending.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_zero_delay_is_immediate() {
        let timers = TimerRegistry::new();
        timers.delay(SPIN_TIMER, Duration::ZERO).await.unwrap();
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_elapses() {
        let timers = TimerRegistry::new();
        timers.delay(SPIN_TIMER, Duration::from_millis(250)).await.unwrap();
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_by_label() {
        let timers = Arc::new(TimerRegistry::new());

        let waiting = {
            let timers = Arc::clone(&timers);
            tokio::spawn(async move {
                timers
                    .delay(GAMBLE_OFFER_TIMER, Duration::from_secs(10))
                    .await
            })
        };
        let other = {
            let timers = Arc::clone(&timers);
            tokio::spawn(async move { timers.delay(SPIN_TIMER, Duration::from_secs(1)).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(timers.pending_with(GAMBLE_OFFER_TIMER), 1);

        assert_eq!(timers.cancel(GAMBLE_OFFER_TIMER), 1);
        let result = waiting.await.unwrap();
        assert_eq!(
            result,
            Err(TimerCancelled {
                label: GAMBLE_OFFER_TIMER.to_string()
            })
        );

        assert!(other.await.unwrap().is_ok());
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let timers = Arc::new(TimerRegistry::new());
        let handles: Vec<_> = [FREE_SPINS_TIMER, CASCADE_TIMER, AUTOPLAY_TIMER]
            .into_iter()
            .map(|label| {
                let timers = Arc::clone(&timers);
                tokio::spawn(async move { timers.delay(label, Duration::from_secs(60)).await })
            })
            .collect();
        tokio::task::yield_now().await;

        assert_eq!(timers.cancel_all(), 3);
        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
    }
}
