//! Bounded queues between workers
//!
//! All cross-worker data flow goes through these channels. Producers never
//! block: when a queue is full the configured overflow policy decides
//! which record to sacrifice. Consumers block on empty.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Default queue capacity
pub const DEFAULT_CAPACITY: usize = 16;

/// What to sacrifice when a queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Discard the incoming record; a stale telemetry record already
    /// queued is still informative
    DropNewest,
    /// Evict the oldest queued record to make room; right for video
    /// frames where only the latest matters
    DropOldest,
}

/// Producer end of a bounded queue
pub struct Outlet<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
    policy: Overflow,
    label: String,
}

impl<T> Clone for Outlet<T> {
    fn clone(&self) -> Self {
        Outlet {
            tx: self.tx.clone(),
            evict: self.evict.clone(),
            policy: self.policy,
            label: self.label.clone(),
        }
    }
}

/// Create a bounded queue; the receiver is a plain
/// [`crossbeam_channel::Receiver`] so consumers can block, poll, or select.
pub fn bounded<T>(label: &str, capacity: usize, policy: Overflow) -> (Outlet<T>, Receiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (
        Outlet {
            tx,
            evict: rx.clone(),
            policy,
            label: label.to_string(),
        },
        rx,
    )
}

impl<T> Outlet<T> {
    /// Hand a record to the queue, applying the overflow policy when full.
    /// Never blocks.
    pub fn send(&self, item: T) {
        match self.tx.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(item)) => match self.policy {
                Overflow::DropNewest => {
                    log::warn!("queue {}: full, dropping newest record", self.label);
                }
                Overflow::DropOldest => {
                    let _ = self.evict.try_recv();
                    if self.tx.try_send(item).is_err() {
                        log::warn!("queue {}: full, dropping record", self.label);
                    }
                }
            },
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("queue {}: consumer is gone", self.label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_never_exceeded() {
        let (outlet, rx) = bounded("t", 4, Overflow::DropNewest);
        for i in 0..100 {
            outlet.send(i);
            assert!(rx.len() <= 4);
        }
        assert_eq!(rx.len(), 4);
    }

    #[test]
    fn test_drop_newest_keeps_head() {
        let (outlet, rx) = bounded("t", 2, Overflow::DropNewest);
        outlet.send(1);
        outlet.send(2);
        outlet.send(3);
        assert_eq!(rx.recv().unwrap(), 1);
        assert_eq!(rx.recv().unwrap(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_oldest_keeps_tail() {
        let (outlet, rx) = bounded("t", 1, Overflow::DropOldest);
        outlet.send(1);
        outlet.send(2);
        outlet.send(3);
        assert_eq!(rx.recv().unwrap(), 3);
    }

    #[test]
    fn test_send_to_gone_consumer_does_not_panic() {
        let (outlet, rx) = bounded("t", 2, Overflow::DropNewest);
        drop(rx);
        outlet.send(1);
    }
}
