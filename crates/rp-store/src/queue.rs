use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// FIFO queue of values with blocking consumers.
///
/// A push hands its value to the earliest live waiter, bypassing the stored
/// sequence; only when no consumer is blocked does the value land in the
/// store. A pop on an empty queue registers a waiter (a single-use oneshot
/// slot) and suspends until delivery or its deadline.
///
/// The registry mutex arbitrates the delivery/timeout race. Invariant: a
/// waiter is in the registry exactly until it is claimed, and a push that
/// claims one completes the hand-off before releasing the lock. So a
/// timing-out pop that still finds itself registered can remove itself and
/// declare the timeout final; one that finds itself gone knows the value is
/// already in its slot.
#[derive(Debug, Default)]
pub struct BlockingQueue {
    state: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<String>,
    waiters: VecDeque<Waiter>,
    next_waiter_id: u64,
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    slot: oneshot::Sender<String>,
}

impl BlockingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values. Consumers blocked in [`pop`](Self::pop) are
    /// not counted; values handed to them never enter the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Append a value, or hand it directly to the earliest blocked
    /// consumer. Never blocks. Returns the stored length afterwards.
    pub fn push(&self, value: String) -> usize {
        let mut state = self.state.lock();
        let mut value = value;
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.slot.send(value) {
                Ok(()) => {
                    trace!(waiter = waiter.id, "handed value to blocked consumer");
                    return state.items.len();
                }
                // Slot receiver already dropped (consumer cancelled
                // without deregistering yet); the next waiter gets it.
                Err(returned) => value = returned,
            }
        }
        state.items.push_back(value);
        state.items.len()
    }

    /// Remove and return the head of the stored sequence, if any.
    pub fn try_pop(&self) -> Option<String> {
        self.state.lock().items.pop_front()
    }

    /// Stored values within the index range [start, stop], both inclusive;
    /// negative indexes count from the tail.
    #[must_use]
    pub fn range(&self, start: i64, stop: i64) -> Vec<String> {
        let state = self.state.lock();
        let len = state.items.len() as i64;
        let s = normalize_index(start, len);
        let e = normalize_index(stop, len);
        if s > e || s >= state.items.len() {
            return Vec::new();
        }
        let take = e - s + 1;
        state.items.iter().skip(s).take(take).cloned().collect()
    }

    /// Remove and return the head value, blocking until one is available.
    ///
    /// `timeout` of `None` blocks indefinitely. With a deadline, returns
    /// `None` once it elapses — no earlier — unless a concurrent push
    /// completes the hand-off first; the race resolves to exactly one
    /// outcome. Waiters are served in registration order. Dropping the
    /// returned future deregisters the waiter; a value that raced into its
    /// slot is re-offered, never lost.
    pub async fn pop(&self, timeout: Option<Duration>) -> Option<String> {
        let (id, rx) = {
            let mut state = self.state.lock();
            if let Some(value) = state.items.pop_front() {
                return Some(value);
            }
            let (tx, rx) = oneshot::channel();
            let id = state.next_waiter_id;
            state.next_waiter_id += 1;
            state.waiters.push_back(Waiter { id, slot: tx });
            debug!(waiter = id, "consumer blocked waiting for a value");
            (id, rx)
        };
        let mut guard = WaiterGuard {
            queue: self,
            id,
            slot: rx,
            armed: true,
        };

        let Some(limit) = timeout else {
            let value = (&mut guard.slot).await.ok();
            guard.armed = false;
            return value;
        };

        match tokio::time::timeout(limit, &mut guard.slot).await {
            Ok(delivery) => {
                guard.armed = false;
                delivery.ok()
            }
            Err(_elapsed) => {
                let was_registered = self.remove_waiter(id);
                guard.armed = false;
                if was_registered {
                    debug!(waiter = id, "pop timed out");
                    None
                } else {
                    // A push claimed this waiter before the deadline landed;
                    // the hand-off wins and the value is in the slot.
                    guard.slot.try_recv().ok()
                }
            }
        }
    }

    fn remove_waiter(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        let before = state.waiters.len();
        state.waiters.retain(|w| w.id != id);
        state.waiters.len() != before
    }

    /// Re-offer a value whose consumer cancelled after the hand-off: the
    /// earliest live waiter gets it, else it returns to the head of the
    /// store (it was the earliest-produced undelivered value).
    fn requeue_front(&self, value: String) {
        let mut state = self.state.lock();
        let mut value = value;
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.slot.send(value) {
                Ok(()) => {
                    trace!(waiter = waiter.id, "re-offered value to blocked consumer");
                    return;
                }
                Err(returned) => value = returned,
            }
        }
        state.items.push_front(value);
    }
}

/// Deregisters a pending waiter when the owning pop future is dropped.
struct WaiterGuard<'a> {
    queue: &'a BlockingQueue,
    id: u64,
    slot: oneshot::Receiver<String>,
    armed: bool,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let was_registered = self.queue.remove_waiter(self.id);
        if !was_registered {
            // Cancelled and claimed at once: the push already completed the
            // hand-off, so drain the slot and pass the value on.
            if let Ok(value) = self.slot.try_recv() {
                self.queue.requeue_front(value);
            }
        }
        debug!(waiter = self.id, "pop cancelled");
    }
}

fn normalize_index(index: i64, len: i64) -> usize {
    if index < 0 {
        let adjusted = len.saturating_add(index);
        if adjusted < 0 { 0 } else { adjusted as usize }
    } else {
        index as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_try_pop_is_fifo() {
        let queue = BlockingQueue::new();
        queue.push("v1".to_owned());
        queue.push("v2".to_owned());
        queue.push("v3".to_owned());
        assert_eq!(queue.try_pop(), Some("v1".to_owned()));
        assert_eq!(queue.try_pop(), Some("v2".to_owned()));
        assert_eq!(queue.try_pop(), Some("v3".to_owned()));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn push_reports_stored_length() {
        let queue = BlockingQueue::new();
        assert_eq!(queue.push("a".to_owned()), 1);
        assert_eq!(queue.push("b".to_owned()), 2);
        assert_eq!(queue.len(), 2);
        assert!(!queue.is_empty());
    }

    #[test]
    fn range_follows_index_conventions() {
        let queue = BlockingQueue::new();
        for v in ["a", "b", "c", "d"] {
            queue.push(v.to_owned());
        }
        assert_eq!(queue.range(0, -1), vec!["a", "b", "c", "d"]);
        assert_eq!(queue.range(1, 2), vec!["b", "c"]);
        assert_eq!(queue.range(-2, -1), vec!["c", "d"]);
        assert!(queue.range(3, 1).is_empty());
    }

    #[tokio::test]
    async fn pop_takes_stored_value_without_blocking() {
        let queue = BlockingQueue::new();
        queue.push("ready".to_owned());
        assert_eq!(queue.pop(None).await, Some("ready".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn pop_times_out_no_earlier_than_deadline() {
        let queue = BlockingQueue::new();
        let started = tokio::time::Instant::now();
        let popped = queue.pop(Some(Duration::from_secs(10))).await;
        assert_eq!(popped, None);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn push_wakes_earliest_waiter() {
        let queue = std::sync::Arc::new(BlockingQueue::new());
        let first = tokio::spawn({
            let queue = queue.clone();
            async move { queue.pop(Some(Duration::from_secs(10))).await }
        });
        // Let the first consumer register before the second.
        tokio::task::yield_now().await;
        let second = tokio::spawn({
            let queue = queue.clone();
            async move { queue.pop(Some(Duration::from_secs(10))).await }
        });
        tokio::task::yield_now().await;

        queue.push("strawberry".to_owned());
        assert_eq!(first.await.unwrap(), Some("strawberry".to_owned()));
        assert_eq!(second.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_waiter_does_not_consume_a_value() {
        let queue = std::sync::Arc::new(BlockingQueue::new());
        let mut doomed = Box::pin(queue.pop(None));
        // Register the doomed waiter, then drop it mid-wait.
        assert!(
            tokio::time::timeout(Duration::from_millis(1), &mut doomed)
                .await
                .is_err()
        );
        drop(doomed);

        let survivor = tokio::spawn({
            let queue = queue.clone();
            async move { queue.pop(Some(Duration::from_secs(5))).await }
        });
        tokio::task::yield_now().await;
        queue.push("kept".to_owned());
        assert_eq!(survivor.await.unwrap(), Some("kept".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn value_stored_when_no_waiter_survives() {
        let queue = std::sync::Arc::new(BlockingQueue::new());
        let mut doomed = Box::pin(queue.pop(None));
        assert!(
            tokio::time::timeout(Duration::from_millis(1), &mut doomed)
                .await
                .is_err()
        );
        drop(doomed);

        queue.push("orphaned".to_owned());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_pop(), Some("orphaned".to_owned()));
    }
}
