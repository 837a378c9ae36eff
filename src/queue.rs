//! Bounded ingress queue with batched take
//!
//! [`IngressQueue`] is a multi-producer, single-consumer collection whose
//! consumer side takes *batches*: [`IngressQueue::take_batch`] waits for the
//! first item, then keeps collecting until either a count threshold is hit or
//! a delay window (opened at the first observed item) elapses. Sealing the
//! queue makes pending and future `add` calls fail and makes in-flight takes
//! return promptly with whatever they hold.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Error returned by [`IngressQueue::add`] when the queue has been sealed.
/// The rejected item is handed back to the caller.
#[derive(Debug)]
pub struct Sealed<T>(pub T);

/// Error returned by [`IngressQueue::take_batch`] when the cancel token
/// trips before any item was claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    sealed: bool,
}

/// Bounded multi-producer queue with time+size batched take
#[derive(Debug)]
pub struct IngressQueue<T> {
    state: Mutex<QueueState<T>>,
    capacity: Option<usize>,
    item_ready: Notify,
    space_ready: Notify,
}

impl<T> IngressQueue<T> {
    /// Create a queue holding at most `capacity` items; `None` means unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                sealed: false,
            }),
            capacity,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
        }
    }

    /// Enqueue an item, suspending while the queue is at capacity.
    ///
    /// Fails with [`Sealed`] once the queue is sealed, including while the
    /// caller is suspended waiting for space.
    pub async fn add(&self, item: T) -> Result<(), Sealed<T>> {
        loop {
            let space = self.space_ready.notified();
            tokio::pin!(space);
            // Register before the check so a seal or pop between the check
            // and the await cannot be missed.
            space.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.sealed {
                    return Err(Sealed(item));
                }
                let full = self.capacity.is_some_and(|c| state.items.len() >= c);
                if !full {
                    state.items.push_back(item);
                    drop(state);
                    self.item_ready.notify_one();
                    return Ok(());
                }
            }
            space.await;
        }
    }

    /// Collect a batch of up to `max_count` items.
    ///
    /// Returns when `max_count` items have been claimed, when `max_delay`
    /// has elapsed since the first item was observed by this call, or when
    /// the queue is sealed (possibly with an empty batch). If `cancel` trips
    /// while the call is empty-handed it fails with [`Cancelled`]; items
    /// already claimed by this call are returned rather than dropped.
    pub async fn take_batch(
        &self,
        max_count: usize,
        max_delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, Cancelled> {
        let mut batch = Vec::new();
        let mut deadline: Option<Instant> = None;

        loop {
            let ready = self.item_ready.notified();
            tokio::pin!(ready);
            ready.as_mut().enable();

            let sealed = {
                let mut state = self.state.lock();
                let mut claimed = false;
                while batch.len() < max_count {
                    match state.items.pop_front() {
                        Some(item) => {
                            batch.push(item);
                            claimed = true;
                        }
                        None => break,
                    }
                }
                let sealed = state.sealed;
                drop(state);
                if claimed {
                    self.space_ready.notify_waiters();
                }
                sealed
            };

            if batch.len() >= max_count || sealed {
                return Ok(batch);
            }

            // The delay window opens at the first observed item.
            if deadline.is_none() && !batch.is_empty() {
                deadline = Some(Instant::now() + max_delay);
            }

            match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = &mut ready => {}
                        _ = tokio::time::sleep_until(at) => return Ok(batch),
                        _ = cancel.cancelled() => {
                            return if batch.is_empty() { Err(Cancelled) } else { Ok(batch) };
                        }
                    }
                }
                None => {
                    tokio::select! {
                        _ = &mut ready => {}
                        _ = cancel.cancelled() => return Err(Cancelled),
                    }
                }
            }
        }
    }

    /// Remove and return everything currently queued, without waiting
    pub fn drain(&self) -> Vec<T> {
        let drained: Vec<T> = {
            let mut state = self.state.lock();
            state.items.drain(..).collect()
        };
        if !drained.is_empty() {
            self.space_ready.notify_waiters();
        }
        drained
    }

    /// Stop accepting items and wake every waiter
    pub fn seal(&self) {
        {
            self.state.lock().sealed = true;
        }
        self.item_ready.notify_waiters();
        self.space_ready.notify_waiters();
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the queue has been sealed
    pub fn is_sealed(&self) -> bool {
        self.state.lock().sealed
    }

    /// Whether the queue is sealed and empty
    pub fn is_completed(&self) -> bool {
        let state = self.state.lock();
        state.sealed && state.items.is_empty()
    }
}
