//! Bounded priority work queue
//!
//! The queue holds at most `capacity` items. Producers block in
//! [`WorkQueue::enqueue`] while it is full, and consumers block in
//! [`WorkQueue::dequeue`] while it is empty. Items carrying a priority label
//! are handed out in ascending label order; items without one, and items with
//! equal labels, are handed out in insertion order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// A unit of work for a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<T> {
    /// Resume key: once an item with this key completes, a later run skips it
    pub key: String,
    /// Optional ordering label (listing buckets use their bucket name)
    pub priority: Option<String>,
    pub payload: T,
}

impl<T> WorkItem<T> {
    pub fn new(key: impl Into<String>, payload: T) -> Self {
        Self {
            key: key.into(),
            priority: None,
            payload,
        }
    }

    pub fn with_priority(key: impl Into<String>, priority: impl Into<String>, payload: T) -> Self {
        Self {
            key: key.into(),
            priority: Some(priority.into()),
            payload,
        }
    }
}

/// Returned by [`WorkQueue::enqueue`] once the queue is closed
#[derive(Debug)]
pub struct QueueClosed<T>(pub WorkItem<T>);

struct Queued<T> {
    item: WorkItem<T>,
    seq: u64,
}

impl<T> Queued<T> {
    fn sort_key(&self) -> (bool, Option<&str>, u64) {
        (
            self.item.priority.is_none(),
            self.item.priority.as_deref(),
            self.seq,
        )
    }
}

impl<T> Ord for Queued<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse comparison so the smallest label and oldest item come first
        other.sort_key().cmp(&self.sort_key())
    }
}

impl<T> PartialOrd for Queued<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Queued<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Queued<T> {}

struct QueueState<T> {
    heap: BinaryHeap<Queued<T>>,
    next_seq: u64,
    closed: bool,
}

/// Bounded, closable, multi-producer multi-consumer queue
pub struct WorkQueue<T> {
    capacity: usize,
    state: Mutex<QueueState<T>>,
    item_ready: Notify,
    slot_free: Notify,
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> WorkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            item_ready: Notify::new(),
            slot_free: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Adds an item, waiting while the queue is full
    ///
    /// Cancel-safe: dropping the future before it completes leaves the queue
    /// unchanged.
    pub async fn enqueue(&self, item: WorkItem<T>) -> Result<(), QueueClosed<T>> {
        loop {
            let notified = self.slot_free.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return Err(QueueClosed(item));
                }
                if state.heap.len() < self.capacity {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    state.heap.push(Queued { item, seq });
                    drop(state);
                    self.item_ready.notify_one();
                    return Ok(());
                }
            }

            notified.await;
        }
    }

    /// Removes the next item, waiting while the queue is empty
    ///
    /// Returns `None` once the queue is closed and empty. Cancel-safe.
    pub async fn dequeue(&self) -> Option<WorkItem<T>> {
        loop {
            let notified = self.item_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(queued) = state.heap.pop() {
                    let more = !state.heap.is_empty();
                    drop(state);
                    self.slot_free.notify_one();
                    if more {
                        self.item_ready.notify_one();
                    }
                    return Some(queued.item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stops accepting items; consumers drain what is left, then see `None`
    pub fn close(&self) {
        self.lock().closed = true;
        self.item_ready.notify_waiters();
        self.slot_free.notify_waiters();
    }
}
