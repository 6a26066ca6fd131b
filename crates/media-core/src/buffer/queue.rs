//! Bounded drop-oldest queue
//!
//! Producers never block: pushing into a full queue evicts the oldest
//! element. One logical consumer either polls with [`try_pop`] from a
//! real-time thread or awaits [`pop`] from a task.
//!
//! [`try_pop`]: DropOldestQueue::try_pop
//! [`pop`]: DropOldestQueue::pop

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct DropOldestQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    dropped: AtomicU64,
    unreported: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl<T> DropOldestQueue<T> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            dropped: AtomicU64::new(0),
            unreported: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Enqueue `item`. Returns whatever did not stay queued: the evicted
    /// oldest element on overflow, or `item` itself once the queue is closed.
    pub fn push(&self, item: T) -> Option<T> {
        if self.is_closed() {
            return Some(item);
        }
        let evicted = {
            let mut items = self.items.lock();
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.unreported.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        evicted
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Wait for the next element. Returns `None` once `cancel` fires, or
    /// once the queue is closed and drained.
    pub async fn pop(&self, cancel: &CancellationToken) -> Option<T> {
        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if self.is_closed() || cancel.is_cancelled() {
                return None;
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // between try_pop and here is not lost.
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    /// Discard everything currently queued
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let count = items.len();
        items.clear();
        count
    }

    /// Refuse further pushes and wake the consumer.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Total elements evicted by overflow
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Elements evicted since the previous call, for periodic reporting
    pub fn take_dropped(&self) -> u64 {
        self.unreported.swap(0, Ordering::Relaxed)
    }
}
