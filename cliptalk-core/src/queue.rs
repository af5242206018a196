//! Bounded FIFO that reports its occupancy
//!
//! Every successful enqueue and every acknowledgement pushes a
//! [`QueueDepthReport`] to the shared [`ObserverSlot`]. Completion is only
//! possible through [`AckToken::ack`], so a completion that skips the report
//! cannot be written.

use crate::observer::ObserverSlot;
use crate::types::QueueDepthReport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error};

struct QueueState<T> {
    items: VecDeque<T>,
    /// Enqueued and not yet acknowledged (waiting + in flight)
    unfinished: usize,
}

struct Shared<T> {
    name: String,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    not_empty: Notify,
    not_full: Notify,
    observer: Arc<ObserverSlot>,
}

impl<T> Shared<T> {
    fn report(&self, size: usize) {
        let report = QueueDepthReport {
            queue: self.name.clone(),
            size,
            capacity: self.capacity,
        };
        debug!("Queue depth {}", report);
        metrics::gauge!("cliptalk_queue_depth", "queue" => self.name.clone()).set(size as f64);
        self.observer.notify(&report);
    }

    fn release_slot(&self) -> usize {
        let size = {
            let mut state = self.state.lock();
            state.unfinished = state.unfinished.saturating_sub(1);
            state.unfinished
        };
        self.not_full.notify_waiters();
        size
    }
}

/// Bounded multi-stage pipeline queue with depth reporting.
///
/// `capacity` bounds the items that were enqueued and not yet acknowledged;
/// 0 means unbounded.
pub struct InstrumentedQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for InstrumentedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> InstrumentedQueue<T> {
    pub fn new(name: impl Into<String>, capacity: usize, observer: Arc<ObserverSlot>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                capacity,
                state: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    unfinished: 0,
                }),
                not_empty: Notify::new(),
                not_full: Notify::new(),
                observer,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items enqueued and not yet acknowledged; this is the reported size
    pub fn unfinished(&self) -> usize {
        self.shared.state.lock().unfinished
    }

    pub fn depth_report(&self) -> QueueDepthReport {
        QueueDepthReport {
            queue: self.shared.name.clone(),
            size: self.unfinished(),
            capacity: self.shared.capacity,
        }
    }

    /// Append an item, suspending while the queue is full
    pub async fn enqueue(&self, item: T) {
        loop {
            let notified = self.shared.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.shared.state.lock();
                if self.shared.capacity == 0 || state.unfinished < self.shared.capacity {
                    state.items.push_back(item);
                    state.unfinished += 1;
                    let size = state.unfinished;
                    drop(state);

                    self.shared.not_empty.notify_waiters();
                    self.shared.report(size);
                    return;
                }
            }

            notified.await;
        }
    }

    /// Take the oldest item, suspending while the queue is empty.
    ///
    /// Cancelling the returned future before it completes leaves the queue untouched.
    pub async fn dequeue(&self) -> (T, AckToken<T>) {
        loop {
            let notified = self.shared.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.shared.state.lock().items.pop_front() {
                let token = AckToken {
                    shared: self.shared.clone(),
                    settled: false,
                };
                return (item, token);
            }

            notified.await;
        }
    }
}

/// Obligation to acknowledge one dequeued item
#[must_use = "a dequeued item must be acknowledged with `ack()`"]
pub struct AckToken<T> {
    shared: Arc<Shared<T>>,
    settled: bool,
}

impl<T> AckToken<T> {
    /// Mark the item complete and report the new depth
    pub fn ack(mut self) {
        self.settled = true;
        let size = self.shared.release_slot();
        self.shared.report(size);
    }

    /// Put an item that could not be handed on back at the head of the queue.
    ///
    /// The item keeps its slot and stays unacknowledged.
    pub fn requeue(mut self, item: T) {
        self.settled = true;
        self.shared.state.lock().items.push_front(item);
        self.shared.not_empty.notify_waiters();
    }

    pub fn queue_name(&self) -> &str {
        &self.shared.name
    }
}

impl<T> Drop for AckToken<T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        error!(
            "Item from {} dropped without acknowledgement; releasing its slot",
            self.shared.name
        );
        let size = self.shared.release_slot();
        self.shared.report(size);
        debug_assert!(
            std::thread::panicking(),
            "AckToken for {} dropped without ack() or requeue()",
            self.shared.name
        );
    }
}
