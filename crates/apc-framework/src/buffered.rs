//! # Buffered Transport
//!
//! A [`BufferedEventsQueue`] has two halves:
//!
//! - the **inbox**, an unbounded multi-producer channel of event batches.
//!   Any thread may append; only the single dispatching worker drains it.
//!   The channel's send/receive pair is the happens-before edge between the
//!   producing thread and the worker.
//! - the **outbox**, where events sent *during* a dispatch cycle are grouped
//!   per destination and handed over in one batch by
//!   [`send_pending_events`](BufferedEventsQueue::send_pending_events).
//!
//! Neither half is bounded. Growth is the accepted answer to back-pressure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Default capacity of a freshly opened outbox batch.
pub const DEFAULT_INITIAL_BUFFER_CAPACITY: usize = 10;

/// Receiver side of buffered transport.
pub trait BufferedEventsDestination<E>: Send + Sync {
    /// Appends a batch of events, preserving their order.
    fn put_buffered_events(&self, events: Vec<E>);
}

struct PendingBatch<E> {
    destination: Arc<dyn BufferedEventsDestination<E>>,
    events: Vec<E>,
}

fn same_destination<E>(
    a: &Arc<dyn BufferedEventsDestination<E>>,
    b: &Arc<dyn BufferedEventsDestination<E>>,
) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Ordered, growable event buffer feeding exactly one consumer.
pub struct BufferedEventsQueue<E> {
    sender: Sender<Vec<E>>,
    receiver: Receiver<Vec<E>>,
    // Only touched by the dispatching worker; the lock is never contended.
    outbox: Mutex<Vec<PendingBatch<E>>>,
    initial_capacity: AtomicUsize,
}

impl<E> BufferedEventsQueue<E> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            outbox: Mutex::new(Vec::new()),
            initial_capacity: AtomicUsize::new(DEFAULT_INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Sizing hint for outbox batches opened after this call.
    pub fn set_initial_buffer_capacity(&self, capacity: usize) {
        self.initial_capacity.store(capacity, Ordering::Relaxed);
    }

    pub fn initial_buffer_capacity(&self) -> usize {
        self.initial_capacity.load(Ordering::Relaxed)
    }

    /// Appends a batch to the inbox. Empty batches are ignored.
    pub fn put(&self, events: Vec<E>) {
        if events.is_empty() {
            return;
        }
        // The receiver lives as long as `self`, so the channel cannot be disconnected.
        let _ = self.sender.send(events);
    }

    /// Buffers `event` in the outbox until the next flush.
    pub fn send(&self, destination: Arc<dyn BufferedEventsDestination<E>>, event: E) {
        let mut outbox = self.outbox.lock();
        if let Some(batch) = outbox
            .iter_mut()
            .find(|b| same_destination(&b.destination, &destination))
        {
            batch.events.push(event);
            return;
        }
        let mut events = Vec::with_capacity(self.initial_buffer_capacity().max(1));
        events.push(event);
        outbox.push(PendingBatch {
            destination,
            events,
        });
    }

    /// Hands every outbox batch to its destination. Returns the number of
    /// events flushed.
    pub fn send_pending_events(&self) -> usize {
        let pending = std::mem::take(&mut *self.outbox.lock());
        let mut flushed = 0;
        for batch in pending {
            flushed += batch.events.len();
            batch.destination.put_buffered_events(batch.events);
        }
        flushed
    }

    pub fn has_pending_events(&self) -> bool {
        !self.outbox.lock().is_empty()
    }

    /// Drains the inbox in arrival order until it is empty. Returns the
    /// number of events handed to `process`.
    pub fn dispatch_events<F>(&self, mut process: F) -> usize
    where
        F: FnMut(E),
    {
        let mut count = 0;
        while let Ok(batch) = self.receiver.try_recv() {
            for event in batch {
                count += 1;
                process(event);
            }
        }
        count
    }

    /// True when the inbox holds no undelivered batches.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<E> Default for BufferedEventsQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collector {
        batches: Mutex<Vec<Vec<u32>>>,
    }

    impl BufferedEventsDestination<u32> for Collector {
        fn put_buffered_events(&self, events: Vec<u32>) {
            self.batches.lock().push(events);
        }
    }

    #[test]
    fn test_inbox_drains_in_arrival_order() {
        let queue = BufferedEventsQueue::new();
        queue.put(vec![1, 2]);
        queue.put(vec![]);
        queue.put(vec![3]);

        let mut seen = Vec::new();
        let count = queue.dispatch_events(|e| seen.push(e));

        assert_eq!(count, 3);
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_outbox_groups_per_destination() {
        let queue = BufferedEventsQueue::new();
        let a = Arc::new(Collector::default());
        let b = Arc::new(Collector::default());
        let a_dyn: Arc<dyn BufferedEventsDestination<u32>> = a.clone();
        let b_dyn: Arc<dyn BufferedEventsDestination<u32>> = b.clone();

        queue.send(a_dyn.clone(), 1);
        queue.send(b_dyn.clone(), 10);
        queue.send(a_dyn, 2);
        queue.send(b_dyn, 20);
        assert!(queue.has_pending_events());

        assert_eq!(queue.send_pending_events(), 4);
        assert!(!queue.has_pending_events());
        assert_eq!(*a.batches.lock(), vec![vec![1, 2]]);
        assert_eq!(*b.batches.lock(), vec![vec![10, 20]]);
    }

    #[test]
    fn test_capacity_hint_applies_to_new_batches() {
        let queue: BufferedEventsQueue<u32> = BufferedEventsQueue::new();
        assert_eq!(queue.initial_buffer_capacity(), DEFAULT_INITIAL_BUFFER_CAPACITY);
        queue.set_initial_buffer_capacity(64);
        assert_eq!(queue.initial_buffer_capacity(), 64);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(BufferedEventsQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        queue.put(vec![t * 1000 + i]);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut seen = Vec::new();
        queue.dispatch_events(|e| seen.push(e));
        assert_eq!(seen.len(), 1000);
        for t in 0..4 {
            let own: Vec<_> = seen.iter().filter(|e| **e / 1000 == t).copied().collect();
            let mut sorted = own.clone();
            sorted.sort_unstable();
            assert_eq!(own, sorted, "producer {t} reordered");
        }
    }
}
