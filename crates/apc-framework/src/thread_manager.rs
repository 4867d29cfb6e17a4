//! # Thread Managers
//!
//! A [`ThreadManager`] is the scheduler capability injected into every
//! [`Mailbox`]. It has one job: once a mailbox reports pending work, run its
//! [`dispatch_events`](Mailbox::dispatch_events) on some thread, now or later,
//! but eventually.
//!
//! | Manager | Threads | Use |
//! |---------|---------|-----|
//! | [`PoolThreadManager`] | fixed pool of named OS threads | default runtime |
//! | [`TokioThreadManager`] | tokio blocking pool | embedding in an async application |
//! | [`ManualThreadManager`](crate::mock::ManualThreadManager) | the test thread | deterministic tests |

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::config::RuntimeConfig;
use crate::error::ActorError;
use crate::mailbox::Mailbox;

/// Supplies worker threads to mailboxes that have pending events.
pub trait ThreadManager: Send + Sync + 'static {
    /// Eventually runs `mailbox.dispatch_events()` on a worker thread.
    fn obtain_thread_for(&self, mailbox: Arc<Mailbox>);

    /// Stops accepting new work. Drain requests made afterwards are dropped.
    fn close(&self);
}

/// A fixed pool of OS threads multiplexed across all mailboxes.
pub struct PoolThreadManager {
    sender: RwLock<Option<Sender<Arc<Mailbox>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl PoolThreadManager {
    /// Starts `threads` workers with the default thread names.
    pub fn new(threads: usize) -> io::Result<Self> {
        let config = RuntimeConfig {
            worker_threads: threads,
            ..RuntimeConfig::default()
        };
        Self::with_config(&config)
    }

    pub fn with_config(config: &RuntimeConfig) -> io::Result<Self> {
        let threads = config.worker_threads.max(1);
        let (sender, receiver) = unbounded::<Arc<Mailbox>>();

        info!(threads, prefix = %config.thread_name_prefix, "Starting worker pool");

        let mut workers = Vec::with_capacity(threads);
        for id in 0..threads {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name_prefix, id))
                .spawn(move || Self::worker_loop(id, receiver))?;
            workers.push(handle);
        }

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
            worker_count: threads,
        })
    }

    fn worker_loop(id: usize, receiver: Receiver<Arc<Mailbox>>) {
        debug!(worker = id, "Worker started");

        // Queued mailboxes are still drained after close; recv fails only once
        // the channel is both disconnected and empty.
        while let Ok(mailbox) = receiver.recv() {
            let result = catch_unwind(AssertUnwindSafe(|| mailbox.dispatch_events()));
            if let Err(panic) = result {
                let error = ActorError::from_panic(panic);
                error!(worker = id, mailbox = %mailbox.id(), error = %error, "Dispatch panicked");
            }
        }

        debug!(worker = id, "Worker stopped");
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}

impl ThreadManager for PoolThreadManager {
    fn obtain_thread_for(&self, mailbox: Arc<Mailbox>) {
        match &*self.sender.read() {
            Some(sender) => {
                if let Err(e) = sender.send(mailbox) {
                    warn!(mailbox = %e.0.id(), "Worker pool disconnected; drain request dropped");
                }
            }
            None => warn!(mailbox = %mailbox.id(), "Worker pool closed; drain request dropped"),
        }
    }

    fn close(&self) {
        let Some(sender) = self.sender.write().take() else {
            return;
        };
        drop(sender);

        // The last reference may be released on one of our own workers.
        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!("Worker thread panicked during shutdown");
            }
        }

        info!("Worker pool closed");
    }
}

impl Drop for PoolThreadManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs each drain on the tokio blocking pool of a runtime.
pub struct TokioThreadManager {
    handle: Handle,
    closed: AtomicBool,
}

impl TokioThreadManager {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            closed: AtomicBool::new(false),
        }
    }

    /// Binds to the runtime of the calling context.
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl ThreadManager for TokioThreadManager {
    fn obtain_thread_for(&self, mailbox: Arc<Mailbox>) {
        if self.closed.load(Ordering::Acquire) {
            warn!(mailbox = %mailbox.id(), "Thread manager closed; drain request dropped");
            return;
        }
        self.handle.spawn_blocking(move || mailbox.dispatch_events());
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffered::BufferedEventsDestination;
    use crate::message::{Message, RequestId, Response, ResponseProcessor};
    use crate::payload::Payload;
    use std::time::Duration;

    fn notify(tx: &crossbeam_channel::Sender<u32>, value: u32) -> Message {
        let tx = tx.clone();
        Message::Response(Response::new(
            RequestId::next(),
            Ok(Payload::new(value)),
            ResponseProcessor::typed::<u32, _>(move |r| {
                let _ = tx.send(r.unwrap_or(0));
            }),
        ))
    }

    #[test]
    fn test_pool_runs_drains_on_named_workers() {
        let config = RuntimeConfig {
            worker_threads: 2,
            thread_name_prefix: "pool-test".into(),
            ..RuntimeConfig::default()
        };
        let tm = Arc::new(PoolThreadManager::with_config(&config).unwrap());
        assert_eq!(tm.worker_count(), 2);

        let mailbox = Mailbox::new(tm.clone());
        let (tx, rx) = crossbeam_channel::unbounded();
        let names = Arc::new(Mutex::new(Vec::new()));
        let names2 = Arc::clone(&names);
        let marker = Message::Response(Response::new(
            RequestId::next(),
            Ok(Payload::new(())),
            ResponseProcessor::new(move |_| {
                names2
                    .lock()
                    .push(thread::current().name().unwrap_or_default().to_string());
            }),
        ));
        mailbox.put_buffered_events(vec![marker, notify(&tx, 1)]);

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert!(names.lock()[0].starts_with("pool-test-"));
        tm.close();
        assert!(tm.is_closed());
    }

    #[test]
    fn test_pool_drops_work_after_close() {
        let tm = Arc::new(PoolThreadManager::new(1).unwrap());
        tm.close();
        tm.close();

        let mailbox = Mailbox::new(tm.clone());
        let (tx, rx) = crossbeam_channel::unbounded();
        mailbox.put_buffered_events(vec![notify(&tx, 1)]);

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(!mailbox.is_idle());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_manager_drains_on_blocking_pool() {
        let tm = Arc::new(TokioThreadManager::current().unwrap());
        let mailbox = Mailbox::new(tm.clone());
        let (tx, rx) = crossbeam_channel::unbounded();

        mailbox.put_buffered_events(vec![notify(&tx, 5), notify(&tx, 6)]);

        let got = tokio::task::spawn_blocking(move || {
            let a = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            let b = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            (a, b)
        })
        .await
        .unwrap();
        assert_eq!(got, (5, 6));
    }

    #[test]
    fn test_tokio_manager_requires_runtime() {
        assert!(TokioThreadManager::current().is_err());
    }
}
