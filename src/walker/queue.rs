//! Path queue with backpressure
//!
//! A bounded queue of files waiting to be wiped. Traversal is the only
//! producer; workers are the consumers. When the queue is full the producer
//! blocks, so memory use stays flat no matter how many files a tree holds.
//! The queue closes when the last sender handle is dropped, and workers
//! exit once it is closed and drained.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A file waiting to be wiped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeTask {
    /// Full path to the file
    pub path: PathBuf,
}

impl WipeTask {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Statistics for the path queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,

    /// Number of sends that had to wait for room
    pub backpressure_events: AtomicU64,
}

impl QueueStats {
    /// Get queue throughput (dequeued tasks)
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }

    /// Tasks sent but not yet picked up
    pub fn depth(&self) -> u64 {
        self.enqueued
            .load(Ordering::Relaxed)
            .saturating_sub(self.dequeued.load(Ordering::Relaxed))
    }
}

/// Bounded queue of wipe tasks
pub struct PathQueue {
    sender: Sender<WipeTask>,
    receiver: Receiver<WipeTask>,
    capacity: usize,
    stats: Arc<QueueStats>,
}

impl PathQueue {
    /// Create a new queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);

        Self {
            sender,
            receiver,
            capacity,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Split into the producer and consumer handles
    ///
    /// The queue closes once the returned sender (and any clones) are
    /// dropped.
    pub fn split(self) -> (PathQueueSender, PathQueueReceiver) {
        (
            PathQueueSender {
                sender: self.sender,
                stats: Arc::clone(&self.stats),
            },
            PathQueueReceiver {
                receiver: self.receiver,
                stats: self.stats,
            },
        )
    }
}

/// Error returned when every consumer has gone away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed(pub WipeTask);

/// Handle for sending tasks to the queue
#[derive(Clone)]
pub struct PathQueueSender {
    sender: Sender<WipeTask>,
    stats: Arc<QueueStats>,
}

impl PathQueueSender {
    /// Send a task, blocking while the queue is full
    pub fn send(&self, task: WipeTask) -> Result<(), QueueClosed> {
        let task = match self.sender.try_send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(TrySendError::Full(task)) => {
                self.stats.backpressure_events.fetch_add(1, Ordering::Relaxed);
                task
            }
            Err(TrySendError::Disconnected(task)) => return Err(QueueClosed(task)),
        };

        self.sender.send(task).map_err(|e| QueueClosed(e.into_inner()))?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

/// Handle for receiving tasks from the queue
#[derive(Clone)]
pub struct PathQueueReceiver {
    receiver: Receiver<WipeTask>,
    stats: Arc<QueueStats>,
}

impl PathQueueReceiver {
    /// Receive a task from the queue
    ///
    /// Blocks until a task is available. Returns `None` once the queue is
    /// closed and empty.
    pub fn recv(&self) -> Option<WipeTask> {
        match self.receiver.recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn task(name: &str) -> WipeTask {
        WipeTask::new(PathBuf::from(name))
    }

    #[test]
    fn test_queue_basic() {
        let queue = PathQueue::new(10);
        let stats = queue.stats();
        let (tx, rx) = queue.split();

        tx.send(task("/a")).unwrap();
        assert_eq!(rx.len(), 1);
        assert_eq!(stats.depth(), 1);

        let got = rx.recv().unwrap();
        assert_eq!(got.path, PathBuf::from("/a"));
        assert!(rx.is_empty());
        assert_eq!(stats.depth(), 0);
        assert_eq!(stats.enqueued.load(Ordering::Relaxed), 1);
        assert_eq!(stats.throughput(), 1);
    }

    #[test]
    fn test_queue_closes_when_sender_dropped() {
        let (tx, rx) = PathQueue::new(4).split();
        tx.send(task("/a")).unwrap();
        tx.send(task("/b")).unwrap();
        drop(tx);

        assert_eq!(rx.recv().map(|t| t.path), Some(PathBuf::from("/a")));
        assert_eq!(rx.recv().map(|t| t.path), Some(PathBuf::from("/b")));
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_queue_backpressure_blocks_producer() {
        let queue = PathQueue::new(1);
        let stats = queue.stats();
        let (tx, rx) = queue.split();

        tx.send(task("/a")).unwrap();

        let producer = thread::spawn(move || {
            // Queue is full: this send waits for the consumer
            tx.send(task("/b")).unwrap();
        });

        for _ in 0..200 {
            if stats.backpressure_count() == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(stats.backpressure_count(), 1);
        assert_eq!(rx.len(), 1);
        assert!(rx.recv().is_some());
        producer.join().unwrap();
        assert!(rx.recv().is_some());
        assert_eq!(stats.backpressure_count(), 1);
    }

    #[test]
    fn test_send_fails_without_consumers() {
        let (tx, rx) = PathQueue::new(1).split();
        drop(rx);
        let err = tx.send(task("/a")).unwrap_err();
        assert_eq!(err.0.path, PathBuf::from("/a"));
    }
}
