//! The bounded task queue.
//!
//! Dispatch order is FIFO; priority only matters under capacity pressure.
//! The queue keeps a priority index alongside the FIFO list so the overflow
//! policy can compare an arrival against the true minimum-priority occupant
//! without reaching into anyone's internals: if the newcomer outranks it, the
//! occupant is evicted (and returned to the caller to be recorded as failed);
//! otherwise admission fails with a capacity error.

use flotilla_common::{FlotillaError, Result, TaskPriority};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::Notify;

/// One queued task reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub seq: u64,
    pub task_id: String,
    pub priority: TaskPriority,
}

/// Outcome of a successful push.
#[derive(Debug)]
pub enum Admission {
    Queued,
    /// Admitted by evicting these lower-priority entries.
    QueuedWithEviction(Vec<QueueEntry>),
}

struct Inner {
    fifo: VecDeque<u64>,
    entries: HashMap<u64, QueueEntry>,
    /// (priority, seq) ascending; first element is the eviction candidate
    by_priority: BTreeSet<(TaskPriority, u64)>,
    next_seq: u64,
    closed: bool,
}

pub struct TaskQueue {
    capacity: usize,
    inner: Mutex<Inner>,
    notify: Notify,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                fifo: VecDeque::new(),
                entries: HashMap::new(),
                by_priority: BTreeSet::new(),
                next_seq: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Admit a task, applying the priority-biased overflow policy at
    /// capacity.
    pub fn push(&self, task_id: impl Into<String>, priority: TaskPriority) -> Result<Admission> {
        let task_id = task_id.into();
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return Err(FlotillaError::Lifecycle("task queue is closed".into()));
        }

        let mut evicted = Vec::new();
        while inner.fifo.len() >= self.capacity {
            let &(lowest_priority, lowest_seq) = match inner.by_priority.iter().next() {
                Some(lowest) => lowest,
                None => break,
            };
            if priority <= lowest_priority {
                return Err(FlotillaError::Capacity(format!(
                    "queue is full ({} tasks) and {priority:?} does not outrank the \
                     lowest-priority occupant ({lowest_priority:?})",
                    self.capacity
                )));
            }
            inner.by_priority.remove(&(lowest_priority, lowest_seq));
            inner.fifo.retain(|seq| *seq != lowest_seq);
            if let Some(entry) = inner.entries.remove(&lowest_seq) {
                evicted.push(entry);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.fifo.push_back(seq);
        inner.by_priority.insert((priority, seq));
        inner.entries.insert(
            seq,
            QueueEntry {
                seq,
                task_id,
                priority,
            },
        );
        drop(inner);

        self.notify.notify_one();

        Ok(if evicted.is_empty() {
            Admission::Queued
        } else {
            Admission::QueuedWithEviction(evicted)
        })
    }

    /// Wait for the next entry in FIFO order. Returns `None` once the queue
    /// is closed and drained.
    pub async fn pop(&self) -> Option<QueueEntry> {
        let notified = self.notify.notified();
        tokio::pin!(notified);

        loop {
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(seq) = inner.fifo.pop_front() {
                    if let Some(entry) = inner.entries.remove(&seq) {
                        inner.by_priority.remove(&(entry.priority, seq));
                        return Some(entry);
                    }
                }
                if inner.closed {
                    return None;
                }
            }

            notified.as_mut().await;
            notified.set(self.notify.notified());
        }
    }

    /// Reject further pushes and wake any waiting consumer.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().fifo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Priority of the current eviction candidate, if any.
    pub fn min_priority(&self) -> Option<TaskPriority> {
        self.inner
            .lock()
            .unwrap()
            .by_priority
            .iter()
            .next()
            .map(|&(priority, _)| priority)
    }
}
