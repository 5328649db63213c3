//! In-memory buffer of loaned references

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// An allocated (list, index) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    pub uri: String,
    pub index: u32,
}

impl Reference {
    pub fn new(uri: impl Into<String>, index: u32) -> Self {
        Self {
            uri: uri.into(),
            index,
        }
    }
}

/// Group references by list, preserving index order per list
pub fn group_by_uri(references: &[Reference]) -> BTreeMap<&str, Vec<u32>> {
    let mut grouped: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for r in references {
        grouped.entry(r.uri.as_str()).or_default().push(r.index);
    }
    grouped
}

/// FIFO of references taken from storage but not yet handed out
///
/// Shared between the refill worker (producer) and callers of
/// `next_indices` (consumers). Waiters park on `notify` and re-check.
#[derive(Debug, Default)]
pub struct PrefetchBuffer {
    queue: Mutex<VecDeque<Reference>>,
    notify: Notify,
    underflow: AtomicU64,
    last_error: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl PrefetchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Append fetched references and wake waiters
    pub fn push(&self, references: impl IntoIterator<Item = Reference>) {
        self.queue.lock().extend(references);
        self.notify.notify_waiters();
    }

    /// Return references to the front so they are handed out first
    pub fn put_back(&self, references: Vec<Reference>) {
        if references.is_empty() {
            return;
        }
        {
            let mut queue = self.queue.lock();
            for r in references.into_iter().rev() {
                queue.push_front(r);
            }
        }
        self.notify.notify_waiters();
    }

    /// Take up to `amount` references without waiting
    pub fn take_up_to(&self, amount: usize) -> Vec<Reference> {
        let mut queue = self.queue.lock();
        let n = amount.min(queue.len());
        queue.drain(..n).collect()
    }

    /// Remove everything
    pub fn drain(&self) -> Vec<Reference> {
        self.queue.lock().drain(..).collect()
    }

    pub fn notify(&self) -> &Notify {
        &self.notify
    }

    pub fn record_underflow(&self, missing: usize) {
        self.underflow.fetch_add(missing as u64, Ordering::Relaxed);
    }

    /// Read and reset the underflow counter
    pub fn take_underflow(&self) -> u64 {
        self.underflow.swap(0, Ordering::Relaxed)
    }

    pub fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock() = error;
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Stop handing out references; wakes all waiters
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
