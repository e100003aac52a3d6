//! FIFO queue of canonical URLs waiting to be fetched

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Shared breadth-first queue
///
/// Every critical section is a single queue operation; the lock is never held
/// across an await. Each push wakes a task parked in [`Frontier::notified`].
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Mutex<VecDeque<String>>,
    pushed: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Removes the oldest URL without blocking
    pub fn pop_front(&self) -> Option<String> {
        self.lock().pop_front()
    }

    pub fn push_back(&self, url: String) {
        self.lock().push_back(url);
        self.pushed.notify_one();
    }

    /// Returns a URL to the head of the queue without signalling
    ///
    /// Used when a dequeued URL could not be handed off and must keep its
    /// place in breadth-first order.
    pub fn push_front(&self, url: String) {
        self.lock().push_front(url);
    }

    /// Appends URLs in order, signalling once if anything was added
    pub fn extend<I>(&self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        let added = {
            let mut queue = self.lock();
            let before = queue.len();
            queue.extend(urls);
            queue.len() > before
        };
        if added {
            self.pushed.notify_one();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the pending URLs in dequeue order
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Completes on the next push, or immediately if a push happened while
    /// nobody was waiting
    pub async fn notified(&self) {
        self.pushed.notified().await;
    }
}
